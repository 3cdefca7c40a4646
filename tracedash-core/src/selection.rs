//! The user's current choice of experiments and metrics.

use crate::catalog::ExperimentCatalog;
use std::collections::HashSet;

/// Selected experiment identifiers and metric names.
///
/// The sets carry no order; use [`SelectionState::ordered_experiments`] and
/// [`SelectionState::ordered_metrics`] for display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    experiments: HashSet<String>,
    metrics: HashSet<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the experiment if absent, remove it if present.
    /// Returns `true` if it is selected afterwards.
    pub fn toggle_experiment(&mut self, id: &str) -> bool {
        toggle(&mut self.experiments, id)
    }

    /// Add the metric if absent, remove it if present.
    /// Returns `true` if it is selected afterwards.
    pub fn toggle_metric(&mut self, name: &str) -> bool {
        toggle(&mut self.metrics, name)
    }

    /// Drop an experiment from the selection, e.g. after it was deleted.
    pub fn remove_experiment(&mut self, id: &str) -> bool {
        self.experiments.remove(id)
    }

    pub fn is_experiment_selected(&self, id: &str) -> bool {
        self.experiments.contains(id)
    }

    pub fn is_metric_selected(&self, name: &str) -> bool {
        self.metrics.contains(name)
    }

    pub fn experiments(&self) -> &HashSet<String> {
        &self.experiments
    }

    pub fn metrics(&self) -> &HashSet<String> {
        &self.metrics
    }

    /// True when either set is empty, i.e. there is nothing to plot.
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() || self.metrics.is_empty()
    }

    /// Selected experiments, most recently started first.
    ///
    /// Identifiers the catalog does not know (yet) follow in lexical order.
    pub fn ordered_experiments(&self, catalog: &ExperimentCatalog) -> Vec<String> {
        let mut ordered: Vec<String> = catalog
            .ordered()
            .into_iter()
            .filter(|e| self.experiments.contains(&e.id))
            .map(|e| e.id.clone())
            .collect();
        let mut unknown: Vec<String> = self
            .experiments
            .iter()
            .filter(|id| catalog.get(id).is_none())
            .cloned()
            .collect();
        unknown.sort();
        ordered.extend(unknown);
        ordered
    }

    /// Selected metrics in the order the backend reported them.
    ///
    /// Metrics the catalog does not list follow in lexical order.
    pub fn ordered_metrics(&self, catalog: &ExperimentCatalog) -> Vec<String> {
        let mut ordered: Vec<String> = catalog
            .metrics()
            .iter()
            .filter(|m| self.metrics.contains(*m))
            .cloned()
            .collect();
        let mut unknown: Vec<String> = self
            .metrics
            .iter()
            .filter(|m| !catalog.metrics().contains(*m))
            .cloned()
            .collect();
        unknown.sort();
        ordered.extend(unknown);
        ordered
    }
}

fn toggle(set: &mut HashSet<String>, key: &str) -> bool {
    if set.remove(key) {
        false
    } else {
        set.insert(key.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{experiment, response};

    #[test]
    fn test_toggle_experiment_adds_and_removes() {
        let mut sel = SelectionState::new();
        assert!(sel.toggle_experiment("run_a"));
        assert!(sel.is_experiment_selected("run_a"));
        assert!(!sel.toggle_experiment("run_a"));
        assert!(!sel.is_experiment_selected("run_a"));
    }

    #[test]
    fn test_double_toggle_restores_selection() {
        let mut sel = SelectionState::new();
        sel.toggle_experiment("run_a");
        sel.toggle_metric("loss");
        let before = sel.clone();
        sel.toggle_experiment("run_b");
        sel.toggle_experiment("run_b");
        assert_eq!(sel, before);
        sel.toggle_experiment("run_a");
        sel.toggle_experiment("run_a");
        assert_eq!(sel, before);
    }

    #[test]
    fn test_sets_are_independent() {
        let mut sel = SelectionState::new();
        sel.toggle_experiment("loss");
        assert!(!sel.is_metric_selected("loss"));
        assert!(sel.is_empty());
        sel.toggle_metric("loss");
        assert!(!sel.is_empty());
    }

    #[test]
    fn test_remove_experiment() {
        let mut sel = SelectionState::new();
        sel.toggle_experiment("run_a");
        assert!(sel.remove_experiment("run_a"));
        assert!(!sel.remove_experiment("run_a"));
        assert!(sel.experiments().is_empty());
    }

    #[test]
    fn test_ordered_experiments_newest_first() {
        let mut catalog = ExperimentCatalog::new();
        catalog.replace(response(
            vec![
                experiment("old", 100.0),
                experiment("new", 300.0),
                experiment("mid", 200.0),
            ],
            vec![],
        ));
        let mut sel = SelectionState::new();
        for id in ["old", "new", "mid", "ghost"] {
            sel.toggle_experiment(id);
        }
        assert_eq!(
            sel.ordered_experiments(&catalog),
            vec!["new", "mid", "old", "ghost"]
        );
    }

    #[test]
    fn test_ordered_metrics_follow_backend_order() {
        let mut catalog = ExperimentCatalog::new();
        catalog.replace(response(
            vec![],
            vec!["loss".into(), "acc".into(), "lr".into()],
        ));
        let mut sel = SelectionState::new();
        for m in ["lr", "zeta", "loss"] {
            sel.toggle_metric(m);
        }
        assert_eq!(sel.ordered_metrics(&catalog), vec!["loss", "lr", "zeta"]);
    }
}
