//! Read-only cache of the backend's experiment list and metric names.

use crate::types::{Experiment, ExperimentsResponse};
use std::collections::HashMap;
use tracing::info;

/// Cached copy of `GET /api/experiments`.
///
/// Each list fetch replaces the cache wholesale; overlapping reloads resolve
/// as last write wins.
#[derive(Debug, Clone, Default)]
pub struct ExperimentCatalog {
    experiments: HashMap<String, Experiment>,
    metrics: Vec<String>,
}

impl ExperimentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached experiments and metric list.
    pub fn replace(&mut self, response: ExperimentsResponse) {
        self.experiments = response.experiments;
        self.metrics = response.metrics;
        info!(
            experiments = self.experiments.len(),
            metrics = self.metrics.len(),
            running = self.running_count(),
            "Experiment catalog refreshed"
        );
    }

    pub fn get(&self, id: &str) -> Option<&Experiment> {
        self.experiments.get(id)
    }

    /// Metric names in backend order.
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Experiments sorted by start time, most recent first.
    pub fn ordered(&self) -> Vec<&Experiment> {
        let mut list: Vec<&Experiment> = self.experiments.values().collect();
        list.sort_by(|a, b| {
            b.metadata
                .start_time
                .total_cmp(&a.metadata.start_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// Record a successful rename without refetching the list.
    pub fn rename_local(&mut self, id: &str, name: &str) -> bool {
        match self.experiments.get_mut(id) {
            Some(exp) => {
                exp.metadata.name = Some(name.to_string());
                true
            }
            None => false,
        }
    }

    pub fn running_count(&self) -> usize {
        self.experiments.values().filter(|e| e.is_running()).count()
    }

    pub fn any_images(&self) -> bool {
        self.experiments.values().any(|e| e.has_images)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{ExperimentMetadata, RunStatus};

    pub(crate) fn experiment(id: &str, start_time: f64) -> Experiment {
        Experiment {
            id: id.to_string(),
            metadata: ExperimentMetadata {
                experiment_id: id.to_string(),
                start_time,
                start_time_iso: String::new(),
                status: RunStatus::Completed,
                end_time: None,
                total_steps: None,
                track_resources: None,
                name: None,
            },
            log_count: 0,
            has_resources: false,
            has_images: false,
            has_text: false,
        }
    }

    pub(crate) fn response(experiments: Vec<Experiment>, metrics: Vec<String>) -> ExperimentsResponse {
        ExperimentsResponse {
            experiments: experiments.into_iter().map(|e| (e.id.clone(), e)).collect(),
            metrics,
        }
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut catalog = ExperimentCatalog::new();
        catalog.replace(response(
            vec![experiment("a", 1.0), experiment("b", 2.0)],
            vec!["loss".into()],
        ));
        assert_eq!(catalog.len(), 2);
        catalog.replace(response(vec![experiment("c", 3.0)], vec!["acc".into()]));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("a").is_none());
        assert_eq!(catalog.metrics(), ["acc".to_string()]);
    }

    #[test]
    fn test_ordered_by_start_time_desc() {
        let mut catalog = ExperimentCatalog::new();
        catalog.replace(response(
            vec![experiment("a", 1.0), experiment("c", 3.0), experiment("b", 2.0)],
            vec![],
        ));
        let ids: Vec<&str> = catalog.ordered().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_rename_local() {
        let mut catalog = ExperimentCatalog::new();
        catalog.replace(response(vec![experiment("a", 1.0)], vec![]));
        assert!(catalog.rename_local("a", "baseline"));
        assert_eq!(catalog.get("a").unwrap().display_name(), "baseline");
        assert!(!catalog.rename_local("missing", "x"));
    }

    #[test]
    fn test_counts() {
        let mut running = experiment("r", 5.0);
        running.metadata.status = RunStatus::Running;
        running.has_images = true;
        let mut catalog = ExperimentCatalog::new();
        assert!(catalog.is_empty());
        catalog.replace(response(vec![running, experiment("d", 1.0)], vec![]));
        assert_eq!(catalog.running_count(), 1);
        assert!(catalog.any_images());
    }
}
