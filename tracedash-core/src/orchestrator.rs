//! Concurrent per-metric plot fetching with stale-result suppression.
//!
//! Every change of inputs starts a new *generation*. One task per metric is
//! spawned for the generation and reports back over a channel; outcomes
//! tagged with an older generation are dropped on arrival, so a slow
//! response can never overwrite data for the current selection. Superseded
//! tasks are also aborted to free their connections early.
//!
//! The orchestrator is driven from a single task: spawn work with
//! [`PlotFetchOrchestrator::load`], then feed outcomes back through
//! [`PlotFetchOrchestrator::next_outcome`] and [`PlotFetchOrchestrator::apply`]
//! (or [`PlotFetchOrchestrator::settle`] to drain everything).
//! `load` and `reload` must be called from within a tokio runtime.

use crate::backend::DashboardBackend;
use crate::error::ApiError;
use crate::types::{PlotFigure, PlotRequest, XAxisMode, YAxisScale};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Everything that determines which figures are fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotInputs {
    /// Experiments in display order.
    pub experiments: Vec<String>,
    /// Metrics in display order.
    pub metrics: Vec<String>,
    pub x_axis: XAxisMode,
    pub y_axis_scale: YAxisScale,
}

impl PlotInputs {
    /// True when there is nothing to fetch.
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() || self.metrics.is_empty()
    }

    pub fn request_for(&self, metric: &str) -> PlotRequest {
        PlotRequest {
            experiments: self.experiments.clone(),
            metric: metric.to_string(),
            x_axis: self.x_axis,
            y_axis_scale: self.y_axis_scale,
        }
    }
}

/// Per-metric fetch state.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    Loading,
    Error(String),
    Ready(PlotFigure),
}

impl PanelState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PanelState::Loading)
    }

    pub fn figure(&self) -> Option<&PlotFigure> {
        match self {
            PanelState::Ready(figure) => Some(figure),
            _ => None,
        }
    }
}

/// Result of one metric fetch, tagged with the generation that issued it.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub generation: u64,
    pub metric: String,
    pub result: Result<PlotFigure, ApiError>,
}

/// Aggregate status of the whole panel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStatus {
    /// No experiment or no metric is selected.
    NoSelection,
    /// At least one panel is still waiting for its first result.
    Loading,
    /// Every panel has settled and at least one has data or an error.
    Ready,
    /// Every panel settled successfully but no figure had any trace.
    NoData,
}

/// Issues plot fetches for the current inputs and tracks their results.
pub struct PlotFetchOrchestrator {
    backend: Arc<dyn DashboardBackend>,
    generation: u64,
    inputs: Option<PlotInputs>,
    panels: HashMap<String, PanelState>,
    /// Metrics still waiting for a result of the current generation.
    pending: HashSet<String>,
    tasks: Vec<JoinHandle<()>>,
    tx: mpsc::Sender<FetchOutcome>,
    rx: mpsc::Receiver<FetchOutcome>,
}

impl PlotFetchOrchestrator {
    pub fn new(backend: Arc<dyn DashboardBackend>) -> Self {
        let (tx, rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
        Self {
            backend,
            generation: 0,
            inputs: None,
            panels: HashMap::new(),
            pending: HashSet::new(),
            tasks: Vec::new(),
            tx,
            rx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn inputs(&self) -> Option<&PlotInputs> {
        self.inputs.as_ref()
    }

    /// Start a new generation for `inputs`.
    ///
    /// All panels are reset to `Loading` and one fetch per metric is spawned.
    /// With no experiments or no metrics nothing is fetched and all panel
    /// state is cleared. Returns the new generation.
    pub fn load(&mut self, inputs: PlotInputs) -> u64 {
        self.begin_generation();
        self.panels.clear();

        if inputs.is_empty() {
            debug!(generation = self.generation, "Selection empty; no plots to fetch");
            self.inputs = Some(inputs);
            return self.generation;
        }

        for metric in &inputs.metrics {
            self.panels.insert(metric.clone(), PanelState::Loading);
        }
        self.spawn_fetches(&inputs);
        self.inputs = Some(inputs);
        self.generation
    }

    /// Refetch every metric for the current inputs.
    ///
    /// Panels that already show data keep it until the new result arrives;
    /// other panels go back to `Loading`. Returns `None` when there is
    /// nothing to fetch.
    pub fn reload(&mut self) -> Option<u64> {
        let inputs = self.inputs.clone().filter(|i| !i.is_empty())?;
        self.begin_generation();
        for metric in &inputs.metrics {
            let keep = matches!(self.panels.get(metric), Some(PanelState::Ready(_)));
            if !keep {
                self.panels.insert(metric.clone(), PanelState::Loading);
            }
        }
        self.spawn_fetches(&inputs);
        Some(self.generation)
    }

    /// Record an outcome. Returns `false` if it was discarded as stale.
    pub fn apply(&mut self, outcome: FetchOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(
                metric = %outcome.metric,
                outcome_generation = outcome.generation,
                current_generation = self.generation,
                "Discarding stale plot result"
            );
            return false;
        }
        if !self.pending.remove(&outcome.metric) {
            debug!(metric = %outcome.metric, "Discarding result for untracked metric");
            return false;
        }

        let state = match outcome.result {
            Ok(figure) => {
                debug!(
                    metric = %outcome.metric,
                    traces = figure.data.len(),
                    "Plot loaded"
                );
                PanelState::Ready(figure)
            }
            Err(e) => {
                warn!(metric = %outcome.metric, error = %e, "Plot fetch failed");
                PanelState::Error(format!("Failed to load {}: {e}", outcome.metric))
            }
        };
        self.panels.insert(outcome.metric, state);
        true
    }

    /// Wait for the next outcome from any generation.
    ///
    /// Pends forever when nothing is in flight; check
    /// [`PlotFetchOrchestrator::has_pending`] first or race it in a `select!`.
    pub async fn next_outcome(&mut self) -> Option<FetchOutcome> {
        self.rx.recv().await
    }

    /// Apply every outcome that has already arrived. Returns how many were kept.
    pub fn drain_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.rx.try_recv() {
            if self.apply(outcome) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until every fetch of the current generation has reported.
    pub async fn settle(&mut self) {
        while self.has_pending() {
            match self.rx.recv().await {
                Some(outcome) => {
                    self.apply(outcome);
                }
                None => break,
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn panel(&self, metric: &str) -> Option<&PanelState> {
        self.panels.get(metric)
    }

    pub fn status(&self) -> GridStatus {
        let Some(inputs) = self.inputs.as_ref().filter(|i| !i.is_empty()) else {
            return GridStatus::NoSelection;
        };

        let states: Vec<&PanelState> = inputs
            .metrics
            .iter()
            .filter_map(|m| self.panels.get(m))
            .collect();
        if states.len() < inputs.metrics.len() || states.iter().any(|s| s.is_loading()) {
            return GridStatus::Loading;
        }

        let all_empty = states
            .iter()
            .all(|s| matches!(s, PanelState::Ready(figure) if !figure.has_traces()));
        if all_empty {
            GridStatus::NoData
        } else {
            GridStatus::Ready
        }
    }

    fn begin_generation(&mut self) {
        self.generation += 1;
        self.pending.clear();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn spawn_fetches(&mut self, inputs: &PlotInputs) {
        let generation = self.generation;
        for metric in &inputs.metrics {
            let backend = Arc::clone(&self.backend);
            let tx = self.tx.clone();
            let request = inputs.request_for(metric);
            let metric = metric.clone();
            debug!(
                generation,
                metric = %metric,
                experiments = request.experiments.len(),
                x_axis = %request.x_axis,
                y_scale = %request.y_axis_scale,
                "Issuing plot fetch"
            );
            self.pending.insert(metric.clone());
            self.tasks.push(tokio::spawn(async move {
                let result = backend.fetch_plot(request).await;
                let _ = tx
                    .send(FetchOutcome {
                        generation,
                        metric,
                        result,
                    })
                    .await;
            }));
        }
    }
}

impl Drop for PlotFetchOrchestrator {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
