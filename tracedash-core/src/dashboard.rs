//! The dashboard session: catalog, selection, fetches and layout in one place.

use crate::backend::DashboardBackend;
use crate::catalog::ExperimentCatalog;
use crate::config::DashboardConfig;
use crate::error::{ApiError, LayoutError, Result as DashboardResult};
use crate::layout::{LayoutAllocator, PanelRect};
use crate::orchestrator::{FetchOutcome, GridStatus, PanelState, PlotFetchOrchestrator, PlotInputs};
use crate::palette::assign_colors;
use crate::selection::SelectionState;
use crate::settings::{PaletteCatalog, PlotSettings, SettingsStore, SettingsUpdate};
use crate::smoothing::apply_smoothing;
use crate::types::{ImageEntry, TextEntry, Trace};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One dashboard session.
///
/// All mutation goes through `&mut self`; each mutating call ends by
/// recomputing the plot inputs, which issues new fetches only when the
/// experiments, metrics or server-side axis settings actually changed.
/// Fetching methods must be called from within a tokio runtime.
pub struct Dashboard {
    backend: Arc<dyn DashboardBackend>,
    settings: SettingsStore,
    catalog: ExperimentCatalog,
    selection: SelectionState,
    orchestrator: PlotFetchOrchestrator,
    layout: LayoutAllocator,
    catalog_error: Option<String>,
}

impl Dashboard {
    pub fn new(
        backend: Arc<dyn DashboardBackend>,
        settings: SettingsStore,
        columns: u32,
    ) -> DashboardResult<Self> {
        Ok(Self {
            orchestrator: PlotFetchOrchestrator::new(Arc::clone(&backend)),
            backend,
            settings,
            catalog: ExperimentCatalog::new(),
            selection: SelectionState::new(),
            layout: LayoutAllocator::new(columns)?,
            catalog_error: None,
        })
    }

    /// Build a session seeded with the configured plot settings and columns.
    pub fn from_config(
        backend: Arc<dyn DashboardBackend>,
        config: &DashboardConfig,
    ) -> DashboardResult<Self> {
        Self::new(
            backend,
            SettingsStore::with_settings(config.plot.clone()),
            config.layout.columns,
        )
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn catalog(&self) -> &ExperimentCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn orchestrator(&self) -> &PlotFetchOrchestrator {
        &self.orchestrator
    }

    pub fn layout(&self) -> &LayoutAllocator {
        &self.layout
    }

    /// Last experiment-list failure, cleared by the next successful reload.
    pub fn catalog_error(&self) -> Option<&str> {
        self.catalog_error.as_deref()
    }

    /// Fetch the experiment list and replace the catalog.
    ///
    /// On failure the previous catalog is kept and the error is recorded for
    /// display; plots are unaffected.
    pub async fn reload_experiments(&mut self) -> Result<(), ApiError> {
        match self.backend.list_experiments().await {
            Ok(response) => {
                self.catalog.replace(response);
                self.catalog_error = None;
                self.recompute();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load experiments");
                self.catalog_error = Some(format!("Failed to load experiments: {e}"));
                Err(e)
            }
        }
    }

    /// Load the palette catalog, falling back to the built-in palette.
    pub async fn load_palettes(&self) -> PaletteCatalog {
        self.settings
            .load_palette_catalog(self.backend.as_ref())
            .await
    }

    /// Returns `true` if the experiment is selected afterwards.
    pub fn toggle_experiment(&mut self, id: &str) -> bool {
        let selected = self.selection.toggle_experiment(id);
        debug!(experiment = id, selected, "Toggled experiment");
        self.recompute();
        selected
    }

    /// Returns `true` if the metric is selected afterwards.
    pub fn toggle_metric(&mut self, name: &str) -> bool {
        let selected = self.selection.toggle_metric(name);
        debug!(metric = name, selected, "Toggled metric");
        self.recompute();
        selected
    }

    /// Merge a settings update. Only axis changes lead to new fetches.
    /// Merge a settings update. Only axis changes lead to new fetches;
    /// smoothing and palette are applied when building the view.
    pub fn update_settings(&mut self, update: SettingsUpdate) -> PlotSettings {
        let refetch = update.affects_fetch();
        let settings = self.settings.update(update);
        if refetch {
            self.recompute();
        }
        settings
    }

    pub fn set_columns(&mut self, columns: u32) -> Result<(), LayoutError> {
        self.layout.set_columns(columns)?;
        self.recompute();
        Ok(())
    }

    pub fn move_panel(&mut self, metric: &str, x: u32, y: u32) -> Result<(), LayoutError> {
        self.layout.move_panel(metric, x, y)
    }

    pub fn resize_panel(&mut self, metric: &str, w: u32, h: u32) -> Result<(), LayoutError> {
        self.layout.resize_panel(metric, w, h)
    }

    /// Rename an experiment on the backend and update the cached name.
    pub async fn rename_experiment(&mut self, id: &str, name: &str) -> Result<(), ApiError> {
        self.backend.rename_experiment(id, name).await?;
        self.catalog.rename_local(id, name);
        info!(experiment = id, name, "Experiment renamed");
        Ok(())
    }

    /// Delete an experiment, drop it from the selection and reload the list.
    ///
    /// A failed list reload after a successful delete is recorded like any
    /// other catalog failure and does not fail the delete.
    pub async fn delete_experiment(&mut self, id: &str) -> Result<(), ApiError> {
        self.backend.delete_experiment(id).await?;
        info!(experiment = id, "Experiment deleted");
        self.selection.remove_experiment(id);
        if self.reload_experiments().await.is_err() {
            self.recompute();
        }
        Ok(())
    }

    /// Fetch an experiment's logged images and text tables concurrently.
    ///
    /// The two requests fail independently.
    pub async fn experiment_logs(&self, id: &str) -> ExperimentLogs {
        let (images, text) = futures::future::join(
            self.backend.fetch_images(id),
            self.backend.fetch_text(id),
        )
        .await;
        ExperimentLogs { images, text }
    }

    /// Refetch all displayed plots, keeping current figures until replaced.
    pub fn refresh_plots(&mut self) -> Option<u64> {
        self.orchestrator.reload()
    }

    /// Plot inputs implied by the current selection and settings.
    pub fn plot_inputs(&self) -> PlotInputs {
        let settings = self.settings.get();
        PlotInputs {
            experiments: self.selection.ordered_experiments(&self.catalog),
            metrics: self.selection.ordered_metrics(&self.catalog),
            x_axis: settings.x_axis_mode,
            y_axis_scale: settings.y_axis_scale,
        }
    }

    /// Issue fetches if the plot inputs changed and keep the layout in step.
    pub fn recompute(&mut self) {
        let inputs = self.plot_inputs();
        if let Err(e) = self.layout.sync(&inputs.metrics, self.layout.columns()) {
            warn!(error = %e, "Failed to update panel layout");
        }
        if self.orchestrator.inputs() != Some(&inputs) {
            self.orchestrator.load(inputs);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.orchestrator.has_pending()
    }

    /// Wait for the next fetch outcome. Pends while nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<FetchOutcome> {
        self.orchestrator.next_outcome().await
    }

    pub fn apply_outcome(&mut self, outcome: FetchOutcome) -> bool {
        self.orchestrator.apply(outcome)
    }

    /// Wait until every fetch of the current generation has reported.
    pub async fn settle(&mut self) {
        self.orchestrator.settle().await;
    }

    pub fn status(&self) -> GridStatus {
        self.orchestrator.status()
    }

    /// Render model of the current state.
    ///
    /// Smoothing and palette are applied here, so changing them never
    /// requires a fetch.
    pub fn view(&self) -> DashboardView {
        let settings = self.settings.get();
        let palette = self.settings.active_palette();
        let selected_experiments = self.selection.ordered_experiments(&self.catalog);
        let idle = selected_experiments.is_empty();

        let panels = self
            .layout
            .panels()
            .iter()
            .map(|rect| {
                let content = if idle {
                    PanelContent::Idle
                } else {
                    match self.orchestrator.panel(&rect.metric) {
                        None | Some(PanelState::Loading) => PanelContent::Loading,
                        Some(PanelState::Error(message)) => PanelContent::Error(message.clone()),
                        Some(PanelState::Ready(figure)) if !figure.has_traces() => {
                            PanelContent::Empty
                        }
                        Some(PanelState::Ready(figure)) => PanelContent::Plot {
                            title: figure.title().map(str::to_string),
                            traces: assign_colors(
                                apply_smoothing(&figure.data, settings.smoothing),
                                palette.as_ref(),
                            ),
                        },
                    }
                };
                PanelView {
                    metric: rect.metric.clone(),
                    rect: rect.clone(),
                    content,
                }
            })
            .collect();

        DashboardView {
            experiment_count: self.catalog.len(),
            running_count: self.catalog.running_count(),
            metric_count: self.catalog.metrics().len(),
            selected_experiments,
            status: self.orchestrator.status(),
            columns: self.layout.columns(),
            catalog_error: self.catalog_error.clone(),
            panels,
        }
    }
}

/// Logged media of one experiment.
#[derive(Debug)]
pub struct ExperimentLogs {
    pub images: Result<Vec<ImageEntry>, ApiError>,
    pub text: Result<Vec<TextEntry>, ApiError>,
}

/// Snapshot of the dashboard for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub experiment_count: usize,
    pub running_count: usize,
    pub metric_count: usize,
    pub selected_experiments: Vec<String>,
    pub status: GridStatus,
    pub columns: u32,
    pub catalog_error: Option<String>,
    pub panels: Vec<PanelView>,
}

/// One metric panel ready for drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub metric: String,
    pub rect: PanelRect,
    pub content: PanelContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum PanelContent {
    /// No experiment selected, nothing to fetch.
    Idle,
    Loading,
    Error(String),
    /// The backend returned a figure without traces.
    Empty,
    Plot {
        title: Option<String>,
        traces: Vec<Trace>,
    },
}
