//! # Tracedash Core
//!
//! Core library for the tracedash experiment dashboard.
//! Provides the backend client, concurrent per-metric plot fetching,
//! client-side smoothing and coloring, panel layout, session settings,
//! and configuration.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod palette;
pub mod refresh;
pub mod selection;
pub mod settings;
pub mod smoothing;
pub mod types;

// Re-export commonly used types at the crate root.
pub use backend::{DashboardBackend, HttpBackend, MockBackend};
pub use catalog::ExperimentCatalog;
pub use config::{DashboardConfig, LayoutConfig, RefreshConfig, ServerConfig};
pub use dashboard::{Dashboard, DashboardView, ExperimentLogs, PanelContent, PanelView};
pub use error::{ApiError, ConfigError, DashboardError, LayoutError, Result};
pub use layout::{LayoutAllocator, PanelRect};
pub use orchestrator::{FetchOutcome, GridStatus, PanelState, PlotFetchOrchestrator, PlotInputs};
pub use refresh::{RefreshScheduler, RefreshTick};
pub use selection::SelectionState;
pub use settings::{
    ColorPalette, PaletteCatalog, PaletteChoice, PlotSettings, SettingsStore, SettingsUpdate,
};
pub use types::{
    Experiment, ExperimentMetadata, ExperimentsResponse, ImageEntry, PlotFigure, PlotOptions,
    PlotRequest, RunStatus, TextEntry, Trace, XAxisMode, YAxisScale,
};
