//! Access to the tracking backend's REST surface.
//!
//! `DashboardBackend` is the seam between the pipeline and the network:
//! - [`HttpBackend`] talks to a live server with `reqwest`
//! - [`MockBackend`] serves canned responses for tests and demos

pub mod http;
pub mod mock;

use crate::error::ApiError;
use crate::types::{
    ExperimentsResponse, ImageEntry, PlotFigure, PlotOptions, PlotRequest, TextEntry,
};
use async_trait::async_trait;

pub use http::HttpBackend;
pub use mock::MockBackend;

/// Asynchronous client for the dashboard backend.
///
/// Every call may be issued concurrently with any other.
#[async_trait]
pub trait DashboardBackend: Send + Sync {
    /// `GET /api/experiments`
    async fn list_experiments(&self) -> Result<ExperimentsResponse, ApiError>;

    /// `POST /api/plot`: render one metric across the requested experiments.
    async fn fetch_plot(&self, request: PlotRequest) -> Result<PlotFigure, ApiError>;

    /// `GET /api/plot-options`
    async fn plot_options(&self) -> Result<PlotOptions, ApiError>;

    /// `PUT /api/experiments/{id}/rename`
    async fn rename_experiment(&self, id: &str, name: &str) -> Result<(), ApiError>;

    /// `DELETE /api/experiments/{id}`
    async fn delete_experiment(&self, id: &str) -> Result<(), ApiError>;

    /// `POST /api/images`
    async fn fetch_images(&self, experiment: &str) -> Result<Vec<ImageEntry>, ApiError>;

    /// `POST /api/text`
    async fn fetch_text(&self, experiment: &str) -> Result<Vec<TextEntry>, ApiError>;
}
