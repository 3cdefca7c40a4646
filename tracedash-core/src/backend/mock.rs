//! In-memory backend for tests and offline demos.

use super::DashboardBackend;
use crate::error::ApiError;
use crate::types::{
    ExperimentsResponse, ImageEntry, PlotFigure, PlotOptions, PlotRequest, TextEntry,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// A backend that serves canned responses and records what was asked of it.
///
/// Plot responses are keyed by metric name. A metric can be held so its fetch
/// does not resolve until [`MockBackend::release`] is called, which lets tests
/// interleave selection changes with in-flight requests.
pub struct MockBackend {
    experiments: Mutex<Result<ExperimentsResponse, ApiError>>,
    plots: Mutex<HashMap<String, Result<PlotFigure, ApiError>>>,
    options: Mutex<Result<PlotOptions, ApiError>>,
    images: Mutex<HashMap<String, Vec<ImageEntry>>>,
    texts: Mutex<HashMap<String, Vec<TextEntry>>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
    plot_requests: Mutex<Vec<PlotRequest>>,
    renamed: Mutex<Vec<(String, String)>>,
    deleted: Mutex<Vec<String>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            experiments: Mutex::new(Ok(ExperimentsResponse::default())),
            plots: Mutex::new(HashMap::new()),
            options: Mutex::new(Ok(PlotOptions::default())),
            images: Mutex::new(HashMap::new()),
            texts: Mutex::new(HashMap::new()),
            holds: Mutex::new(HashMap::new()),
            plot_requests: Mutex::new(Vec::new()),
            renamed: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_experiments(&self, response: ExperimentsResponse) {
        *lock(&self.experiments) = Ok(response);
    }

    pub fn set_experiments_error(&self, error: ApiError) {
        *lock(&self.experiments) = Err(error);
    }

    /// Serve `figure` for every fetch of `metric`.
    pub fn set_plot(&self, metric: &str, figure: PlotFigure) {
        lock(&self.plots).insert(metric.to_string(), Ok(figure));
    }

    /// Fail every fetch of `metric` with `error`.
    pub fn set_plot_error(&self, metric: &str, error: ApiError) {
        lock(&self.plots).insert(metric.to_string(), Err(error));
    }

    pub fn set_plot_options(&self, options: Result<PlotOptions, ApiError>) {
        *lock(&self.options) = options;
    }

    pub fn set_images(&self, experiment: &str, images: Vec<ImageEntry>) {
        lock(&self.images).insert(experiment.to_string(), images);
    }

    pub fn set_text(&self, experiment: &str, entries: Vec<TextEntry>) {
        lock(&self.texts).insert(experiment.to_string(), entries);
    }

    /// Block fetches of `metric` until released.
    pub fn hold(&self, metric: &str) {
        lock(&self.holds).insert(metric.to_string(), Arc::new(Notify::new()));
    }

    /// Let one held fetch of `metric` resolve and stop holding new ones.
    pub fn release(&self, metric: &str) {
        if let Some(gate) = lock(&self.holds).remove(metric) {
            gate.notify_one();
        }
    }

    /// Every plot request received so far, in arrival order.
    pub fn plot_requests(&self) -> Vec<PlotRequest> {
        lock(&self.plot_requests).clone()
    }

    pub fn renamed(&self) -> Vec<(String, String)> {
        lock(&self.renamed).clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl DashboardBackend for MockBackend {
    async fn list_experiments(&self) -> Result<ExperimentsResponse, ApiError> {
        lock(&self.experiments).clone()
    }

    async fn fetch_plot(&self, request: PlotRequest) -> Result<PlotFigure, ApiError> {
        let metric = request.metric.clone();
        lock(&self.plot_requests).push(request);

        let gate = lock(&self.holds).get(&metric).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        lock(&self.plots)
            .get(&metric)
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Status {
                    status: 404,
                    body: format!("Metric '{metric}' not found"),
                })
            })
    }

    async fn plot_options(&self) -> Result<PlotOptions, ApiError> {
        lock(&self.options).clone()
    }

    async fn rename_experiment(&self, id: &str, name: &str) -> Result<(), ApiError> {
        let mut experiments = lock(&self.experiments);
        let Ok(response) = experiments.as_mut() else {
            return Err(ApiError::Connection {
                message: "backend unavailable".to_string(),
            });
        };
        let Some(exp) = response.experiments.get_mut(id) else {
            return Err(ApiError::Status {
                status: 404,
                body: format!("Experiment '{id}' not found"),
            });
        };
        exp.metadata.name = Some(name.to_string());
        lock(&self.renamed).push((id.to_string(), name.to_string()));
        Ok(())
    }

    async fn delete_experiment(&self, id: &str) -> Result<(), ApiError> {
        let mut experiments = lock(&self.experiments);
        let Ok(response) = experiments.as_mut() else {
            return Err(ApiError::Connection {
                message: "backend unavailable".to_string(),
            });
        };
        if response.experiments.remove(id).is_none() {
            return Err(ApiError::Status {
                status: 404,
                body: format!("Experiment '{id}' not found"),
            });
        }
        lock(&self.deleted).push(id.to_string());
        Ok(())
    }

    async fn fetch_images(&self, experiment: &str) -> Result<Vec<ImageEntry>, ApiError> {
        Ok(lock(&self.images).get(experiment).cloned().unwrap_or_default())
    }

    async fn fetch_text(&self, experiment: &str) -> Result<Vec<TextEntry>, ApiError> {
        Ok(lock(&self.texts).get(experiment).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Trace, XAxisMode, YAxisScale};

    fn request(metric: &str) -> PlotRequest {
        PlotRequest {
            experiments: vec!["run_a".into()],
            metric: metric.into(),
            x_axis: XAxisMode::Step,
            y_axis_scale: YAxisScale::Linear,
        }
    }

    #[tokio::test]
    async fn test_unknown_metric_is_404() {
        let backend = MockBackend::new();
        let err = backend.fetch_plot(request("loss")).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
        assert_eq!(backend.plot_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_hold_and_release() {
        let backend = Arc::new(MockBackend::new());
        backend.set_plot(
            "loss",
            PlotFigure {
                data: vec![Trace::new("run_a", vec![0.0], vec![Some(1.0)])],
                layout: serde_json::Value::Null,
            },
        );
        backend.hold("loss");

        let b = Arc::clone(&backend);
        let handle = tokio::spawn(async move { b.fetch_plot(request("loss")).await });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        backend.release("loss");
        let figure = handle.await.unwrap().unwrap();
        assert_eq!(figure.data.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_experiment() {
        let backend = MockBackend::new();
        let err = backend.delete_experiment("nope").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
        assert!(backend.deleted().is_empty());
    }
}
