//! `reqwest` client for the tracking backend's REST API.

use super::DashboardBackend;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::types::{
    ExperimentRequest, ExperimentsResponse, ImageEntry, PlotFigure, PlotOptions, PlotRequest,
    TextEntry,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Longest error body kept in an `ApiError::Status`.
const MAX_ERROR_BODY: usize = 300;

/// Backend reached over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    timeout_secs: u64,
}

impl HttpBackend {
    /// Create a client from the server section of the configuration.
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&config.base_url).map_err(|_| ApiError::InvalidUrl {
            url: config.base_url.clone(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: config.base_url.clone(),
            });
        }
        // Joining relative paths keeps any prefix only if the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Request {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|_| ApiError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
        })
    }

    fn experiment_endpoint(&self, id: &str, suffix: &str) -> Result<Url, ApiError> {
        let encoded = urlencoding::encode(id);
        self.endpoint(&format!("api/experiments/{encoded}{suffix}"))
    }

    /// Send a request and return the raw body of a 2xx response.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(map_http_error(status, &body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        parse_body(&body)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            warn!(timeout_secs = self.timeout_secs, "Backend request timed out");
            ApiError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            ApiError::Connection {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::ResponseParse {
                message: err.to_string(),
            }
        } else {
            ApiError::Request {
                message: err.to_string(),
            }
        }
    }
}

/// Map a non-2xx response to an `ApiError::Status`.
///
/// FastAPI-style `{"detail": "..."}` bodies are reduced to their detail text.
fn map_http_error(status: StatusCode, body: &str) -> ApiError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    let body = if detail.chars().count() > MAX_ERROR_BODY {
        let cut: String = detail.chars().take(MAX_ERROR_BODY).collect();
        format!("{cut}...")
    } else if detail.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        detail
    };
    debug!(status = status.as_u16(), body = %body, "Backend returned error status");
    ApiError::Status {
        status: status.as_u16(),
        body,
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::ResponseParse {
        message: format!("Invalid JSON: {e}"),
    })
}

#[async_trait]
impl DashboardBackend for HttpBackend {
    async fn list_experiments(&self) -> Result<ExperimentsResponse, ApiError> {
        let url = self.endpoint("api/experiments")?;
        debug!(url = %url, "Listing experiments");
        self.send_json(self.client.get(url)).await
    }

    async fn fetch_plot(&self, request: PlotRequest) -> Result<PlotFigure, ApiError> {
        let url = self.endpoint("api/plot")?;
        debug!(
            url = %url,
            metric = %request.metric,
            experiments = request.experiments.len(),
            "Fetching plot"
        );
        // A `null` body means the backend had nothing to draw.
        let figure: Option<PlotFigure> =
            self.send_json(self.client.post(url).json(&request)).await?;
        Ok(figure.unwrap_or_default())
    }

    async fn plot_options(&self) -> Result<PlotOptions, ApiError> {
        let url = self.endpoint("api/plot-options")?;
        self.send_json(self.client.get(url)).await
    }

    async fn rename_experiment(&self, id: &str, name: &str) -> Result<(), ApiError> {
        let url = self.experiment_endpoint(id, "/rename")?;
        debug!(url = %url, name, "Renaming experiment");
        self.send(self.client.put(url).json(&json!({ "name": name })))
            .await
            .map(|_| ())
    }

    async fn delete_experiment(&self, id: &str) -> Result<(), ApiError> {
        let url = self.experiment_endpoint(id, "")?;
        debug!(url = %url, "Deleting experiment");
        self.send(self.client.delete(url).json(&json!({ "confirm": true })))
            .await
            .map(|_| ())
    }

    async fn fetch_images(&self, experiment: &str) -> Result<Vec<ImageEntry>, ApiError> {
        let url = self.endpoint("api/images")?;
        let body = ExperimentRequest {
            experiment: experiment.to_string(),
        };
        self.send_json(self.client.post(url).json(&body)).await
    }

    async fn fetch_text(&self, experiment: &str) -> Result<Vec<TextEntry>, ApiError> {
        let url = self.endpoint("api/text")?;
        let body = ExperimentRequest {
            experiment: experiment.to_string(),
        };
        self.send_json(self.client.post(url).json(&body)).await
    }
}
