//! Core data types shared across the dashboard pipeline.
//!
//! These mirror the JSON shapes exchanged with the tracking backend. Fields the
//! pipeline does not interpret are preserved opaquely so a figure survives a
//! decode/encode cycle unchanged.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Recovered,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Interrupted => write!(f, "interrupted"),
            RunStatus::Recovered => write!(f, "recovered"),
        }
    }
}

/// Run metadata as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    pub experiment_id: String,
    /// Start time in seconds since the Unix epoch.
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub start_time_iso: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_resources: Option<bool>,
    /// User-assigned display name, set through rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A single training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub metadata: ExperimentMetadata,
    #[serde(default)]
    pub log_count: u64,
    #[serde(default)]
    pub has_resources: bool,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub has_text: bool,
}

impl Experiment {
    /// Custom name if one was assigned, otherwise the identifier.
    pub fn display_name(&self) -> &str {
        self.metadata
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }

    pub fn is_running(&self) -> bool {
        self.metadata.status == RunStatus::Running
    }

    /// Start time as a UTC timestamp, if representable.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.metadata.start_time.trunc() as i64;
        let nanos = (self.metadata.start_time.fract() * 1e9) as u32;
        Utc.timestamp_opt(secs, nanos).single()
    }
}

/// Response of `GET /api/experiments`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentsResponse {
    #[serde(default)]
    pub experiments: HashMap<String, Experiment>,
    #[serde(default)]
    pub metrics: Vec<String>,
}

/// Which quantity the x-axis of a metric plot follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XAxisMode {
    #[default]
    Step,
    Time,
}

impl fmt::Display for XAxisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XAxisMode::Step => write!(f, "step"),
            XAxisMode::Time => write!(f, "time"),
        }
    }
}

impl FromStr for XAxisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "step" => Ok(XAxisMode::Step),
            "time" => Ok(XAxisMode::Time),
            other => Err(format!("unknown x-axis mode '{other}' (expected step|time)")),
        }
    }
}

/// Y-axis scale applied server-side when rendering a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YAxisScale {
    #[default]
    Linear,
    Log,
}

impl fmt::Display for YAxisScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YAxisScale::Linear => write!(f, "linear"),
            YAxisScale::Log => write!(f, "log"),
        }
    }
}

impl FromStr for YAxisScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(YAxisScale::Linear),
            "log" => Ok(YAxisScale::Log),
            other => Err(format!("unknown y-axis scale '{other}' (expected linear|log)")),
        }
    }
}

/// Body of `POST /api/plot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotRequest {
    pub experiments: Vec<String>,
    pub metric: String,
    pub x_axis: XAxisMode,
    pub y_axis_scale: YAxisScale,
}

/// Line styling of a trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One plotted series: parallel x/y sequences plus display metadata.
///
/// Missing y-values arrive as JSON `null` and are kept as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub x: Vec<f64>,
    #[serde(default)]
    pub y: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trace {
    /// Build a line trace from parallel x/y sequences.
    pub fn new(name: impl Into<String>, x: Vec<f64>, y: Vec<Option<f64>>) -> Self {
        Self {
            name: Some(name.into()),
            x,
            y,
            mode: Some("lines+markers".into()),
            ..Default::default()
        }
    }

    pub fn point_count(&self) -> usize {
        self.x.len()
    }

    pub fn color(&self) -> Option<&str> {
        self.line.as_ref().and_then(|l| l.color.as_deref())
    }

    pub fn width(&self) -> Option<f64> {
        self.line.as_ref().and_then(|l| l.width)
    }

    /// Last non-missing y-value.
    pub fn last_value(&self) -> Option<f64> {
        self.y.iter().rev().find_map(|v| *v)
    }
}

/// Backend-rendered figure for one metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotFigure {
    #[serde(default)]
    pub data: Vec<Trace>,
    #[serde(default)]
    pub layout: Value,
}

impl PlotFigure {
    pub fn has_traces(&self) -> bool {
        !self.data.is_empty()
    }

    /// Figure title from the backend layout, if present.
    pub fn title(&self) -> Option<&str> {
        match self.layout.get("title")? {
            Value::String(s) => Some(s.as_str()),
            other => other.get("text").and_then(Value::as_str),
        }
    }
}

/// A color scale entry of `GET /api/plot-options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScaleOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A plot template entry of `GET /api/plot-options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOption {
    pub value: String,
    pub label: String,
}

/// Response of `GET /api/plot-options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    #[serde(default)]
    pub color_scales: Vec<ColorScaleOption>,
    #[serde(default)]
    pub templates: Vec<TemplateOption>,
}

/// Body of `POST /api/images` and `POST /api/text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRequest {
    pub experiment: String,
}

/// A logged image, base64-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub step: i64,
    pub key: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A logged text table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntry {
    pub step: i64,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
}
