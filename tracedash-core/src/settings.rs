//! Session-scoped display settings and the color palette catalog.
//!
//! `SettingsStore` is a cheap, cloneable handle: every consumer that needs the
//! current settings receives a clone of it explicitly instead of reaching for
//! global state. Nothing here is persisted.

use crate::backend::DashboardBackend;
use crate::types::{TemplateOption, XAxisMode, YAxisScale};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Identifier of the "no palette / default template" sentinel entry.
pub const NONE_OPTION: &str = "none";

/// Display settings for metric panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    /// Smoothing factor in [0, 1]; 0 disables smoothing.
    pub smoothing: f64,
    /// Identifier of the active color palette.
    pub color_palette: String,
    pub x_axis_mode: XAxisMode,
    pub y_axis_scale: YAxisScale,
    pub auto_refresh_enabled: bool,
    /// Plot auto-refresh period in seconds.
    pub auto_refresh_interval_secs: u64,
    /// Identifier of the plot template, `"none"` for the backend default.
    pub plot_template: String,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            smoothing: 0.0,
            color_palette: "plotly".to_string(),
            x_axis_mode: XAxisMode::Step,
            y_axis_scale: YAxisScale::Linear,
            auto_refresh_enabled: true,
            auto_refresh_interval_secs: 5,
            plot_template: NONE_OPTION.to_string(),
        }
    }
}

impl PlotSettings {
    /// Check the documented invariants and return human-readable warnings.
    ///
    /// Values are never clamped or rejected; callers decide what to do.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(0.0..=1.0).contains(&self.smoothing) {
            warnings.push(format!(
                "smoothing ({}) is outside [0, 1]",
                self.smoothing
            ));
        }
        if self.auto_refresh_enabled && self.auto_refresh_interval_secs == 0 {
            warnings.push(
                "auto_refresh_interval_secs must be positive while auto refresh is enabled"
                    .to_string(),
            );
        }
        if self.color_palette.is_empty() {
            warnings.push("color_palette is empty".to_string());
        }
        warnings
    }

    /// Merge the fields present in `update`, leaving the rest untouched.
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(smoothing) = update.smoothing {
            self.smoothing = smoothing;
        }
        if let Some(palette) = update.color_palette {
            self.color_palette = palette;
        }
        if let Some(mode) = update.x_axis_mode {
            self.x_axis_mode = mode;
        }
        if let Some(scale) = update.y_axis_scale {
            self.y_axis_scale = scale;
        }
        if let Some(enabled) = update.auto_refresh_enabled {
            self.auto_refresh_enabled = enabled;
        }
        if let Some(interval) = update.auto_refresh_interval_secs {
            self.auto_refresh_interval_secs = interval;
        }
        if let Some(template) = update.plot_template {
            self.plot_template = template;
        }
    }
}

/// A partial settings update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_mode: Option<XAxisMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_scale: Option<YAxisScale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_refresh_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_refresh_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_template: Option<String>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether this update touches a setting that is rendered server-side.
    pub fn affects_fetch(&self) -> bool {
        self.x_axis_mode.is_some() || self.y_axis_scale.is_some()
    }
}

/// A named, ordered list of colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub value: String,
    pub label: String,
    pub colors: Vec<String>,
}

impl ColorPalette {
    pub fn new(value: &str, label: &str, colors: &[&str]) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            colors: colors.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// The built-in palette used when the backend catalog cannot be loaded.
    pub fn fallback() -> Self {
        Self::new(
            "plotly",
            "Plotly",
            &["#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A"],
        )
    }
}

/// A selectable palette option; `colors` is empty for the sentinel entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteChoice {
    pub value: String,
    pub label: String,
    pub colors: Vec<String>,
}

/// The palettes and templates offered by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaletteCatalog {
    pub palettes: Vec<ColorPalette>,
    /// Always starts with the `"none"` sentinel once loaded.
    pub templates: Vec<TemplateOption>,
}

impl PaletteCatalog {
    fn sentinel_template() -> TemplateOption {
        TemplateOption {
            value: NONE_OPTION.to_string(),
            label: "None (Default)".to_string(),
        }
    }

    /// Catalog holding only the built-in fallback palette.
    pub fn fallback() -> Self {
        Self {
            palettes: vec![ColorPalette::fallback()],
            templates: vec![Self::sentinel_template()],
        }
    }

    /// Build a catalog from the backend's option lists.
    ///
    /// Palettes without colors are dropped since they cannot color anything.
    pub fn from_options(options: crate::types::PlotOptions) -> Self {
        let palettes = options
            .color_scales
            .into_iter()
            .filter(|scale| !scale.colors.is_empty())
            .map(|scale| ColorPalette {
                value: scale.value,
                label: scale.label,
                colors: scale.colors,
            })
            .collect();
        let mut templates = vec![Self::sentinel_template()];
        templates.extend(
            options
                .templates
                .into_iter()
                .filter(|t| t.value != NONE_OPTION),
        );
        Self {
            palettes,
            templates,
        }
    }

    pub fn find(&self, value: &str) -> Option<&ColorPalette> {
        self.palettes.iter().find(|p| p.value == value)
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }
}

#[derive(Debug, Default)]
struct SettingsInner {
    settings: PlotSettings,
    catalog: PaletteCatalog,
}

/// Shared handle to the current settings and palette catalog.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<SettingsInner>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given settings.
    pub fn with_settings(settings: PlotSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SettingsInner {
                settings,
                catalog: PaletteCatalog::default(),
            })),
        }
    }

    /// Snapshot of the current settings.
    pub fn get(&self) -> PlotSettings {
        self.read(|inner| inner.settings.clone())
    }

    /// Merge a partial update into the current settings and return the result.
    pub fn update(&self, update: SettingsUpdate) -> PlotSettings {
        let updated = self.write(|inner| {
            inner.settings.apply(update);
            inner.settings.clone()
        });
        for warning in updated.validate() {
            warn!(warning = warning.as_str(), "Plot settings outside documented range");
        }
        debug!(
            smoothing = updated.smoothing,
            palette = updated.color_palette.as_str(),
            x_axis = %updated.x_axis_mode,
            y_scale = %updated.y_axis_scale,
            "Plot settings updated"
        );
        updated
    }

    /// Snapshot of the palette catalog.
    pub fn catalog(&self) -> PaletteCatalog {
        self.read(|inner| inner.catalog.clone())
    }

    /// Replace the palette catalog wholesale.
    pub fn set_catalog(&self, catalog: PaletteCatalog) {
        self.write(|inner| inner.catalog = catalog);
    }

    /// Palette matching the configured `color_palette`, if the catalog has it.
    pub fn active_palette(&self) -> Option<ColorPalette> {
        self.read(|inner| inner.catalog.find(&inner.settings.color_palette).cloned())
    }

    /// The sentinel `"none"` option followed by every loaded palette.
    pub fn palette_choices(&self) -> Vec<PaletteChoice> {
        self.read(|inner| {
            let mut choices = vec![PaletteChoice {
                value: NONE_OPTION.to_string(),
                label: "None (Default)".to_string(),
                colors: Vec::new(),
            }];
            choices.extend(inner.catalog.palettes.iter().map(|p| PaletteChoice {
                value: p.value.clone(),
                label: p.label.clone(),
                colors: p.colors.clone(),
            }));
            choices
        })
    }

    /// Fetch the palette catalog from the backend.
    ///
    /// Failures are never surfaced: the built-in single-palette catalog is
    /// installed instead so color assignment always has something to use.
    pub async fn load_palette_catalog(&self, backend: &dyn DashboardBackend) -> PaletteCatalog {
        let catalog = match backend.plot_options().await {
            Ok(options) => {
                let catalog = PaletteCatalog::from_options(options);
                if catalog.is_empty() {
                    warn!("Backend returned no usable color palettes; using built-in fallback");
                    PaletteCatalog::fallback()
                } else {
                    info!(
                        palettes = catalog.palettes.len(),
                        templates = catalog.templates.len(),
                        "Loaded palette catalog"
                    );
                    catalog
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to load plot options; using built-in palette");
                PaletteCatalog::fallback()
            }
        };
        self.set_catalog(catalog.clone());
        catalog
    }

    fn read<T>(&self, f: impl FnOnce(&SettingsInner) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut SettingsInner) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
