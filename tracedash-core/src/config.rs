//! Configuration system for tracedash.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config -> explicit file -> environment variables -> overrides.

use crate::error::ConfigError;
use crate::layout::MAX_COLUMNS;
use crate::settings::PlotSettings;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name of the workspace-local configuration.
pub const WORKSPACE_CONFIG_DIR: &str = ".tracedash";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerConfig,
    pub refresh: RefreshConfig,
    /// Initial display settings for the session.
    pub plot: PlotSettings,
    pub layout: LayoutConfig,
}

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Background refresh of the experiment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub experiments_interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            experiments_interval_secs: 30,
        }
    }
}

/// Panel grid options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Panels per row, 1 to 4.
    pub columns: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { columns: 2 }
    }
}

impl DashboardConfig {
    /// Collect problems that would make the configuration unusable.
    ///
    /// Plot setting warnings are included but do not make the config invalid;
    /// see [`DashboardConfig::ensure_valid`].
    pub fn validate(&self) -> Vec<String> {
        let mut problems = self.hard_errors();
        problems.extend(self.plot.validate());
        problems
    }

    /// Fail on errors that no component can work around.
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        let errors = self.hard_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                message: errors.join("; "),
            })
        }
    }

    fn hard_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if url::Url::parse(&self.server.base_url).is_err() {
            errors.push(format!(
                "server.base_url '{}' is not a valid URL",
                self.server.base_url
            ));
        }
        if self.server.timeout_secs == 0 {
            errors.push("server.timeout_secs must be greater than 0".to_string());
        }
        if self.refresh.experiments_interval_secs == 0 {
            errors.push("refresh.experiments_interval_secs must be greater than 0".to_string());
        }
        if !(1..=MAX_COLUMNS).contains(&self.layout.columns) {
            errors.push(format!(
                "layout.columns must be between 1 and {MAX_COLUMNS}, got {}",
                self.layout.columns
            ));
        }
        errors
    }
}

/// Path of the user-level config file, e.g. `~/.config/tracedash/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "tracedash", "tracedash")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_CONFIG_DIR).join("config.toml")
}

/// Load configuration by merging all sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `TRACEDASH_`, `__` between sections)
/// 3. An explicit config file (`--config`)
/// 4. Workspace-local config (`.tracedash/config.toml`)
/// 5. User config (`~/.config/tracedash/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&DashboardConfig>,
) -> Result<DashboardConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(DashboardConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // TRACEDASH_SERVER__BASE_URL, TRACEDASH_PLOT__SMOOTHING, ...
    figment = figment.merge(Env::prefixed("TRACEDASH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Write the default configuration to the workspace config file.
///
/// An existing file is left untouched. Returns the path and whether the file
/// was created.
pub fn init_workspace_config(workspace: &Path) -> crate::Result<(PathBuf, bool)> {
    let path = workspace_config_path(workspace);
    if path.exists() {
        return Ok((path, false));
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let toml_str = toml::to_string_pretty(&DashboardConfig::default())?;
    std::fs::write(&path, toml_str)?;
    Ok((path, true))
}

/// Check whether a user-level or workspace-level config file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{XAxisMode, YAxisScale};

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.refresh.experiments_interval_secs, 30);
        assert_eq!(config.layout.columns, 2);
        assert_eq!(config.plot, PlotSettings::default());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = DashboardConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: DashboardConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: DashboardConfig = toml::from_str(
            r#"
[plot]
smoothing = 0.4
"#,
        )
        .unwrap();
        assert_eq!(parsed.plot.smoothing, 0.4);
        assert_eq!(parsed.plot.color_palette, "plotly");
        assert_eq!(parsed.server, ServerConfig::default());
    }

    #[test]
    fn test_validate_reports_hard_errors() {
        let mut config = DashboardConfig::default();
        config.server.base_url = "::nope".into();
        config.layout.columns = 7;
        config.server.timeout_secs = 0;
        let problems = config.validate();
        assert_eq!(problems.len(), 3);
        assert!(config.ensure_valid().is_err());
    }

    #[test]
    fn test_plot_warnings_do_not_fail() {
        let mut config = DashboardConfig::default();
        config.plot.smoothing = 3.0;
        assert_eq!(config.validate().len(), 1);
        assert!(config.ensure_valid().is_ok());
    }

    #[test]
    fn test_load_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path()), None, None).unwrap();
        assert_eq!(config.layout.columns, 2);
        assert_eq!(config.plot.x_axis_mode, XAxisMode::Step);
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = DashboardConfig::default();
        overrides.server.base_url = "http://tracker:9000".to_string();
        overrides.layout.columns = 3;

        let config = load_config(None, None, Some(&overrides)).unwrap();
        assert_eq!(config.server.base_url, "http://tracker:9000");
        assert_eq!(config.layout.columns, 3);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(WORKSPACE_CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[server]
base_url = "http://10.0.0.5:8080"

[plot]
y_axis_scale = "log"
x_axis_mode = "time"

[layout]
columns = 4
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None, None).unwrap();
        assert_eq!(config.server.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.plot.y_axis_scale, YAxisScale::Log);
        assert_eq!(config.plot.x_axis_mode, XAxisMode::Time);
        assert_eq!(config.layout.columns, 4);
        assert!(config_exists(Some(dir.path())));
    }

    #[test]
    fn test_explicit_file_wins_over_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(WORKSPACE_CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[layout]\ncolumns = 4\n").unwrap();
        let explicit = dir.path().join("custom.toml");
        std::fs::write(&explicit, "[layout]\ncolumns = 1\n").unwrap();

        let config = load_config(Some(dir.path()), Some(&explicit), None).unwrap();
        assert_eq!(config.layout.columns, 1);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_config(None, Some(&missing), None).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[layout]\ncolumns = \"many\"\n").unwrap();
        let err = load_config(None, Some(&bad), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_config_exists_empty_workspace() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!workspace_config_path(dir.path()).exists());
    }

    #[test]
    fn test_init_workspace_config() {
        let dir = tempfile::tempdir().unwrap();
        let (path, created) = init_workspace_config(dir.path()).unwrap();
        assert!(created);
        assert_eq!(path, workspace_config_path(dir.path()));
        let loaded = load_config(Some(dir.path()), None, None).unwrap();
        assert_eq!(loaded.layout, LayoutConfig::default());

        std::fs::write(&path, "[layout]\ncolumns = 3\n").unwrap();
        let (_, created) = init_workspace_config(dir.path()).unwrap();
        assert!(!created);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[layout]\ncolumns = 3\n"
        );
    }

    #[test]
    fn test_init_workspace_config_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // a plain file where the workspace directory should be
        let workspace = dir.path().join("not_a_dir");
        std::fs::write(&workspace, "").unwrap();
        let err = init_workspace_config(&workspace).unwrap_err();
        assert!(matches!(err, crate::DashboardError::Io(_)));
    }
}
