//! Error types for the tracedash core.
//!
//! Uses `thiserror` for public API error types with structured variants covering
//! backend access, configuration, and panel layout.

use std::path::PathBuf;

/// Top-level error type for the tracedash core library.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
}

/// Errors from backend REST calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {message}")]
    Request { message: String },

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Backend connection failed: {message}")]
    Connection { message: String },

    #[error("Invalid backend URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from manual panel edits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("Column count must be between 1 and 4, got {columns}")]
    InvalidColumns { columns: u32 },

    #[error("No panel for metric '{metric}'")]
    UnknownPanel { metric: String },

    #[error("Panel '{metric}' would overlap panel '{other}'")]
    Collision { metric: String, other: String },
}

/// A type alias for results using the top-level `DashboardError`.
pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_api() {
        let err = DashboardError::Api(ApiError::Connection {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "API error: Backend connection failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_status() {
        let err = ApiError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "Server returned 500: boom");
    }

    #[test]
    fn test_error_display_layout() {
        let err = DashboardError::Layout(LayoutError::InvalidColumns { columns: 7 });
        assert_eq!(
            err.to_string(),
            "Layout error: Column count must be between 1 and 4, got 7"
        );

        let err = LayoutError::Collision {
            metric: "loss".into(),
            other: "acc".into(),
        };
        assert_eq!(err.to_string(), "Panel 'loss' would overlap panel 'acc'");
    }

    #[test]
    fn test_error_display_config() {
        let err = DashboardError::Config(ConfigError::Invalid {
            message: "layout.columns out of range".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration: layout.columns out of range"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DashboardError = io_err.into();
        assert!(matches!(err, DashboardError::Io(_)));
    }

    #[test]
    fn test_error_from_layout() {
        let err: DashboardError = LayoutError::InvalidColumns { columns: 0 }.into();
        assert!(matches!(
            err,
            DashboardError::Layout(LayoutError::InvalidColumns { columns: 0 })
        ));
    }

    #[test]
    fn test_timeout_display() {
        let err = ApiError::Timeout { timeout_secs: 30 };
        assert_eq!(err.to_string(), "Request timed out after 30s");
    }
}
