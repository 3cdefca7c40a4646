//! Tracedash CLI: terminal dashboard for experiment metrics.
//!
//! Lists experiments, renders metric panels once or continuously, and manages
//! experiments and configuration on the tracking backend.

mod commands;
mod render;

use clap::Parser;
use std::path::PathBuf;
use tracedash_core::{XAxisMode, YAxisScale};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Tracedash: metric plots for your training runs, in the terminal
#[derive(Parser, Debug)]
#[command(name = "tracedash", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Backend base URL (overrides configuration)
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// List experiments, most recent first
    Experiments {
        /// Print the raw backend response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch and render metric panels once
    Plot(PlotArgs),
    /// Render metric panels and keep them up to date
    Watch(PlotArgs),
    /// List available color palettes and plot templates
    Palettes,
    /// Summarize logged images and text tables of an experiment
    Logs {
        /// Experiment identifier
        id: String,
    },
    /// Give an experiment a display name
    Rename {
        /// Experiment identifier
        id: String,
        /// New display name
        name: String,
    },
    /// Permanently delete an experiment
    Delete {
        /// Experiment identifier
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

/// Selection and display options shared by `plot` and `watch`.
#[derive(clap::Args, Debug, Clone, Default)]
pub(crate) struct PlotArgs {
    /// Experiment to include (repeatable; defaults to the most recent)
    #[arg(short = 'e', long = "experiment")]
    experiments: Vec<String>,

    /// Metric to plot (repeatable; defaults to all metrics)
    #[arg(short = 'm', long = "metric")]
    metrics: Vec<String>,

    /// Smoothing factor between 0 and 1
    #[arg(long)]
    smoothing: Option<f64>,

    /// Color palette identifier
    #[arg(long)]
    palette: Option<String>,

    /// X-axis mode: step or time
    #[arg(long)]
    x_axis: Option<XAxisMode>,

    /// Y-axis scale: linear or log
    #[arg(long)]
    y_scale: Option<YAxisScale>,

    /// Panels per row (1-4)
    #[arg(long)]
    columns: Option<u32>,

    /// Output width in characters
    #[arg(long, default_value_t = 100)]
    width: usize,
}

/// Options that influence how configuration is loaded.
#[derive(Debug, Clone, Default)]
pub(crate) struct GlobalOptions {
    pub server: Option<String>,
    pub config_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "tracedash", "tracedash")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tracedash.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let options = GlobalOptions {
        server: cli.server,
        config_file: cli.config,
    };
    commands::handle_command(cli.command, &workspace, &options).await
}
