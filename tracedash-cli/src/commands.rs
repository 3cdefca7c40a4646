//! CLI subcommand handlers.

use crate::render;
use crate::{Commands, ConfigAction, GlobalOptions, PlotArgs};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracedash_core::config::{init_workspace_config, load_config};
use tracedash_core::{
    Dashboard, DashboardBackend, DashboardConfig, HttpBackend, RefreshScheduler, RefreshTick,
    SettingsUpdate,
};
use tracing::{info, warn};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    options: &GlobalOptions,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace, options),
        command => {
            let config = resolve_config(workspace, options)?;
            let backend: Arc<dyn DashboardBackend> = Arc::new(
                HttpBackend::new(&config.server).context("Failed to create backend client")?,
            );
            run_with_backend(command, &config, backend).await
        }
    }
}

/// Load configuration and apply command-line overrides.
pub(crate) fn resolve_config(
    workspace: &Path,
    options: &GlobalOptions,
) -> anyhow::Result<DashboardConfig> {
    let mut config = load_config(Some(workspace), options.config_file.as_deref(), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(server) = &options.server {
        config.server.base_url = server.clone();
    }
    config
        .ensure_valid()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    for warning in config.plot.validate() {
        warn!(warning = warning.as_str(), "Configured plot settings out of range");
    }
    Ok(config)
}

/// Run a backend-facing subcommand.
pub(crate) async fn run_with_backend(
    command: Commands,
    config: &DashboardConfig,
    backend: Arc<dyn DashboardBackend>,
) -> anyhow::Result<()> {
    match command {
        Commands::Experiments { json } => {
            let output = list_experiments(backend, config, json).await?;
            print!("{output}");
            Ok(())
        }
        Commands::Plot(args) => {
            let mut dashboard = open_dashboard(backend, config, &args).await?;
            dashboard.settle().await;
            print!("{}", render::render_dashboard(&dashboard.view(), args.width));
            Ok(())
        }
        Commands::Watch(args) => {
            let dashboard = open_dashboard(backend, config, &args).await?;
            watch(dashboard, config, args.width).await
        }
        Commands::Palettes => {
            let dashboard = Dashboard::from_config(backend, config)?;
            let catalog = dashboard.load_palettes().await;
            let choices = dashboard.settings().palette_choices();
            let active = dashboard.settings().get().color_palette;
            print!("{}", render::render_palettes(&choices, &catalog, &active));
            Ok(())
        }
        Commands::Logs { id } => {
            let dashboard = Dashboard::from_config(backend, config)?;
            let logs = dashboard.experiment_logs(&id).await;
            print!("{}", render::render_logs(&id, &logs));
            Ok(())
        }
        Commands::Rename { id, name } => {
            let mut dashboard = Dashboard::from_config(backend, config)?;
            dashboard
                .rename_experiment(&id, &name)
                .await
                .with_context(|| format!("Failed to rename experiment '{id}'"))?;
            println!("Renamed {id} to \"{name}\"");
            Ok(())
        }
        Commands::Delete { id, yes } => {
            if !yes {
                anyhow::bail!(
                    "Deleting '{id}' removes all of its logged data. Re-run with --yes to confirm."
                );
            }
            let mut dashboard = Dashboard::from_config(backend, config)?;
            dashboard
                .delete_experiment(&id)
                .await
                .with_context(|| format!("Failed to delete experiment '{id}'"))?;
            println!("Deleted {id}");
            Ok(())
        }
        Commands::Config { .. } => anyhow::bail!("Configuration commands do not use the backend"),
    }
}

async fn list_experiments(
    backend: Arc<dyn DashboardBackend>,
    config: &DashboardConfig,
    json: bool,
) -> anyhow::Result<String> {
    if json {
        let response = backend
            .list_experiments()
            .await
            .context("Failed to load experiments")?;
        return Ok(format!("{}\n", serde_json::to_string_pretty(&response)?));
    }
    let mut dashboard = Dashboard::from_config(backend, config)?;
    dashboard
        .reload_experiments()
        .await
        .context("Failed to load experiments")?;
    Ok(render::render_experiments(dashboard.catalog()))
}

/// Build a session from the command-line selection and display options.
pub(crate) async fn open_dashboard(
    backend: Arc<dyn DashboardBackend>,
    config: &DashboardConfig,
    args: &PlotArgs,
) -> anyhow::Result<Dashboard> {
    let mut dashboard = Dashboard::from_config(backend, config)?;
    dashboard
        .reload_experiments()
        .await
        .context("Failed to load experiments")?;
    dashboard.load_palettes().await;

    if let Some(columns) = args.columns {
        dashboard.set_columns(columns)?;
    }
    let update = SettingsUpdate {
        smoothing: args.smoothing,
        color_palette: args.palette.clone(),
        x_axis_mode: args.x_axis,
        y_axis_scale: args.y_scale,
        ..Default::default()
    };
    if !update.is_empty() {
        dashboard.update_settings(update);
    }

    let experiments = if args.experiments.is_empty() {
        dashboard
            .catalog()
            .ordered()
            .first()
            .map(|e| vec![e.id.clone()])
            .unwrap_or_default()
    } else {
        args.experiments.clone()
    };
    for id in &experiments {
        if dashboard.catalog().get(id).is_none() {
            warn!(experiment = id.as_str(), "Experiment not found in catalog");
        }
        dashboard.toggle_experiment(id);
    }

    let metrics = if args.metrics.is_empty() {
        dashboard.catalog().metrics().to_vec()
    } else {
        args.metrics.clone()
    };
    for metric in &metrics {
        dashboard.toggle_metric(metric);
    }
    info!(
        experiments = experiments.len(),
        metrics = metrics.len(),
        "Dashboard selection ready"
    );
    Ok(dashboard)
}

/// Re-render whenever a plot arrives or a refresh is due, until Ctrl-C.
async fn watch(mut dashboard: Dashboard, config: &DashboardConfig, width: usize) -> anyhow::Result<()> {
    let mut scheduler = RefreshScheduler::new(&config.refresh, &dashboard.settings().get());
    redraw(&dashboard, width);

    loop {
        let pending = dashboard.has_pending();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; stopping watch");
                break;
            }
            Some(outcome) = dashboard.next_outcome(), if pending => {
                if !dashboard.apply_outcome(outcome) {
                    continue;
                }
            }
            tick = scheduler.next_tick() => match tick {
                RefreshTick::Experiments => {
                    // failures are shown in the header
                    let _ = dashboard.reload_experiments().await;
                }
                RefreshTick::Plots => {
                    dashboard.refresh_plots();
                    continue;
                }
            },
        }
        redraw(&dashboard, width);
    }
    Ok(())
}

fn redraw(dashboard: &Dashboard, width: usize) {
    // clear screen, cursor home
    print!("\x1B[2J\x1B[H");
    print!("{}", render::render_dashboard(&dashboard.view(), width));
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    options: &GlobalOptions,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let (config_path, created) = init_workspace_config(workspace)?;
            if created {
                println!(
                    "Created default configuration at: {}",
                    config_path.display()
                );
            } else {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(workspace, options)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
