//! Periodic refresh of the experiment list and of displayed plots.

use crate::config::RefreshConfig;
use crate::settings::PlotSettings;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Which periodic job is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTick {
    /// Reload the experiment list.
    Experiments,
    /// Refetch plots for the current selection.
    Plots,
}

/// Two independent timers: a fixed experiment-list period and an optional
/// plot period driven by the auto-refresh settings.
///
/// Ticks missed while the owner was busy are skipped rather than bunched up.
/// Must be created inside a tokio runtime.
pub struct RefreshScheduler {
    experiments: Interval,
    plots: Option<Interval>,
}

impl RefreshScheduler {
    pub fn new(config: &RefreshConfig, settings: &PlotSettings) -> Self {
        let experiments_secs = config.experiments_interval_secs.max(1);
        let plot_period = plot_period(settings);
        debug!(
            experiments_secs,
            plot_secs = plot_period.map(|p| p.as_secs()),
            "Refresh timers started"
        );
        Self {
            experiments: periodic(Duration::from_secs(experiments_secs)),
            plots: plot_period.map(periodic),
        }
    }

    /// Wait for the next due job. Experiment ticks win ties.
    pub async fn next_tick(&mut self) -> RefreshTick {
        let Self { experiments, plots } = self;
        let plots = async move {
            match plots.as_mut() {
                Some(interval) => interval.tick().await,
                None => std::future::pending::<Instant>().await,
            }
        };
        tokio::select! {
            biased;
            _ = experiments.tick() => RefreshTick::Experiments,
            _ = plots => RefreshTick::Plots,
        }
    }
}

/// Plot refresh period, or `None` when auto refresh is off.
pub fn plot_period(settings: &PlotSettings) -> Option<Duration> {
    (settings.auto_refresh_enabled && settings.auto_refresh_interval_secs > 0)
        .then(|| Duration::from_secs(settings.auto_refresh_interval_secs))
}

/// Interval whose first tick is one full period away.
fn periodic(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
