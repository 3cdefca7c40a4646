//! Client-side smoothing of metric traces.
//!
//! Smoothing never replaces data: each eligible trace is kept as a faded,
//! non-interactive backdrop and followed by a centered moving-average overlay.

use crate::types::{LineStyle, Trace};

/// Traces shorter than this pass through unsmoothed.
pub const MIN_POINTS: usize = 3;

/// Opacity of the backdrop copy of a smoothed trace.
pub const BACKDROP_OPACITY: f64 = 0.3;

/// Line width assumed when the backend did not set one.
pub const DEFAULT_LINE_WIDTH: f64 = 2.0;

const SMOOTHED_SUFFIX: &str = "(smoothed)";

/// Averaging window for a series of `point_count` points.
///
/// `max_window = max(5, floor(0.2 * n))`, `window = max(1, floor(factor * max_window))`.
pub fn window_size(point_count: usize, factor: f64) -> usize {
    let max_window = 5_usize.max((point_count as f64 * 0.2).floor() as usize);
    let scaled = (factor * max_window as f64).floor();
    if scaled.is_finite() && scaled >= 1.0 {
        scaled as usize
    } else {
        1
    }
}

/// Centered moving average over `values`.
///
/// The window around index `i` spans `window / 2` points on each side, clipped to
/// the series. Missing values are skipped; a window with no values keeps the
/// original entry.
pub fn centered_moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let half = window / 2;
    let len = values.len();
    (0..len)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(len);
            let (sum, count) = values[start..end]
                .iter()
                .flatten()
                .fold((0.0_f64, 0usize), |(sum, count), v| (sum + v, count + 1));
            if count > 0 {
                Some(sum / count as f64)
            } else {
                values[i]
            }
        })
        .collect()
}

/// Expand `traces` with smoothed overlays.
///
/// A factor of zero (or below) returns the traces unchanged. Otherwise each trace
/// with at least [`MIN_POINTS`] points becomes two entries, its faded original
/// followed by the smoothed copy, so input order is preserved for positional
/// coloring.
pub fn apply_smoothing(traces: &[Trace], factor: f64) -> Vec<Trace> {
    if factor.is_nan() || factor <= 0.0 {
        return traces.to_vec();
    }

    let mut out = Vec::with_capacity(traces.len() * 2);
    for trace in traces {
        if trace.point_count() < MIN_POINTS {
            out.push(trace.clone());
            continue;
        }
        out.push(backdrop(trace));
        out.push(smoothed(trace, factor));
    }
    out
}

fn backdrop(trace: &Trace) -> Trace {
    Trace {
        opacity: Some(BACKDROP_OPACITY),
        showlegend: Some(false),
        hoverinfo: Some("skip".to_string()),
        ..trace.clone()
    }
}

fn smoothed(trace: &Trace, factor: f64) -> Trace {
    let window = window_size(trace.y.len(), factor);
    let name = match trace.name.as_deref() {
        Some(name) if !name.is_empty() => format!("{name} {SMOOTHED_SUFFIX}"),
        _ => "smoothed".to_string(),
    };
    let line = trace.line.clone().unwrap_or_default();
    let width = line.width.unwrap_or(DEFAULT_LINE_WIDTH) + 1.0;
    Trace {
        name: Some(name),
        y: centered_moving_average(&trace.y, window),
        line: Some(LineStyle {
            width: Some(width),
            ..line
        }),
        ..trace.clone()
    }
}
