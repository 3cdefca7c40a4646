//! Plain-text rendering of dashboard views.

use std::fmt::Write;
use tracedash_core::layout::GRID_COLUMNS;
use std::collections::BTreeMap;
use tracedash_core::{
    DashboardView, ExperimentCatalog, ExperimentLogs, GridStatus, PaletteCatalog, PaletteChoice,
    PanelContent, PanelView, Trace,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const LABEL_WIDTH: usize = 24;

/// Downsample `values` into `width` buckets and draw them as a sparkline.
///
/// Buckets without any value are left blank.
pub fn sparkline(values: &[Option<f64>], width: usize) -> String {
    if width == 0 || values.is_empty() {
        return String::new();
    }
    let buckets = width.min(values.len());
    let means: Vec<Option<f64>> = (0..buckets)
        .map(|b| {
            let start = b * values.len() / buckets;
            let end = ((b + 1) * values.len() / buckets).max(start + 1);
            let present: Vec<f64> = values[start..end]
                .iter()
                .flatten()
                .copied()
                .filter(|v| v.is_finite())
                .collect();
            (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64)
        })
        .collect();

    let (lo, hi) = means
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let span = hi - lo;
    means
        .iter()
        .map(|m| match m {
            None => ' ',
            Some(_) if span <= 0.0 => SPARK_LEVELS[SPARK_LEVELS.len() / 2],
            Some(v) => {
                let level = ((v - lo) / span * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            }
        })
        .collect()
}

/// Pad or truncate `text` to exactly `width` terminal columns.
pub fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        let pad = width - text.width();
        return format!("{text}{}", " ".repeat(pad));
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn format_value(value: Option<f64>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v != 0.0 && (v.abs() >= 1e5 || v.abs() < 1e-3) => format!("{v:.3e}"),
        Some(v) => format!("{v:.4}"),
    }
}

fn render_trace(out: &mut String, trace: &Trace, spark_width: usize) {
    let name = trace.name.as_deref().unwrap_or("(unnamed)");
    let color = trace.color().unwrap_or("-");
    let _ = writeln!(
        out,
        "  {} {} {:>12}  {}",
        fit(name, LABEL_WIDTH),
        sparkline(&trace.y, spark_width),
        format_value(trace.last_value()),
        color
    );
}

fn render_panel(out: &mut String, panel: &PanelView, width: usize) {
    let rect = &panel.rect;
    let _ = writeln!(
        out,
        "── {} ── [x={} y={} w={} h={}]",
        panel.metric, rect.x, rect.y, rect.w, rect.h
    );
    let panel_width = (width * rect.w as usize / GRID_COLUMNS as usize).max(LABEL_WIDTH + 8);
    let spark_width = panel_width.saturating_sub(LABEL_WIDTH + 4).max(4);

    match &panel.content {
        PanelContent::Idle => {
            let _ = writeln!(out, "  (select an experiment)");
        }
        PanelContent::Loading => {
            let _ = writeln!(out, "  loading…");
        }
        PanelContent::Error(message) => {
            let _ = writeln!(out, "  error: {message}");
        }
        PanelContent::Empty => {
            let _ = writeln!(out, "  no data");
        }
        PanelContent::Plot { title, traces } => {
            if let Some(title) = title.as_deref().filter(|t| *t != panel.metric) {
                let _ = writeln!(out, "  {title}");
            }
            // faded copies behind smoothed lines are not listed
            for trace in traces.iter().filter(|t| t.showlegend != Some(false)) {
                render_trace(out, trace, spark_width);
            }
        }
    }
}

/// Render a dashboard view as text, panels in grid order.
pub fn render_dashboard(view: &DashboardView, width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} experiments ({} running) · {} metrics · {} selected · {} per row",
        view.experiment_count,
        view.running_count,
        view.metric_count,
        view.selected_experiments.len(),
        view.columns
    );
    if let Some(error) = &view.catalog_error {
        let _ = writeln!(out, "! {error}");
    }

    match view.status {
        GridStatus::NoSelection if view.panels.is_empty() => {
            let _ = writeln!(out, "Select at least one experiment and one metric.");
            return out;
        }
        GridStatus::NoData => {
            let _ = writeln!(out, "No data for the selected experiments and metrics.");
        }
        GridStatus::Loading => {
            let _ = writeln!(out, "Loading plots…");
        }
        _ => {}
    }

    let mut panels: Vec<&PanelView> = view.panels.iter().collect();
    panels.sort_by_key(|p| (p.rect.y, p.rect.x));
    for panel in panels {
        out.push('\n');
        render_panel(&mut out, panel, width);
    }
    out
}

/// Experiment table, most recent first.
pub fn render_experiments(catalog: &ExperimentCatalog) -> String {
    let mut out = String::new();
    if catalog.is_empty() {
        let _ = writeln!(out, "No experiments found.");
        return out;
    }
    let _ = writeln!(
        out,
        "{} {} {:<11} {:<19} {:>7}",
        fit("ID", 28),
        fit("NAME", 24),
        "STATUS",
        "STARTED",
        "LOGS"
    );
    for exp in catalog.ordered() {
        let started = exp
            .started_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| exp.metadata.start_time_iso.clone());
        let mut flags = Vec::new();
        if exp.has_images {
            flags.push("images");
        }
        if exp.has_text {
            flags.push("text");
        }
        if exp.has_resources {
            flags.push("resources");
        }
        let _ = writeln!(
            out,
            "{} {} {:<11} {:<19} {:>7} {}",
            fit(&exp.id, 28),
            fit(exp.display_name(), 24),
            exp.metadata.status.to_string(),
            started,
            exp.log_count,
            flags.join(",")
        );
    }
    let _ = writeln!(out, "\nMetrics: {}", catalog.metrics().join(", "));
    out
}

/// Palette choices with swatch previews, plus templates.
pub fn render_palettes(choices: &[PaletteChoice], catalog: &PaletteCatalog, active: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Color palettes:");
    for choice in choices {
        let marker = if choice.value == active { "*" } else { " " };
        let _ = writeln!(
            out,
            " {marker} {} {} {}",
            fit(&choice.value, 16),
            fit(&choice.label, 24),
            choice.colors.join(" ")
        );
    }
    let _ = writeln!(out, "\nPlot templates:");
    for template in &catalog.templates {
        let _ = writeln!(out, "   {} {}", fit(&template.value, 16), template.label);
    }
    out
}

/// Image keys with their step ranges, then one line per text table.
pub fn render_logs(id: &str, logs: &ExperimentLogs) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Images for {id}:");
    match &logs.images {
        Ok(images) if images.is_empty() => {
            let _ = writeln!(out, "  (none)");
        }
        Ok(images) => {
            let mut by_key: BTreeMap<&str, (i64, i64, usize)> = BTreeMap::new();
            for image in images {
                let entry = by_key
                    .entry(image.key.as_str())
                    .or_insert((image.step, image.step, 0));
                entry.0 = entry.0.min(image.step);
                entry.1 = entry.1.max(image.step);
                entry.2 += 1;
            }
            for (key, (first, last, count)) in by_key {
                let _ = writeln!(out, "  {} {count:>5} images, steps {first}..={last}", fit(key, 24));
            }
        }
        Err(e) => {
            let _ = writeln!(out, "  error: {e}");
        }
    }

    let _ = writeln!(out, "Text for {id}:");
    match &logs.text {
        Ok(tables) if tables.is_empty() => {
            let _ = writeln!(out, "  (none)");
        }
        Ok(tables) => {
            for table in tables {
                let _ = writeln!(
                    out,
                    "  step {:>7}  {} rows  [{}]",
                    table.step,
                    table.rows.len(),
                    table.columns.join(", ")
                );
            }
        }
        Err(e) => {
            let _ = writeln!(out, "  error: {e}");
        }
    }
    out
}
