//! Positional color assignment for traces.

use crate::settings::ColorPalette;
use crate::types::Trace;

/// Color for the trace at `index`: `colors[index % colors.len()]`.
pub fn color_at(colors: &[String], index: usize) -> Option<&str> {
    if colors.is_empty() {
        None
    } else {
        colors.get(index % colors.len()).map(String::as_str)
    }
}

/// Assign palette colors to traces by their position in the list.
///
/// With no palette (e.g. the catalog has not loaded, or the configured
/// identifier is unknown) traces keep whatever color they already carry.
pub fn assign_colors(traces: Vec<Trace>, palette: Option<&ColorPalette>) -> Vec<Trace> {
    let Some(palette) = palette else {
        return traces;
    };
    if palette.colors.is_empty() {
        return traces;
    }

    traces
        .into_iter()
        .enumerate()
        .map(|(i, mut trace)| {
            if let Some(color) = color_at(&palette.colors, i) {
                trace.line.get_or_insert_with(Default::default).color = Some(color.to_string());
            }
            trace
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineStyle;

    fn traces(n: usize) -> Vec<Trace> {
        (0..n)
            .map(|i| Trace::new(format!("t{i}"), vec![0.0], vec![Some(1.0)]))
            .collect()
    }

    #[test]
    fn test_colors_cycle_by_position() {
        let palette = ColorPalette::new("p", "P", &["red", "green", "blue"]);
        let out = assign_colors(traces(7), Some(&palette));
        let colors: Vec<&str> = out.iter().map(|t| t.color().unwrap()).collect();
        assert_eq!(
            colors,
            vec!["red", "green", "blue", "red", "green", "blue", "red"]
        );
    }

    #[test]
    fn test_missing_palette_keeps_existing_colors() {
        let mut input = traces(2);
        input[0].line = Some(LineStyle {
            color: Some("#123456".into()),
            ..Default::default()
        });
        let out = assign_colors(input.clone(), None);
        assert_eq!(out, input);
    }

    #[test]
    fn test_overrides_backend_color_and_keeps_width() {
        let mut input = traces(1);
        input[0].line = Some(LineStyle {
            color: Some("#123456".into()),
            width: Some(3.0),
            ..Default::default()
        });
        let palette = ColorPalette::fallback();
        let out = assign_colors(input, Some(&palette));
        assert_eq!(out[0].color(), Some("#636EFA"));
        assert_eq!(out[0].width(), Some(3.0));
    }

    #[test]
    fn test_deterministic() {
        let palette = ColorPalette::fallback();
        let a = assign_colors(traces(12), Some(&palette));
        let b = assign_colors(traces(12), Some(&palette));
        assert_eq!(a, b);
    }

    #[test]
    fn test_color_at_empty() {
        assert_eq!(color_at(&[], 3), None);
    }
}
