//! Grid placement of metric panels.
//!
//! Panels live on a 12-unit wide grid. The default arrangement fills rows of
//! `columns` equal-width panels in metric order. Manual moves and resizes are
//! kept until the set of displayed metrics changes, at which point the
//! default arrangement is recomputed.

use crate::error::LayoutError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Width of the grid in units.
pub const GRID_COLUMNS: u32 = 12;
/// Default panel height in rows.
pub const PANEL_HEIGHT: u32 = 6;
/// Smallest height a panel may be resized to.
pub const MIN_PANEL_HEIGHT: u32 = 5;
/// Largest height a panel may be resized to.
pub const MAX_PANEL_HEIGHT: u32 = 48;
/// Largest supported panels-per-row setting.
pub const MAX_COLUMNS: u32 = 4;

/// Position and size of one panel in grid units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRect {
    pub metric: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub min_h: u32,
    pub min_w: u32,
    pub max_w: u32,
}

impl PanelRect {
    fn overlaps_columns(&self, other: &PanelRect) -> bool {
        self.x < other.x.saturating_add(other.w) && other.x < self.x.saturating_add(self.w)
    }

    fn overlaps(&self, other: &PanelRect) -> bool {
        self.overlaps_columns(other) && self.y < other.bottom() && other.y < self.bottom()
    }

    /// First row below the panel.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
}

/// Width of one panel for `columns` panels per row.
pub fn column_width(columns: u32) -> Result<u32, LayoutError> {
    if !(1..=MAX_COLUMNS).contains(&columns) {
        return Err(LayoutError::InvalidColumns { columns });
    }
    Ok(GRID_COLUMNS / columns)
}

/// Default row-major arrangement of `metrics`.
pub fn default_layout(metrics: &[String], columns: u32) -> Result<Vec<PanelRect>, LayoutError> {
    let width = column_width(columns)?;
    Ok(metrics
        .iter()
        .enumerate()
        .map(|(i, metric)| {
            let i = i as u32;
            PanelRect {
                metric: metric.clone(),
                x: (i % columns) * width,
                y: (i / columns) * PANEL_HEIGHT,
                w: width,
                h: PANEL_HEIGHT,
                min_h: MIN_PANEL_HEIGHT,
                min_w: width,
                max_w: width,
            }
        })
        .collect())
}

/// Keeps panel placement in step with the displayed metrics.
#[derive(Debug, Clone)]
pub struct LayoutAllocator {
    columns: u32,
    metrics: Vec<String>,
    panels: Vec<PanelRect>,
    customized: bool,
}

impl LayoutAllocator {
    pub fn new(columns: u32) -> Result<Self, LayoutError> {
        column_width(columns)?;
        Ok(Self {
            columns,
            metrics: Vec::new(),
            panels: Vec::new(),
            customized: false,
        })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Panels in metric order.
    pub fn panels(&self) -> &[PanelRect] {
        &self.panels
    }

    pub fn panel(&self, metric: &str) -> Option<&PanelRect> {
        self.panels.iter().find(|p| p.metric == metric)
    }

    /// Whether manual edits have been applied since the last recompute.
    pub fn is_customized(&self) -> bool {
        self.customized
    }

    /// Number of grid rows occupied.
    pub fn total_rows(&self) -> u32 {
        self.panels.iter().map(PanelRect::bottom).max().unwrap_or(0)
    }

    /// Align the layout with `metrics` laid out `columns` per row.
    ///
    /// Returns `true` if the layout was recomputed, discarding manual edits.
    pub fn sync(&mut self, metrics: &[String], columns: u32) -> Result<bool, LayoutError> {
        column_width(columns)?;
        if self.metrics == metrics && self.columns == columns {
            return Ok(false);
        }
        self.metrics = metrics.to_vec();
        self.columns = columns;
        self.recompute();
        Ok(true)
    }

    /// Change panels per row, keeping the current metrics.
    pub fn set_columns(&mut self, columns: u32) -> Result<bool, LayoutError> {
        column_width(columns)?;
        if columns == self.columns {
            return Ok(false);
        }
        self.columns = columns;
        self.recompute();
        Ok(true)
    }

    /// Move a panel to `(x, y)`.
    ///
    /// `x` is clamped so the panel stays on the grid and `y` to the first row
    /// below all panels. Moves that would overlap another panel are rejected.
    /// Afterwards panels float up to fill gaps.
    pub fn move_panel(&mut self, metric: &str, x: u32, y: u32) -> Result<(), LayoutError> {
        let idx = self.index_of(metric)?;
        let mut candidate = self.panels[idx].clone();
        candidate.x = x.min(GRID_COLUMNS - candidate.w);
        candidate.y = y.min(self.total_rows());
        self.place(idx, candidate)
    }

    /// Resize a panel. Width is clamped to the panel's bounds and height to
    /// `min_h..=`[`MAX_PANEL_HEIGHT`]; overlapping results are rejected.
    pub fn resize_panel(&mut self, metric: &str, w: u32, h: u32) -> Result<(), LayoutError> {
        let idx = self.index_of(metric)?;
        let mut candidate = self.panels[idx].clone();
        candidate.w = w.clamp(candidate.min_w, candidate.max_w);
        candidate.h = h.clamp(candidate.min_h, MAX_PANEL_HEIGHT.max(candidate.min_h));
        candidate.x = candidate.x.min(GRID_COLUMNS - candidate.w);
        self.place(idx, candidate)
    }

    fn index_of(&self, metric: &str) -> Result<usize, LayoutError> {
        self.panels
            .iter()
            .position(|p| p.metric == metric)
            .ok_or_else(|| LayoutError::UnknownPanel {
                metric: metric.to_string(),
            })
    }

    fn place(&mut self, idx: usize, candidate: PanelRect) -> Result<(), LayoutError> {
        if let Some(other) = self
            .panels
            .iter()
            .enumerate()
            .find(|(i, p)| *i != idx && p.overlaps(&candidate))
            .map(|(_, p)| p.metric.clone())
        {
            return Err(LayoutError::Collision {
                metric: candidate.metric,
                other,
            });
        }
        self.panels[idx] = candidate;
        self.compact();
        self.customized = true;
        Ok(())
    }

    /// Float every panel up as far as it goes without overlapping, top rows first.
    fn compact(&mut self) {
        let mut order: Vec<usize> = (0..self.panels.len()).collect();
        order.sort_by_key(|&i| (self.panels[i].y, self.panels[i].x));

        // Panels already placed in the same columns sit entirely above `i`,
        // so `i` rises until it rests on the lowest of them.
        let mut placed: Vec<usize> = Vec::with_capacity(order.len());
        for i in order {
            let floor = placed
                .iter()
                .map(|&j| &self.panels[j])
                .filter(|p| p.overlaps_columns(&self.panels[i]))
                .map(PanelRect::bottom)
                .max()
                .unwrap_or(0);
            self.panels[i].y = self.panels[i].y.min(floor);
            placed.push(i);
        }
    }

    fn recompute(&mut self) {
        // `columns` is validated on every path that sets it.
        self.panels = default_layout(&self.metrics, self.columns).unwrap_or_default();
        self.customized = false;
        debug!(
            panels = self.panels.len(),
            columns = self.columns,
            "Recomputed panel layout"
        );
    }
}
