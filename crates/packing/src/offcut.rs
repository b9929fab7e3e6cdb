//! Remnant detection on finished layouts.
//!
//! Free space on a sheet is the usable rectangle minus every placed part's
//! box grown by one kerf. The scan compresses that region onto a grid built
//! from the obstacle edges and enumerates the maximal free rectangles on it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use u_cutlist_core::geometry::EPS;
use u_cutlist_core::{OptimizationResult, Rect, SheetLayout};

/// A usable rectangular remnant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Offcut {
    /// Index of the sheet in the result.
    pub sheet_index: usize,
    /// Display label of the sheet.
    pub sheet_label: String,
    /// Remnant rectangle in sheet coordinates.
    pub rect: Rect,
    /// Sheet price share proportional to area.
    pub price: f64,
}

impl Offcut {
    /// Remnant width.
    pub fn width(&self) -> f64 {
        self.rect.width
    }

    /// Remnant height.
    pub fn height(&self) -> f64 {
        self.rect.height
    }

    /// Remnant area.
    pub fn area(&self) -> f64 {
        self.rect.area()
    }
}

/// Size thresholds for remnants worth keeping.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OffcutConfig {
    /// Minimum short side.
    pub min_width: f64,
    /// Minimum long side.
    pub min_height: f64,
    /// Minimum area.
    pub min_area: f64,
    /// Report a pairwise disjoint selection instead of every maximal rectangle.
    pub exclusive: bool,
}

impl Default for OffcutConfig {
    fn default() -> Self {
        Self {
            min_width: 100.0,
            min_height: 100.0,
            min_area: 0.0,
            exclusive: false,
        }
    }
}

impl OffcutConfig {
    /// Creates the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum dimensions (orientation-free).
    pub fn with_min_size(mut self, width: f64, height: f64) -> Self {
        self.min_width = width.min(height);
        self.min_height = width.max(height);
        self
    }

    /// Sets the minimum area.
    pub fn with_min_area(mut self, area: f64) -> Self {
        self.min_area = area;
        self
    }

    /// Requests disjoint remnants.
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    fn accepts(&self, rect: &Rect) -> bool {
        let short = rect.width.min(rect.height);
        let long = rect.width.max(rect.height);
        let min_short = self.min_width.min(self.min_height);
        let min_long = self.min_width.max(self.min_height);
        short + EPS >= min_short && long + EPS >= min_long && rect.area() + EPS >= self.min_area
    }
}

/// Detects remnants on every sheet with the default thresholds.
pub fn detect_offcuts(result: &OptimizationResult, kerf: f64) -> Vec<Offcut> {
    detect_offcuts_with(result, kerf, &OffcutConfig::default())
}

/// Detects remnants on every sheet with explicit thresholds.
pub fn detect_offcuts_with(
    result: &OptimizationResult,
    kerf: f64,
    config: &OffcutConfig,
) -> Vec<Offcut> {
    let offcuts: Vec<Offcut> = result
        .sheets
        .iter()
        .enumerate()
        .flat_map(|(i, sheet)| sheet_offcuts(sheet, i, kerf, config))
        .collect();
    log::debug!(
        "offcuts: {} remnant(s) over {} sheet(s)",
        offcuts.len(),
        result.sheets.len()
    );
    offcuts
}

/// Detects remnants on one sheet.
pub fn sheet_offcuts(
    sheet: &SheetLayout,
    sheet_index: usize,
    kerf: f64,
    config: &OffcutConfig,
) -> Vec<Offcut> {
    let rects = free_rectangles(sheet, kerf.max(0.0));
    let mut kept: Vec<Rect> = rects.into_iter().filter(|r| config.accepts(r)).collect();
    kept.sort_by(|a, b| {
        b.area()
            .total_cmp(&a.area())
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });
    let kept = remove_contained(kept);
    let kept = if config.exclusive {
        disjoint_selection(kept)
    } else {
        kept
    };

    let sheet_area = sheet.sheet_area();
    kept.into_iter()
        .map(|rect| Offcut {
            sheet_index,
            sheet_label: sheet.stock_label.clone(),
            price: if sheet_area > 0.0 {
                sheet.price * rect.area() / sheet_area
            } else {
                0.0
            },
            rect,
        })
        .collect()
}

/// Maximal free rectangles of a sheet.
fn free_rectangles(sheet: &SheetLayout, kerf: f64) -> Vec<Rect> {
    let usable = sheet.usable;
    if usable.is_empty() {
        return Vec::new();
    }
    let obstacles: Vec<Rect> = sheet
        .placements
        .iter()
        .filter_map(|p| p.bbox().inflate(kerf).intersection(&usable))
        .collect();

    let xs = axis_breaks(usable.x, usable.right(), obstacles.iter().flat_map(|o| [o.x, o.right()]));
    let ys = axis_breaks(usable.y, usable.top(), obstacles.iter().flat_map(|o| [o.y, o.top()]));
    let (nx, ny) = (xs.len() - 1, ys.len() - 1);

    // run[j][i]: free cells to the right of (i, j) inclusive
    let mut run = vec![vec![0usize; nx + 1]; ny];
    for j in 0..ny {
        let cy = (ys[j] + ys[j + 1]) * 0.5;
        for i in (0..nx).rev() {
            let cx = (xs[i] + xs[i + 1]) * 0.5;
            let blocked = obstacles.iter().any(|o| o.contains_point((cx, cy)));
            run[j][i] = if blocked { 0 } else { run[j][i + 1] + 1 };
        }
    }
    let free = |i: usize, j: usize| run[j][i] > 0;

    let mut found = Vec::new();
    for j0 in 0..ny {
        for i0 in 0..nx {
            if !free(i0, j0) {
                continue;
            }
            let mut width = usize::MAX;
            for j1 in j0..ny {
                width = width.min(run[j1][i0]);
                if width == 0 {
                    break;
                }
                // top is maximal when the next row cannot carry this width
                let next = if j1 + 1 < ny { run[j1 + 1][i0] } else { 0 };
                if next >= width {
                    continue;
                }
                let left_blocked = i0 == 0 || (j0..=j1).any(|j| !free(i0 - 1, j));
                let below_blocked = j0 == 0 || (i0..i0 + width).any(|i| !free(i, j0 - 1));
                if left_blocked && below_blocked {
                    found.push(Rect::from_corners(
                        (xs[i0], ys[j0]),
                        (xs[i0 + width], ys[j1 + 1]),
                    ));
                }
            }
        }
    }
    found
}

fn axis_breaks(lo: f64, hi: f64, edges: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut breaks: Vec<f64> = std::iter::once(lo)
        .chain(std::iter::once(hi))
        .chain(edges.map(|e| e.clamp(lo, hi)))
        .collect();
    breaks.sort_by(f64::total_cmp);
    breaks.dedup_by(|a, b| (*a - *b).abs() < EPS);
    breaks
}

/// Drops rectangles contained in an earlier (larger) one. Input is sorted by area.
fn remove_contained(rects: Vec<Rect>) -> Vec<Rect> {
    let mut kept: Vec<Rect> = Vec::with_capacity(rects.len());
    for r in rects {
        if !kept.iter().any(|k| k.contains_rect(&r, EPS)) {
            kept.push(r);
        }
    }
    kept
}

/// Greedy largest-first selection of pairwise disjoint rectangles.
fn disjoint_selection(rects: Vec<Rect>) -> Vec<Rect> {
    let mut kept: Vec<Rect> = Vec::new();
    for r in rects {
        if !kept.iter().any(|k| k.overlaps(&r)) {
            kept.push(r);
        }
    }
    kept
}
