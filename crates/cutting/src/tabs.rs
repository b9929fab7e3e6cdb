//! Holding tabs and stock padding holds.
//!
//! A tab is an interval of the tool path where the cutter stays above the cut
//! floor, leaving a bridge that keeps the part attached to the sheet. Two
//! sources produce held intervals:
//!
//! - **Part tabs**: `count_per_side` tabs on every contour side long enough
//!   to carry them, distributed evenly with the tool diameter kept clear of
//!   each corner
//! - **Stock padding**: wherever a contour crosses a padding band along the
//!   sheet edge, the band is held at tab height so the frame never separates
//!
//! Intervals are measured along the tool-center path. A tab of width `w`
//! leaves `w` of material on the part edge, so its path interval is
//! `w + tool diameter` long.

use u_cutlist_core::geometry::{Point, EPS};
use u_cutlist_core::{Rect, Settings};

use crate::contour::CutContour;
use crate::result::{Tab, TabKind};

/// Z the cutter may descend to inside a held interval.
///
/// `None` when the tab height leaves nothing to hold.
pub fn tab_top_z(settings: &Settings) -> Option<f64> {
    let height = settings.tabs.height;
    if height <= EPS {
        return None;
    }
    if height >= settings.tool.cut_depth {
        log::warn!(
            "tab height {} reaches the stock top (cut depth {}); held intervals stay uncut",
            height,
            settings.tool.cut_depth
        );
        return Some(0.0);
    }
    Some(-(settings.tool.cut_depth - height))
}

/// Computes every held interval of a contour, sorted and merged.
///
/// `sheet` is the full sheet rectangle the padding bands refer to.
pub fn place_tabs(contour: &CutContour, settings: &Settings, sheet: &Rect) -> Vec<Tab> {
    let Some(top_z) = tab_top_z(settings) else {
        if settings.tabs.enabled || !settings.stock_tabs.is_empty() {
            log::warn!(
                "collapsed tabs on part '{}': height {} leaves no material",
                contour.part_id,
                settings.tabs.height
            );
        }
        return Vec::new();
    };

    let mut tabs = Vec::new();
    if settings.tabs.enabled {
        tabs.extend(part_tabs(contour, settings, top_z));
    }
    if !settings.stock_tabs.is_empty() {
        let zones = settings.stock_tabs.zones(sheet.width, sheet.height);
        let zones: Vec<Rect> = zones.iter().map(|z| z.translate(sheet.x, sheet.y)).collect();
        tabs.extend(stock_holds(contour, &zones, top_z));
    }
    merge_intervals(tabs)
}

/// Evenly spaced part tabs on every side that has room for them.
fn part_tabs(contour: &CutContour, settings: &Settings, top_z: f64) -> Vec<Tab> {
    let count = settings.tabs.count_per_side;
    let width = settings.tabs.width;
    if count == 0 || width <= EPS {
        log::warn!(
            "collapsed tabs on part '{}': width {} × {} per side",
            contour.part_id,
            width,
            count
        );
        return Vec::new();
    }

    let path_width = width + settings.tool.diameter;
    let corner_clearance = settings.tool.diameter;
    let mut tabs = Vec::new();
    let mut skipped = 0usize;

    for i in 0..contour.path.len() {
        let start = contour.cumulative[i];
        let len = contour.cumulative[i + 1] - start;
        let usable = len - 2.0 * corner_clearance;
        if usable < count as f64 * path_width {
            if len > EPS {
                skipped += 1;
            }
            continue;
        }
        let spacing = usable / count as f64;
        for k in 0..count {
            let center = start + corner_clearance + spacing * (k as f64 + 0.5);
            tabs.push(Tab {
                kind: TabKind::Part,
                start: center - path_width / 2.0,
                end: center + path_width / 2.0,
                top_z,
            });
        }
    }

    if tabs.is_empty() {
        log::warn!(
            "part '{}' #{} has no side long enough for {} tab(s) of width {}",
            contour.part_id,
            contour.instance,
            count,
            width
        );
    } else if skipped > 0 {
        log::debug!(
            "part '{}' #{}: {} side(s) too short for tabs",
            contour.part_id,
            contour.instance,
            skipped
        );
    }
    tabs
}

/// Path intervals lying inside any padding zone.
fn stock_holds(contour: &CutContour, zones: &[Rect], top_z: f64) -> Vec<Tab> {
    let n = contour.path.len();
    let mut holds = Vec::new();
    for i in 0..n {
        let a = contour.path[i];
        let b = contour.path[(i + 1) % n];
        let base = contour.cumulative[i];
        let len = contour.cumulative[i + 1] - base;
        for zone in zones {
            if let Some((t0, t1)) = clip_segment(a, b, zone) {
                if (t1 - t0) * len > EPS {
                    holds.push(Tab {
                        kind: TabKind::Stock,
                        start: base + t0 * len,
                        end: base + t1 * len,
                        top_z,
                    });
                }
            }
        }
    }
    if !holds.is_empty() {
        log::warn!(
            "part '{}' #{} crosses stock padding; {} interval(s) held",
            contour.part_id,
            contour.instance,
            holds.len()
        );
    }
    holds
}

/// Liang–Barsky clip of segment `a → b` against `rect`.
///
/// Returns the parameter range inside the rectangle.
pub fn clip_segment(a: Point, b: Point, rect: &Rect) -> Option<(f64, f64)> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    let checks = [
        (-dx, a.0 - rect.x),
        (dx, rect.right() - a.0),
        (-dy, a.1 - rect.y),
        (dy, rect.top() - a.1),
    ];
    for (p, q) in checks {
        if p.abs() < EPS {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

/// Sorts intervals and merges overlapping ones, keeping the shallower hold.
pub fn merge_intervals(mut tabs: Vec<Tab>) -> Vec<Tab> {
    tabs.sort_by(|a, b| a.start.total_cmp(&b.start));
    let mut merged: Vec<Tab> = Vec::with_capacity(tabs.len());
    for tab in tabs {
        match merged.last_mut() {
            Some(last) if tab.start <= last.end + EPS => {
                last.end = last.end.max(tab.end);
                last.top_z = last.top_z.max(tab.top_z);
            }
            _ => merged.push(tab),
        }
    }
    merged
}

/// Hold level at a path distance in `[0, perimeter)`, if any interval covers it.
pub fn hold_at(tabs: &[Tab], dist: f64) -> Option<f64> {
    tabs.iter()
        .filter(|t| dist > t.start + EPS && dist < t.end - EPS)
        .map(|t| t.top_z)
        .reduce(f64::max)
}

/// Returns true if `dist` lies within `margin` of any interval.
pub fn near_tab(tabs: &[Tab], dist: f64, margin: f64, perimeter: f64) -> bool {
    tabs.iter().any(|t| {
        [0.0, -perimeter, perimeter]
            .iter()
            .any(|shift| dist + shift > t.start - margin && dist + shift < t.end + margin)
    })
}
