//! Cut ordering and entry-point selection.
//!
//! Each contour offers a few candidate entry points, evenly spaced along its
//! path and shifted clear of corners and held intervals. The order is then
//! one of:
//!
//! 1. **Structural**: contours nearest the sheet edges or a clamp zone first,
//!    so the interior keeps its support the longest
//! 2. **Nearest neighbor + 2-opt**: greedy construction from the home
//!    position, improved by segment reversal on total rapid distance
//! 3. **Placement order** when optimization is switched off
//!
//! In every mode a contour is entered at the candidate nearest the tool.
//!
//! Candidates whose lead arcs or helix would reach a neighbouring part are
//! dropped first; when none survive, the leads shrink and finally go away.

use u_cutlist_core::geometry::{point_distance, Point, EPS};
use u_cutlist_core::{LeadSettings, PlungeStrategy, Rect, Settings};

use crate::contour::CutContour;
use crate::leadin::arc_leads;
use crate::result::Tab;
use crate::tabs::near_tab;

/// Upper bound on full 2-opt sweeps.
const MAX_2OPT_ROUNDS: usize = 20;

/// Shift attempts per direction when a candidate hits a corner or tab.
const MAX_SHIFTS: usize = 10;

/// Lead radius halvings tried before entering without leads.
const LEAD_SHRINKS: usize = 2;

/// A contour with its chosen entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencedCut {
    /// Index into the contour list.
    pub contour: usize,
    /// Entry distance along the contour path.
    pub entry: f64,
    /// Entry point.
    pub point: Point,
}

/// Result of sequencing.
#[derive(Debug, Clone, Default)]
pub struct SequenceResult {
    /// Cuts in machining order.
    pub cuts: Vec<SequencedCut>,
    /// Sum of straight-line hops between entries, starting at home.
    pub total_rapid_distance: f64,
}

/// Clearance kept between an entry and corners or held intervals.
pub fn entry_clearance(settings: &Settings) -> f64 {
    settings.tool.diameter.max(settings.lead.radius)
}

/// Candidate entry distances on a contour.
///
/// `count` candidates are spread evenly; each one is shifted in steps of half
/// the clearance until it is clear. When no spot qualifies, the middle of the
/// longest side is used.
pub fn entry_candidates(contour: &CutContour, tabs: &[Tab], count: usize, clearance: f64) -> Vec<f64> {
    let perimeter = contour.perimeter();
    let count = count.max(1);
    let spacing = perimeter / count as f64;
    let step = (clearance / 2.0).max(EPS);

    let mut candidates: Vec<f64> = Vec::with_capacity(count);
    for k in 0..count {
        let target = (k as f64 + 0.5) * spacing;
        let found = (0..=MAX_SHIFTS).find_map(|i| {
            let offset = i as f64 * step;
            [target + offset, target - offset]
                .into_iter()
                .map(|d| contour.wrap(d))
                .find(|&d| is_clear(contour, tabs, d, clearance))
        });
        if let Some(d) = found {
            if candidates.iter().all(|c| (c - d).abs() > EPS) {
                candidates.push(d);
            }
        }
    }

    if candidates.is_empty() {
        candidates.push(longest_side_middle(contour));
    }
    candidates
}

/// Returns true if `dist` keeps `clearance` from every vertex and interval.
fn is_clear(contour: &CutContour, tabs: &[Tab], dist: f64, clearance: f64) -> bool {
    let perimeter = contour.perimeter();
    let off_corners = contour
        .cumulative
        .iter()
        .all(|&v| (dist - v).abs() >= clearance);
    off_corners && !near_tab(tabs, dist, clearance, perimeter)
}

fn longest_side_middle(contour: &CutContour) -> f64 {
    let (i, len) = contour
        .cumulative
        .windows(2)
        .map(|w| w[1] - w[0])
        .enumerate()
        .fold((0, 0.0), |best, (i, len)| if len > best.1 { (i, len) } else { best });
    contour.cumulative[i] + len / 2.0
}

/// Lead arcs and plunge used to enter one contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryStyle {
    /// Lead arcs (radius 0 for none).
    pub lead: LeadSettings,
    /// Descent strategy.
    pub plunge: PlungeStrategy,
}

impl EntryStyle {
    /// The configured leads and plunge.
    pub fn configured(settings: &Settings) -> Self {
        Self {
            lead: settings.lead,
            plunge: settings.plunge.strategy,
        }
    }
}

/// Footprints of the parts other than `index` that an entry could reach.
pub fn neighbour_footprints(contours: &[CutContour], index: usize, settings: &Settings) -> Vec<Rect> {
    let reach = settings.lead.radius.max(0.0) * 2.0
        + settings.plunge.helix_diameter.max(0.0)
        + settings.tool.diameter;
    let own = &contours[index].bbox;
    contours
        .iter()
        .enumerate()
        .filter(|&(j, c)| j != index && own.distance_to_rect(&c.bbox) <= reach)
        .map(|(_, c)| c.bbox)
        .collect()
}

/// Filters `candidates` down to entries that keep the cutter off `obstacles`.
///
/// The configured style is tried first, then the lead radius is halved
/// [`LEAD_SHRINKS`] times, then leads are dropped; a helix that still
/// reaches an obstacle becomes a straight plunge. When no style fits, every
/// candidate is returned with a straight plunge and no leads.
pub fn clear_entries(
    contour: &CutContour,
    candidates: &[f64],
    obstacles: &[Rect],
    settings: &Settings,
) -> (Vec<f64>, EntryStyle) {
    let configured = EntryStyle::configured(settings);
    if obstacles.is_empty() {
        return (candidates.to_vec(), configured);
    }

    let mut styles = Vec::new();
    let mut radius = configured.lead.radius;
    for _ in 0..=LEAD_SHRINKS {
        styles.push(EntryStyle {
            lead: LeadSettings { radius, ..configured.lead },
            ..configured
        });
        radius /= 2.0;
    }
    let unled = LeadSettings {
        radius: 0.0,
        ..configured.lead
    };
    styles.push(EntryStyle {
        lead: unled,
        ..configured
    });
    if configured.plunge == PlungeStrategy::Helix {
        styles.push(EntryStyle {
            lead: unled,
            plunge: PlungeStrategy::Straight,
        });
    }
    styles.dedup();

    for (k, style) in styles.iter().enumerate() {
        let clear: Vec<f64> = candidates
            .iter()
            .copied()
            .filter(|&d| entry_fits(contour, d, style, obstacles, settings))
            .collect();
        if !clear.is_empty() {
            if k > 0 {
                log::debug!(
                    "part '{}' #{}: entering with lead radius {:.2} ({:?}) to clear its neighbours",
                    contour.part_id,
                    contour.instance + 1,
                    style.lead.radius,
                    style.plunge
                );
            }
            return (clear, *style);
        }
    }

    log::warn!(
        "part '{}' #{}: no entry clears the neighbouring parts",
        contour.part_id,
        contour.instance + 1
    );
    (
        candidates.to_vec(),
        EntryStyle {
            lead: unled,
            plunge: PlungeStrategy::Straight,
        },
    )
}

/// Returns true if entering at `dist` with `style` keeps the tool edge out
/// of every obstacle.
fn entry_fits(
    contour: &CutContour,
    dist: f64,
    style: &EntryStyle,
    obstacles: &[Rect],
    settings: &Settings,
) -> bool {
    let tool_radius = settings.tool.radius() - 1e-6;
    let (point, edge) = contour.point_at(dist);
    let normal = contour.waste_normal(edge);
    let leads = arc_leads(point, contour.edge_direction(edge), normal, &style.lead);
    let clear = |p: Point, reach: f64| obstacles.iter().all(|r| r.distance_to_point(p) >= reach);

    let leads_clear = leads
        .lead_in
        .iter()
        .chain(&leads.lead_out)
        .all(|&p| clear(p, tool_radius));
    if !leads_clear {
        return false;
    }
    if style.plunge == PlungeStrategy::Helix {
        let r = settings.plunge.helix_diameter / 2.0;
        let start = leads.start();
        let center = (start.0 + normal.0 * r, start.1 + normal.1 * r);
        return clear(center, r + tool_radius);
    }
    true
}

/// Candidate nearest to `from`.
fn nearest_entry(contour: &CutContour, candidates: &[f64], from: Point) -> SequencedCut {
    candidates
        .iter()
        .map(|&d| (d, contour.point_at(d).0))
        .min_by(|a, b| point_distance(from, a.1).total_cmp(&point_distance(from, b.1)))
        .map(|(entry, point)| SequencedCut {
            contour: contour.id,
            entry,
            point,
        })
        .unwrap_or(SequencedCut {
            contour: contour.id,
            entry: 0.0,
            point: contour.path[0],
        })
}

/// Orders contours and chooses their entries.
///
/// `candidates[i]` lists the entry distances of `contours[i]`; `sheet` is
/// the full sheet rectangle. The returned `contour` fields index into
/// `contours`.
pub fn order_cuts(
    contours: &[CutContour],
    candidates: &[Vec<f64>],
    settings: &Settings,
    sheet: &Rect,
    home: Point,
) -> SequenceResult {
    if contours.is_empty() {
        return SequenceResult::default();
    }

    let mut order: Vec<usize> = (0..contours.len()).collect();
    let ordering = &settings.ordering;
    if ordering.structural_order {
        let keys: Vec<f64> = contours
            .iter()
            .map(|c| anchor_distance(&c.bbox, sheet, settings))
            .collect();
        order.sort_by(|&a, &b| {
            keys[a]
                .total_cmp(&keys[b])
                .then(contours[a].bbox.y.total_cmp(&contours[b].bbox.y))
                .then(contours[a].bbox.x.total_cmp(&contours[b].bbox.x))
                .then(a.cmp(&b))
        });
    } else if ordering.optimize_order {
        let mut improved = nearest_neighbor(contours, candidates, home);
        improve_2opt(&mut improved, contours, candidates, home);
        let cost = |o: &[usize]| resolve_entries(o, contours, candidates, home).total_rapid_distance;
        if cost(&improved) < cost(&order) {
            order = improved;
        }
    }

    let result = resolve_entries(&order, contours, candidates, home);
    log::debug!(
        "sequenced {} contours, rapid distance {:.1}",
        result.cuts.len(),
        result.total_rapid_distance
    );
    result
}

/// Distance from a part to the nearest sheet edge or clamp zone.
pub fn anchor_distance(bbox: &Rect, sheet: &Rect, settings: &Settings) -> f64 {
    let edge = (bbox.x - sheet.x)
        .min(bbox.y - sheet.y)
        .min(sheet.right() - bbox.right())
        .min(sheet.top() - bbox.top())
        .max(0.0);
    settings
        .clamp_zones
        .iter()
        .map(|z| bbox.distance_to_rect(&z.rect))
        .fold(edge, f64::min)
}

fn nearest_neighbor(contours: &[CutContour], candidates: &[Vec<f64>], home: Point) -> Vec<usize> {
    let n = contours.len();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut pos = home;

    for _ in 0..n {
        let mut best: Option<(usize, SequencedCut, f64)> = None;
        for i in (0..n).filter(|&i| !visited[i]) {
            let cut = nearest_entry(&contours[i], &candidates[i], pos);
            let dist = point_distance(pos, cut.point);
            if best.map_or(true, |(_, _, d)| dist < d - EPS) {
                best = Some((i, cut, dist));
            }
        }
        if let Some((i, cut, _)) = best {
            visited[i] = true;
            order.push(i);
            pos = cut.point;
        }
    }
    order
}

fn improve_2opt(order: &mut [usize], contours: &[CutContour], candidates: &[Vec<f64>], home: Point) {
    let n = order.len();
    if n < 3 {
        return;
    }
    let mut current = resolve_entries(order, contours, candidates, home).total_rapid_distance;
    let mut improved = true;
    let mut rounds = 0;

    while improved && rounds < MAX_2OPT_ROUNDS {
        improved = false;
        rounds += 1;
        for i in 0..n - 1 {
            for j in (i + 1)..n {
                order[i..=j].reverse();
                let candidate = resolve_entries(order, contours, candidates, home).total_rapid_distance;
                if candidate < current - 1e-9 {
                    current = candidate;
                    improved = true;
                } else {
                    order[i..=j].reverse();
                }
            }
        }
    }
}

/// Picks entries along a fixed order and sums the rapid hops.
fn resolve_entries(order: &[usize], contours: &[CutContour], candidates: &[Vec<f64>], home: Point) -> SequenceResult {
    let mut pos = home;
    let mut total = 0.0;
    let cuts = order
        .iter()
        .map(|&i| {
            let mut cut = nearest_entry(&contours[i], &candidates[i], pos);
            cut.contour = i;
            total += point_distance(pos, cut.point);
            pos = cut.point;
            cut
        })
        .collect();
    SequenceResult {
        cuts,
        total_rapid_distance: total,
    }
}
