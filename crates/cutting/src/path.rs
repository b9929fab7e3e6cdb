//! Toolpath assembly and public API.
//!
//! Turns a sheet layout into machine motions:
//! 1. Extract tool-center contours (outward tool-radius offset)
//! 2. Place tabs and stock padding holds
//! 3. Choose entry candidates clear of neighbouring parts, then the cut order
//! 4. For every contour and depth pass: plunge, lead in, follow the contour
//!    (lifting over holds, relieving interior corners), then either return
//!    along the lead-in for the next pass or lead out and retract
//! 5. Append onion-skin cleanup cuts
//! 6. Check the dust shoe against clamp zones and total up the motions

use std::time::Instant;

use u_cutlist_core::geometry::{lerp, point_distance, Point, EPS};
use u_cutlist_core::{OptimizationResult, Part, PlungeStrategy, Rect, Result, Settings, SheetLayout};

use crate::collision::check_collisions;
use crate::contour::{extract_contours, CutContour};
use crate::corner::{corner_reliefs, Relief};
use crate::leadin::arc_leads;
use crate::plunge::{helix, ramp, straight, Descent};
use crate::result::{CutKind, CutStats, Move, MoveKind, PlannedCut, PlannedSheet, Tab};
use crate::sequence::{
    clear_entries, entry_candidates, entry_clearance, neighbour_footprints, order_cuts, EntryStyle,
};
use crate::tabs::{hold_at, place_tabs};

/// A point on a polyline with its running parameter (arc length).
type Station = (Point, f64);

/// Plans a sheet, cutting every placement along its footprint.
///
/// Invalid tool settings yield a sheet without cuts (and a warning); use
/// [`plan_all`] to have them rejected instead.
pub fn plan_toolpaths(sheet: &SheetLayout, settings: &Settings) -> PlannedSheet {
    plan_sheet(sheet, &[], settings)
}

/// Plans a sheet; `parts` supplies outlines for non-rectangular parts.
pub fn plan_sheet(sheet: &SheetLayout, parts: &[Part], settings: &Settings) -> PlannedSheet {
    let start = Instant::now();
    let tool = settings.tool;
    let mut planned = PlannedSheet {
        sheet_index: sheet.placements.first().map(|p| p.sheet_index).unwrap_or(0),
        stock_id: sheet.stock_id.clone(),
        stock_label: sheet.stock_label.clone(),
        width: sheet.width,
        height: sheet.height,
        tool,
        cuts: Vec::new(),
        collision: Default::default(),
        stats: CutStats::default(),
    };
    if let Err(e) = settings.validate_tooling() {
        log::warn!("sheet '{}' not planned: {}", sheet.stock_label, e);
        return planned;
    }
    if let Err(e) = settings.validate_clearance() {
        log::warn!("sheet '{}': {}", sheet.stock_label, e);
    }

    let radius = tool.radius();
    let contours = extract_contours(sheet, parts, radius);
    let sheet_rect = Rect::new(0.0, 0.0, sheet.width, sheet.height);
    let tabs: Vec<Vec<Tab>> = contours
        .iter()
        .map(|c| place_tabs(c, settings, &sheet_rect))
        .collect();
    let clearance = entry_clearance(settings);
    let (candidates, styles): (Vec<Vec<f64>>, Vec<EntryStyle>) = contours
        .iter()
        .zip(&tabs)
        .enumerate()
        .map(|(i, (c, t))| {
            let spread = entry_candidates(c, t, settings.ordering.nesting_rotations, clearance);
            clear_entries(c, &spread, &neighbour_footprints(&contours, i, settings), settings)
        })
        .unzip();
    let sequence = order_cuts(&contours, &candidates, settings, &sheet_rect, (0.0, 0.0));
    let reliefs: Vec<Vec<Relief>> = contours
        .iter()
        .map(|c| corner_reliefs(c, settings.corner_overcut, radius))
        .collect();

    let depth = tool.cut_depth;
    let skin = if settings.onion_skin.enabled {
        settings.onion_skin.thickness.clamp(0.0, depth)
    } else {
        0.0
    };
    let depths = pass_depths(depth - skin, tool.pass_count(depth - skin));

    for seq in &sequence.cuts {
        let i = seq.contour;
        let plan = CutPlan {
            contour: &contours[i],
            tabs: &tabs[i],
            reliefs: &reliefs[i],
            style: styles[i],
            settings,
        };
        planned
            .cuts
            .push(plan.build(CutKind::Profile, seq.entry, 0.0, &depths));
    }

    if skin > EPS && settings.onion_skin.cleanup_pass {
        for seq in &sequence.cuts {
            let i = seq.contour;
            let plan = CutPlan {
                contour: &contours[i],
                tabs: &tabs[i],
                reliefs: &reliefs[i],
                style: styles[i],
                settings,
            };
            planned
                .cuts
                .push(plan.build(CutKind::Cleanup, seq.entry, -(depth - skin), &[-depth]));
        }
    }

    let home = planned.home();
    planned.collision = check_collisions(&planned.cuts, &settings.clamp_zones, &settings.dust_shoe, home);
    planned.stats = CutStats::from_moves(planned.moves(), home, &tool);

    log::info!(
        "planned sheet '{}': {} cuts, feed {:.0}, rapid {:.0}, {} plunges, ~{:.0}s ({:.1}ms)",
        planned.stock_label,
        planned.cuts.len(),
        planned.stats.feed_length,
        planned.stats.rapid_length,
        planned.stats.plunge_count,
        planned.stats.estimated_seconds,
        start.elapsed().as_secs_f64() * 1000.0
    );
    planned
}

/// Plans every sheet of an optimization result.
///
/// # Errors
///
/// Returns `InvalidInput` when the tool settings cannot produce a toolpath
/// or the kerf left between parts is narrower than the tool.
pub fn plan_all(result: &OptimizationResult, parts: &[Part], settings: &Settings) -> Result<Vec<PlannedSheet>> {
    settings.validate_tooling()?;
    settings.validate_clearance()?;
    Ok(result
        .sheets
        .iter()
        .enumerate()
        .map(|(i, sheet)| {
            let mut planned = plan_sheet(sheet, parts, settings);
            planned.sheet_index = i;
            planned
        })
        .collect())
}

/// Z of each of `count` equal passes down to `depth`.
pub fn pass_depths(depth: f64, count: usize) -> Vec<f64> {
    let count = count.max(1);
    (1..=count).map(|k| -depth * k as f64 / count as f64).collect()
}

/// Everything needed to cut one contour.
struct CutPlan<'a> {
    contour: &'a CutContour,
    tabs: &'a [Tab],
    reliefs: &'a [Relief],
    style: EntryStyle,
    settings: &'a Settings,
}

impl<'a> CutPlan<'a> {
    /// Builds the moves of one cut entered at `entry`, starting its first
    /// pass from `start_z` and descending through `depths`.
    fn build(&self, kind: CutKind, entry: f64, start_z: f64, depths: &[f64]) -> PlannedCut {
        let contour = self.contour;
        let settings = self.settings;
        let tool = &settings.tool;
        let perimeter = contour.perimeter();

        let (entry_point, edge) = contour.point_at(entry);
        let tangent = contour.edge_direction(edge);
        let normal = contour.waste_normal(edge);
        let leads = arc_leads(entry_point, tangent, normal, &self.style.lead);
        let lead_start = leads.start();
        let lead_in = stations(&leads.lead_in);
        let lead_len = lead_in.last().map(|s| s.1).unwrap_or(0.0);

        let mut out = MoveWriter::new((lead_start, tool.safe_z));
        out.push(MoveKind::Rapid, lead_start, tool.safe_z);

        let strategy = self.style.plunge;
        let mut z_prev = start_z;
        for (k, &z) in depths.iter().enumerate() {
            if k == 0 && strategy != PlungeStrategy::Straight {
                out.push(MoveKind::Plunge, lead_start, start_z);
            }
            let descent = match strategy {
                PlungeStrategy::Straight => {
                    out.extend(straight(lead_start, z));
                    Descent::level(z)
                }
                PlungeStrategy::Helix => {
                    out.extend(helix(lead_start, normal, z_prev, z, &settings.plunge));
                    Descent::level(z)
                }
                PlungeStrategy::Ramp => ramp(z_prev, z, &settings.plunge, lead_len + perimeter),
            };
            let overlap = (descent.run - lead_len).max(0.0);

            // lead-in, full loop and ramp overlap on one arc-length parameter
            let mut path = lead_in.clone();
            path.extend(
                contour
                    .walk(entry, entry + perimeter + overlap)
                    .into_iter()
                    .map(|(p, d)| (p, lead_len + d - entry)),
            );
            if descent.run > EPS {
                split_at(&mut path, descent.run);
            }
            for cut in self.hold_boundaries(entry, entry + perimeter + overlap) {
                split_at(&mut path, lead_len + cut - entry);
            }
            let on_contour = |s: f64| (s > lead_len + EPS).then(|| entry + s - lead_len);
            out.follow(
                &path,
                |s| descent.z_at(s),
                |s| on_contour(s).and_then(|d| hold_at(self.tabs, contour.wrap(d))),
                |s| {
                    let d = on_contour(s)?;
                    if s + EPS < descent.run || hold_at(self.tabs, contour.wrap(d)).is_some() {
                        return None;
                    }
                    self.relief_at(d)
                },
            );

            if overlap > EPS {
                let mut back = contour.walk(entry, entry + overlap);
                for cut in self.hold_boundaries(entry, entry + overlap) {
                    split_at(&mut back, cut);
                }
                back.reverse();
                out.follow(
                    &back,
                    |_| z,
                    |d| hold_at(self.tabs, contour.wrap(d)),
                    |_| None,
                );
            }

            if k + 1 < depths.len() {
                let mut back = lead_in.clone();
                back.reverse();
                out.follow(&back, |_| z, |_| None, |_| None);
            } else {
                out.follow(&stations(&leads.lead_out), |_| z, |_| None, |_| None);
                let end = out.position().0;
                out.push(MoveKind::Rapid, end, tool.safe_z);
            }
            z_prev = z;
        }

        PlannedCut {
            kind,
            placement: contour.id,
            part_id: contour.part_id.clone(),
            instance: contour.instance,
            entry: entry_point,
            plunge_point: lead_start,
            pass_depths: depths.to_vec(),
            tabs: self.tabs.to_vec(),
            moves: out.finish(),
        }
    }

    /// Hold interval ends lying strictly inside `(from, to)` along the path.
    fn hold_boundaries(&self, from: f64, to: f64) -> Vec<f64> {
        let perimeter = self.contour.perimeter();
        let first_lap = (from / perimeter).floor() as i64;
        let last_lap = (to / perimeter).floor() as i64;
        let mut cuts = Vec::new();
        for lap in first_lap..=last_lap {
            let base = lap as f64 * perimeter;
            for tab in self.tabs {
                for d in [base + tab.start, base + tab.end] {
                    if d > from + EPS && d < to - EPS {
                        cuts.push(d);
                    }
                }
            }
        }
        cuts
    }

    /// Relief excursion at path distance `d`, if a relieved vertex sits there.
    fn relief_at(&self, d: f64) -> Option<&'a [Point]> {
        let perimeter = self.contour.perimeter();
        let d = self.contour.wrap(d);
        self.reliefs
            .iter()
            .find(|r| {
                let gap = (r.distance - d).abs();
                gap.min(perimeter - gap) < 1e-6
            })
            .map(|r| r.points.as_slice())
    }
}

/// Polyline stations with cumulative arc length.
fn stations(points: &[Point]) -> Vec<Station> {
    let mut s = 0.0;
    let mut prev = points.first().copied();
    points
        .iter()
        .map(|&p| {
            if let Some(q) = prev {
                s += point_distance(q, p);
            }
            prev = Some(p);
            (p, s)
        })
        .collect()
}

/// Inserts a station at parameter `s` when it falls strictly inside a segment.
fn split_at(path: &mut Vec<Station>, s: f64) {
    let Some(i) = path
        .windows(2)
        .position(|w| s > w[0].1.min(w[1].1) + EPS && s < w[0].1.max(w[1].1) - EPS)
    else {
        return;
    };
    let (a, b) = (path[i], path[i + 1]);
    let t = (s - a.1) / (b.1 - a.1);
    path.insert(i + 1, (lerp(a.0, b.0, t), s));
}

/// Accumulates moves while tracking the tool position.
struct MoveWriter {
    moves: Vec<Move>,
    pos: (Point, f64),
}

impl MoveWriter {
    fn new(pos: (Point, f64)) -> Self {
        Self {
            moves: Vec::new(),
            pos,
        }
    }

    fn position(&self) -> (Point, f64) {
        self.pos
    }

    fn push(&mut self, kind: MoveKind, p: Point, z: f64) {
        self.moves.push(Move::new(kind, p, z));
        self.pos = (p, z);
    }

    fn extend(&mut self, moves: Vec<Move>) {
        for m in moves {
            self.push(m.kind, m.xy(), m.z);
        }
    }

    /// Follows a polyline.
    ///
    /// `depth(s)` is the nominal Z, `hold(s)` an optional floor raised over
    /// held material (evaluated at segment midpoints) and `relief(s)` an
    /// excursion to run on arrival at a station.
    fn follow<'r>(
        &mut self,
        path: &[Station],
        depth: impl Fn(f64) -> f64,
        hold: impl Fn(f64) -> Option<f64>,
        relief: impl Fn(f64) -> Option<&'r [Point]>,
    ) {
        for w in path.windows(2) {
            let ((p0, s0), (p1, s1)) = (w[0], w[1]);
            if point_distance(p0, p1) < EPS {
                continue;
            }
            let floor = hold((s0 + s1) / 2.0).unwrap_or(f64::NEG_INFINITY);
            let z0 = depth(s0).max(floor);
            let z1 = depth(s1).max(floor);
            let current = self.pos.1;
            if (current - z0).abs() > EPS {
                let kind = if z0 < current { MoveKind::Plunge } else { MoveKind::Cut };
                self.push(kind, p0, z0);
            }
            let kind = if z1 < z0 - EPS { MoveKind::Plunge } else { MoveKind::Cut };
            self.push(kind, p1, z1);
            if let Some(points) = relief(s1) {
                for &q in points {
                    self.push(MoveKind::Cut, q, z1);
                }
            }
        }
    }

    fn finish(self) -> Vec<Move> {
        self.moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use u_cutlist_core::{
        CornerOvercut, Grain, LeadSettings, OnionSkinSettings, PlacedPart, PlungeSettings,
        Rotation, TabSettings, ToolSettings,
    };

    fn placed(id: &str, x: f64, y: f64, w: f64, h: f64) -> PlacedPart {
        PlacedPart {
            part_index: 0,
            part_id: id.into(),
            instance: 0,
            sheet_index: 2,
            x,
            y,
            rotation: Rotation::Deg0,
            width: w,
            height: h,
            area: w * h,
        }
    }

    fn sheet(placements: Vec<PlacedPart>) -> SheetLayout {
        SheetLayout {
            stock_index: 0,
            stock_id: "S".into(),
            stock_label: "Birch".into(),
            instance: 0,
            width: 1200.0,
            height: 600.0,
            grain: Grain::None,
            price: 0.0,
            usable: Rect::new(0.0, 0.0, 1200.0, 600.0),
            placements,
            waste_area: 0.0,
            kerf_loss: 0.0,
            cuts: Vec::new(),
        }
    }

    fn one_part() -> SheetLayout {
        sheet(vec![placed("P", 100.0, 100.0, 200.0, 100.0)])
    }

    fn min_z(cut: &PlannedCut) -> f64 {
        cut.moves.iter().map(|m| m.z).fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_pass_depths() {
        let d = pass_depths(18.0, 3);
        assert_eq!(d.len(), 3);
        assert!((d[0] + 6.0).abs() < 1e-12);
        assert!((d[2] + 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_straight_cut_shape() {
        let planned = plan_toolpaths(&one_part(), &Settings::new());
        assert_eq!(planned.sheet_index, 2);
        assert_eq!(planned.cuts.len(), 1);
        let cut = &planned.cuts[0];
        assert_eq!(cut.pass_depths.len(), 3);
        let first = cut.moves[0];
        assert_eq!(first.kind, MoveKind::Rapid);
        assert!((first.z - 5.0).abs() < 1e-12);
        assert_eq!(first.xy(), cut.plunge_point);
        let last = cut.moves.last().expect("moves");
        assert_eq!(last.kind, MoveKind::Rapid);
        assert!((last.z - 5.0).abs() < 1e-12);
        assert!((min_z(cut) + 18.0).abs() < 1e-9);
        assert_eq!(planned.stats.plunge_count, 1);
        assert!(!planned.collision.checked);
    }

    #[test]
    fn test_tool_stays_outside_part() {
        let planned = plan_toolpaths(&one_part(), &Settings::new());
        let part = Rect::new(100.0, 100.0, 200.0, 100.0);
        for m in planned.moves() {
            // tool edge never enters the finished part
            assert!(part.distance_to_point(m.xy()) >= 3.0 - 1e-6);
        }
    }

    #[test]
    fn test_entries_avoid_adjacent_part() {
        let layout = sheet(vec![
            placed("A", 0.0, 0.0, 300.0, 600.0),
            placed("B", 306.0, 0.0, 300.0, 600.0),
        ]);
        let boxes = [
            Rect::new(0.0, 0.0, 300.0, 600.0),
            Rect::new(306.0, 0.0, 300.0, 600.0),
        ];
        for strategy in [PlungeStrategy::Straight, PlungeStrategy::Helix] {
            let settings = Settings::new().with_plunge(PlungeSettings {
                strategy,
                ..Default::default()
            });
            let planned = plan_toolpaths(&layout, &settings);
            assert_eq!(planned.cuts.len(), 2);
            for cut in &planned.cuts {
                let other = &boxes[1 - cut.placement];
                // the open sides leave room for the full lead arcs
                assert!(point_distance(cut.plunge_point, cut.entry) > 1e-6);
                for m in cut.moves.iter().filter(|m| m.z < 0.0) {
                    assert!(other.distance_to_point(m.xy()) >= 3.0 - 1e-6, "{:?}", m);
                }
            }
        }
    }

    #[test]
    fn test_feed_covers_every_pass() {
        let settings = Settings::new().with_lead(LeadSettings {
            radius: 0.0,
            angle_deg: 0.0,
        });
        let planned = plan_toolpaths(&one_part(), &settings);
        // 3 passes of the 2 × (206 + 106) loop plus 18 of plunging
        let expected = 3.0 * 624.0 + 18.0 + 5.0;
        assert!((planned.stats.feed_length - expected).abs() < 1e-6);
    }

    #[test]
    fn test_ramp_descends_gradually() {
        let settings = Settings::new().with_plunge(PlungeSettings {
            strategy: PlungeStrategy::Ramp,
            ramp_angle_deg: 10.0,
            ..Default::default()
        });
        let planned = plan_toolpaths(&one_part(), &settings);
        let cut = &planned.cuts[0];
        assert!((min_z(cut) + 18.0).abs() < 1e-9);
        // no vertical descent below the stock top
        let mut prev = cut.moves[0];
        for m in &cut.moves[1..] {
            if m.z < prev.z - 1e-9 && m.z < 0.0 - 1e-9 && prev.z < 0.0 - 1e-9 {
                let run = point_distance(prev.xy(), m.xy());
                assert!(run > 1e-6, "vertical plunge at {:?}", m);
                let slope = (prev.z - m.z) / run;
                assert!(slope <= 10f64.to_radians().tan() + 1e-6);
            }
            prev = *m;
        }
    }

    #[test]
    fn test_helix_entry() {
        let settings = Settings::new().with_plunge(PlungeSettings {
            strategy: PlungeStrategy::Helix,
            ..Default::default()
        });
        let planned = plan_toolpaths(&one_part(), &settings);
        let cut = &planned.cuts[0];
        assert!((min_z(cut) + 18.0).abs() < 1e-9);
        let helix_moves = cut
            .moves
            .iter()
            .filter(|m| m.kind == MoveKind::Plunge && point_distance(m.xy(), cut.plunge_point) > 1e-6)
            .count();
        assert!(helix_moves > 0);
    }

    #[test]
    fn test_tabs_lift_tool() {
        let settings = Settings::new().with_tabs(TabSettings {
            enabled: true,
            width: 8.0,
            height: 3.0,
            count_per_side: 1,
        });
        let planned = plan_toolpaths(&one_part(), &settings);
        let cut = &planned.cuts[0];
        assert_eq!(cut.tabs.len(), 4);
        let at_tab_height = cut
            .moves
            .iter()
            .filter(|m| m.kind == MoveKind::Cut && (m.z + 15.0).abs() < 1e-9)
            .count();
        assert!(at_tab_height >= 4);
        // the last pass climbs onto each tab and drops back off it
        let mut lifts = 0;
        let mut drops = 0;
        for w in cut.moves.windows(2) {
            if w[0].xy() == w[1].xy() && (w[0].z + 18.0).abs() < 1e-9 && (w[1].z + 15.0).abs() < 1e-9 {
                lifts += 1;
            }
            if w[0].xy() == w[1].xy() && (w[0].z + 15.0).abs() < 1e-9 && (w[1].z + 18.0).abs() < 1e-9 {
                drops += 1;
            }
        }
        assert_eq!(lifts, 4);
        assert_eq!(drops, 4);
    }

    #[test]
    fn test_onion_skin_cleanup_appended() {
        let settings = Settings::new().with_onion_skin(OnionSkinSettings {
            enabled: true,
            thickness: 0.5,
            cleanup_pass: true,
        });
        let planned = plan_toolpaths(&one_part(), &settings);
        assert_eq!(planned.cuts.len(), 2);
        assert_eq!(planned.cuts[0].kind, CutKind::Profile);
        assert!((min_z(&planned.cuts[0]) + 17.5).abs() < 1e-9);
        assert_eq!(planned.cuts[1].kind, CutKind::Cleanup);
        assert!((min_z(&planned.cuts[1]) + 18.0).abs() < 1e-9);
        assert_eq!(planned.cuts[1].pass_depths, vec![-18.0]);
    }

    #[test]
    fn test_onion_skin_without_cleanup() {
        let settings = Settings::new().with_onion_skin(OnionSkinSettings {
            enabled: true,
            thickness: 0.5,
            cleanup_pass: false,
        });
        let planned = plan_toolpaths(&one_part(), &settings);
        assert_eq!(planned.cuts.len(), 1);
        assert!((min_z(&planned.cuts[0]) + 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_dogbone_adds_excursion() {
        let outline = u_cutlist_core::Outline::new(vec![
            (0.0, 0.0),
            (60.0, 0.0),
            (60.0, 30.0),
            (30.0, 30.0),
            (30.0, 60.0),
            (0.0, 60.0),
        ])
        .expect("outline");
        let parts = vec![Part::from_outline("L", outline)];
        let layout = sheet(vec![placed("L", 100.0, 100.0, 60.0, 60.0)]);
        let plain = plan_sheet(&layout, &parts, &Settings::new());
        let relieved = plan_sheet(
            &layout,
            &parts,
            &Settings::new().with_corner_overcut(CornerOvercut::DogBone),
        );
        // one excursion out and back per pass
        assert_eq!(relieved.cuts[0].moves.len(), plain.cuts[0].moves.len() + 2 * 3);
        let k = 3.0 / 2f64.sqrt();
        let target = (130.0 + k, 130.0 + k);
        assert!(relieved.cuts[0]
            .moves
            .iter()
            .any(|m| point_distance(m.xy(), target) < 1e-9));
    }

    #[test]
    fn test_invalid_tooling_plans_nothing() {
        let settings = Settings::new().with_tool(ToolSettings {
            pass_depth: 0.0,
            ..Default::default()
        });
        let planned = plan_toolpaths(&one_part(), &settings);
        assert!(planned.cuts.is_empty());
    }

    #[test]
    fn test_split_at() {
        let mut path = stations(&[(0.0, 0.0), (10.0, 0.0)]);
        split_at(&mut path, 4.0);
        assert_eq!(path.len(), 3);
        assert_eq!(path[1], ((4.0, 0.0), 4.0));
        split_at(&mut path, 4.0);
        assert_eq!(path.len(), 3);
    }
}
