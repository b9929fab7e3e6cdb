//! Integration tests for u-cutlist-cutting.

use u_cutlist_core::geometry::point_distance;
use u_cutlist_core::{
    ClampZone, DustShoeSettings, OptimizationResult, OrderingSettings, Part, PlungeSettings,
    PlungeStrategy, Rect, Settings, StockSheet, StockTabPadding, TabSettings,
};
use u_cutlist_cutting::{plan_all, plan_toolpaths, CutKind, MoveKind, PlannedSheet, TabKind};
use u_cutlist_packing::optimize;

fn cabinet_parts() -> Vec<Part> {
    vec![
        Part::new("side", 720.0, 560.0).with_quantity(2),
        Part::new("shelf", 764.0, 540.0).with_quantity(2),
        Part::new("kick", 764.0, 100.0).with_quantity(2),
    ]
}

fn board() -> Vec<StockSheet> {
    vec![StockSheet::new("board", 2440.0, 1220.0).with_quantity(2)]
}

fn packed(settings: &Settings) -> OptimizationResult {
    optimize(&cabinet_parts(), &board(), settings).expect("optimize")
}

fn assert_continuous_safe_entries(planned: &PlannedSheet) {
    let safe_z = planned.tool.safe_z;
    for cut in &planned.cuts {
        let first = cut.moves.first().expect("moves");
        assert_eq!(first.kind, MoveKind::Rapid);
        assert!((first.z - safe_z).abs() < 1e-12);
        let last = cut.moves.last().expect("moves");
        assert!((last.z - safe_z).abs() < 1e-12);
        // rapids end at or above the stock top and only leave the stock vertically
        let mut prev = *first;
        for m in &cut.moves[1..] {
            if m.kind == MoveKind::Rapid {
                assert!(m.z >= 0.0, "rapid into the stock");
                if prev.z < 0.0 {
                    assert_eq!(m.xy(), prev.xy());
                }
            }
            prev = *m;
        }
    }
}

mod planner_tests {
    use super::*;

    #[test]
    fn test_every_part_cut_once() {
        let settings = Settings::new().with_kerf(12.0);
        let result = packed(&settings);
        let planned = plan_all(&result, &[], &settings).expect("plan");
        assert_eq!(planned.len(), result.sheets.len());
        for (i, (sheet, plan)) in result.sheets.iter().zip(&planned).enumerate() {
            assert_eq!(plan.sheet_index, i);
            assert_eq!(plan.cuts.len(), sheet.placements.len());
            let mut seen: Vec<usize> = plan.cuts.iter().map(|c| c.placement).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..sheet.placements.len()).collect::<Vec<_>>());
            assert_continuous_safe_entries(plan);
        }
    }

    #[test]
    fn test_full_depth_reached() {
        let settings = Settings::new().with_kerf(12.0);
        let result = packed(&settings);
        let planned = plan_toolpaths(&result.sheets[0], &settings);
        for cut in &planned.cuts {
            let deepest = cut.moves.iter().map(|m| m.z).fold(f64::INFINITY, f64::min);
            assert!((deepest + settings.tool.cut_depth).abs() < 1e-9);
        }
        assert_eq!(planned.stats.plunge_count, planned.cuts.len());
        assert!(planned.stats.estimated_seconds > 0.0);
    }

    #[test]
    fn test_tool_never_enters_parts() {
        let settings = Settings::new()
            .with_kerf(12.0)
            .with_plunge(PlungeSettings {
                strategy: PlungeStrategy::Ramp,
                ..Default::default()
            });
        let result = packed(&settings);
        let sheet = &result.sheets[0];
        let planned = plan_toolpaths(sheet, &settings);
        let radius = settings.tool.radius();
        for m in planned.moves().filter(|m| m.z < 0.0) {
            for p in &sheet.placements {
                assert!(p.bbox().distance_to_point(m.xy()) >= radius - 1e-6);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let settings = Settings::new().with_kerf(12.0);
        let result = packed(&settings);
        let a = plan_toolpaths(&result.sheets[0], &settings);
        let b = plan_toolpaths(&result.sheets[0], &settings);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ordering_keeps_work() {
        let settings = Settings::new().with_kerf(12.0);
        let result = packed(&settings);
        let optimized = plan_toolpaths(&result.sheets[0], &settings);
        let plain = plan_toolpaths(
            &result.sheets[0],
            &settings.clone().with_ordering(OrderingSettings {
                optimize_order: false,
                ..Default::default()
            }),
        );
        assert!((optimized.stats.feed_length - plain.stats.feed_length).abs() < 1e-6);
        let plain_order: Vec<usize> = plain.cuts.iter().map(|c| c.placement).collect();
        assert_eq!(plain_order, (0..plain.cuts.len()).collect::<Vec<_>>());
        let mut optimized_order: Vec<usize> = optimized.cuts.iter().map(|c| c.placement).collect();
        optimized_order.sort_unstable();
        assert_eq!(optimized_order, plain_order);
    }

    #[test]
    fn test_onion_skin_cleanup_after_profiles() {
        let mut settings = Settings::new().with_kerf(12.0);
        settings.onion_skin.enabled = true;
        settings.onion_skin.thickness = 0.4;
        let result = packed(&settings);
        let planned = plan_toolpaths(&result.sheets[0], &settings);
        let n = result.sheets[0].placements.len();
        assert_eq!(planned.cuts.len(), 2 * n);
        assert!(planned.cuts[..n].iter().all(|c| c.kind == CutKind::Profile));
        assert!(planned.cuts[n..].iter().all(|c| c.kind == CutKind::Cleanup));
        for (profile, cleanup) in planned.cuts[..n].iter().zip(&planned.cuts[n..]) {
            assert_eq!(profile.placement, cleanup.placement);
            assert!(point_distance(profile.entry, cleanup.entry) < 1e-9);
        }
    }

    #[test]
    fn test_plan_all_rejects_bad_tooling() {
        let mut settings = Settings::new();
        settings.tool.diameter = -1.0;
        let result = packed(&Settings::new().with_kerf(12.0));
        let err = plan_all(&result, &[], &settings).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_plan_all_rejects_kerf_narrower_than_tool() {
        let settings = Settings::new().with_kerf(3.0);
        let result = packed(&settings);
        let err = plan_all(&result, &[], &settings).unwrap_err();
        assert!(err.is_invalid_input());
    }
}

mod neighbour_tests {
    use super::*;

    /// Asserts that no move below the stock top brings the tool edge into a
    /// part other than the one being cut.
    fn assert_clear_of_neighbours(result: &OptimizationResult, planned: &[PlannedSheet]) {
        for (sheet, plan) in result.sheets.iter().zip(planned) {
            let radius = plan.tool.radius();
            for cut in &plan.cuts {
                for m in cut.moves.iter().filter(|m| m.z < 0.0) {
                    for (j, other) in sheet.placements.iter().enumerate() {
                        if j == cut.placement {
                            continue;
                        }
                        let gap = other.bbox().distance_to_point(m.xy());
                        assert!(
                            gap >= radius - 1e-6,
                            "cut of {} enters {} at {:?}",
                            cut.part_id,
                            other.part_id,
                            m.xy()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_leads_stay_out_of_neighbours_at_tool_kerf() {
        let settings = Settings::new();
        assert!((settings.kerf_width - settings.tool.diameter).abs() < 1e-9);
        let result = packed(&settings);
        let planned = plan_all(&result, &[], &settings).expect("plan");
        assert_clear_of_neighbours(&result, &planned);
    }

    #[test]
    fn test_helix_stays_out_of_neighbours() {
        let settings = Settings::new().with_plunge(PlungeSettings {
            strategy: PlungeStrategy::Helix,
            ..Default::default()
        });
        let result = packed(&settings);
        let planned = plan_all(&result, &[], &settings).expect("plan");
        assert_clear_of_neighbours(&result, &planned);
        for plan in &planned {
            assert_eq!(plan.cuts.len(), result.sheets[plan.sheet_index].placements.len());
        }
    }
}

mod tab_tests {
    use super::*;

    #[test]
    fn test_tabs_on_every_part() {
        let settings = Settings::new().with_kerf(12.0).with_tabs(TabSettings {
            enabled: true,
            count_per_side: 2,
            ..Default::default()
        });
        let result = packed(&settings);
        let planned = plan_toolpaths(&result.sheets[0], &settings);
        for cut in &planned.cuts {
            assert_eq!(cut.tabs.len(), 8);
            assert!(cut.tabs.iter().all(|t| t.kind == TabKind::Part));
            assert!(cut.tabs.windows(2).all(|w| w[0].end <= w[1].start));
        }
    }

    #[test]
    fn test_stock_padding_near_edges() {
        // parts pushed against the sheet corner cross a 20 band
        let settings = Settings::new()
            .with_kerf(12.0)
            .with_stock_tabs(StockTabPadding::uniform(20.0));
        let result = packed(&settings);
        let sheet = &result.sheets[0];
        let planned = plan_toolpaths(sheet, &settings);
        let corner_cut = planned
            .cuts
            .iter()
            .find(|c| {
                let p = &sheet.placements[c.placement];
                p.x < 20.0 && p.y < 20.0
            })
            .expect("a part at the origin");
        assert!(corner_cut.tabs.iter().any(|t| t.kind == TabKind::Stock));
    }
}

mod collision_tests {
    use super::*;

    fn shoe() -> DustShoeSettings {
        DustShoeSettings {
            enabled: true,
            width: 80.0,
            clearance: 5.0,
        }
    }

    #[test]
    fn test_far_clamp_passes() {
        let settings = Settings::new()
            .with_kerf(12.0)
            .with_dust_shoe(shoe())
            .with_clamp_zone(ClampZone::new("far", Rect::new(5000.0, 5000.0, 50.0, 50.0), 50.0));
        let result = packed(&settings);
        let planned = plan_toolpaths(&result.sheets[0], &settings);
        assert!(planned.collision.checked);
        assert!(planned.collision.passed());
    }

    #[test]
    fn test_tall_clamp_over_parts_flagged() {
        let settings = Settings::new()
            .with_kerf(12.0)
            .with_dust_shoe(shoe())
            .with_clamp_zone(ClampZone::new("center", Rect::new(0.0, 0.0, 2440.0, 1220.0), 100.0));
        let result = packed(&settings);
        let baseline = plan_toolpaths(&result.sheets[0], &Settings::new().with_kerf(12.0));
        let planned = plan_toolpaths(&result.sheets[0], &settings);
        assert!(!planned.collision.passed());
        assert_eq!(planned.collision.offending_zones(), vec!["center"]);
        assert_eq!(planned.collision.hits.len(), planned.cuts.len());
        // geometry is untouched by the check
        assert_eq!(baseline.cuts, planned.cuts);
    }
}
