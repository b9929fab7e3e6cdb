//! Dust-shoe clearance against clamp zones.
//!
//! The dust shoe is a square footprint centred on the spindle whose bottom
//! rides `clearance` above the tool tip. A clamp zone is a rectangle extruded
//! from the stock top up to its clearance height. Every motion is sampled;
//! a conflict exists where the footprint overlaps a zone while the shoe
//! bottom is below the zone top. The check reports and never alters moves.

use u_cutlist_core::geometry::{lerp, EPS};
use u_cutlist_core::{ClampZone, DustShoeSettings, Rect};

use crate::result::{CollisionHit, CollisionReport, PlannedCut};

/// Checks every cut against every clamp zone.
///
/// `start` is the tool position before the first move. Only the first
/// conflict per (zone, cut) pair is reported.
pub fn check_collisions(
    cuts: &[PlannedCut],
    zones: &[ClampZone],
    shoe: &DustShoeSettings,
    start: (f64, f64, f64),
) -> CollisionReport {
    if !shoe.enabled {
        return CollisionReport::default();
    }
    let mut report = CollisionReport {
        checked: true,
        hits: Vec::new(),
    };
    if zones.is_empty() {
        return report;
    }

    let half = shoe.width.max(0.0) / 2.0;
    let step = (shoe.width / 10.0).clamp(0.5, 5.0);
    let mut pos = start;

    for (cut_index, cut) in cuts.iter().enumerate() {
        let mut flagged = vec![false; zones.len()];
        for m in &cut.moves {
            let from = pos;
            pos = (m.x, m.y, m.z);
            let len = ((pos.0 - from.0).powi(2) + (pos.1 - from.1).powi(2)).sqrt();
            let samples = ((len / step).ceil() as usize).max(1);
            for s in 0..=samples {
                let t = s as f64 / samples as f64;
                let p = lerp((from.0, from.1), (pos.0, pos.1), t);
                let z = from.2 + (pos.2 - from.2) * t;
                let shoe_bottom = z + shoe.clearance;
                let footprint = Rect::new(p.0 - half, p.1 - half, 2.0 * half, 2.0 * half);
                for (zi, zone) in zones.iter().enumerate() {
                    if flagged[zi] || shoe_bottom >= zone.clearance_height - EPS {
                        continue;
                    }
                    if footprint.overlaps(&zone.rect) {
                        flagged[zi] = true;
                        report.hits.push(CollisionHit {
                            zone: zone.label.clone(),
                            cut: cut_index,
                            position: p,
                            z,
                        });
                    }
                }
            }
        }
    }

    if report.passed() {
        log::debug!("dust shoe clears {} clamp zone(s)", zones.len());
    } else {
        log::warn!(
            "dust shoe collides with clamp zone(s) {:?} in {} place(s)",
            report.offending_zones(),
            report.hits.len()
        );
    }
    report
}
