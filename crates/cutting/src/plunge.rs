//! Plunge entry strategies.
//!
//! - **Straight**: vertical descent at the plunge point
//! - **Ramp**: inclined descent along the lead-in and the contour; the run
//!   length follows from the depth step and the ramp angle
//! - **Helix**: circular descent through the plunge point on the waste side,
//!   whole revolutions until the pass depth is reached

use std::f64::consts::TAU;

use u_cutlist_core::geometry::{arc_segment_count, Point, EPS};
use u_cutlist_core::PlungeSettings;

use crate::leadin::ARC_TOLERANCE;
use crate::result::{Move, MoveKind};

/// Z profile of an inclined descent along a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descent {
    /// Z at the start of the run.
    pub start_z: f64,
    /// Z at the end of the run and beyond.
    pub end_z: f64,
    /// Horizontal run length; zero for a vertical descent.
    pub run: f64,
}

impl Descent {
    /// Vertical descent (the path is cut at `z` throughout).
    pub fn level(z: f64) -> Self {
        Self {
            start_z: z,
            end_z: z,
            run: 0.0,
        }
    }

    /// Z after travelling `s` along the path.
    pub fn z_at(&self, s: f64) -> f64 {
        if self.run <= EPS || s >= self.run {
            self.end_z
        } else {
            self.start_z + (self.end_z - self.start_z) * (s.max(0.0) / self.run)
        }
    }
}

/// Ramp run needed to descend `depth` at `angle_deg`; `None` for unusable angles.
pub fn ramp_run(depth: f64, angle_deg: f64) -> Option<f64> {
    if !(angle_deg > 0.0 && angle_deg < 90.0) {
        return None;
    }
    Some(depth.max(0.0) / angle_deg.to_radians().tan())
}

/// Ramp from `from_z` to `to_z` limited to `available` path length.
///
/// A ramp longer than the path is steepened to fit, with a warning.
pub fn ramp(from_z: f64, to_z: f64, settings: &PlungeSettings, available: f64) -> Descent {
    let Some(mut run) = ramp_run(from_z - to_z, settings.ramp_angle_deg) else {
        log::warn!(
            "ramp angle {}° unusable, descending vertically",
            settings.ramp_angle_deg
        );
        return Descent::level(to_z);
    };
    if run > available {
        log::warn!(
            "ramp of {:.3} clamped to the {:.3} available path length",
            run,
            available
        );
        run = available.max(0.0);
    }
    Descent {
        start_z: from_z,
        end_z: to_z,
        run,
    }
}

/// Helical descent from `from_z` to `to_z` ending back at `at`.
///
/// The helix circle passes through `at` and lies on the `waste_normal` side.
/// Falls back to a vertical plunge when the helix parameters are unusable.
pub fn helix(at: Point, waste_normal: Point, from_z: f64, to_z: f64, settings: &PlungeSettings) -> Vec<Move> {
    let radius = settings.helix_diameter / 2.0;
    let per_rev = settings.helix_depth_per_rev;
    let depth = from_z - to_z;
    if depth <= EPS {
        return Vec::new();
    }
    if radius <= EPS || per_rev <= EPS {
        log::warn!(
            "helix diameter {} / depth per revolution {} unusable, plunging straight",
            settings.helix_diameter,
            per_rev
        );
        return straight(at, to_z);
    }

    let center = (at.0 + waste_normal.0 * radius, at.1 + waste_normal.1 * radius);
    let start_angle = (at.1 - center.1).atan2(at.0 - center.0);
    let revolutions = (depth / per_rev - 1e-9).ceil().max(1.0);
    let sweep = revolutions * TAU;
    let segments = arc_segment_count(radius, sweep, ARC_TOLERANCE);

    let mut moves: Vec<Move> = (1..=segments)
        .map(|i| {
            let f = i as f64 / segments as f64;
            let a = start_angle + sweep * f;
            let p = (center.0 + radius * a.cos(), center.1 + radius * a.sin());
            Move::new(MoveKind::Plunge, p, from_z - depth * f)
        })
        .collect();
    if let Some(last) = moves.last_mut() {
        *last = Move::new(MoveKind::Plunge, at, to_z);
    }
    moves
}

/// Vertical plunge at `at`.
pub fn straight(at: Point, to_z: f64) -> Vec<Move> {
    vec![Move::new(MoveKind::Plunge, at, to_z)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use u_cutlist_core::PlungeStrategy;

    fn settings() -> PlungeSettings {
        PlungeSettings {
            strategy: PlungeStrategy::Helix,
            ramp_angle_deg: 5.0,
            helix_diameter: 8.0,
            helix_depth_per_rev: 1.5,
        }
    }

    #[test]
    fn test_ramp_run_from_angle() {
        let run = ramp_run(6.0, 45.0).expect("angle");
        assert!((run - 6.0).abs() < 1e-9);
        assert!(ramp_run(6.0, 0.0).is_none());
        assert!(ramp_run(6.0, 90.0).is_none());
    }

    #[test]
    fn test_ramp_profile() {
        let mut s = settings();
        s.ramp_angle_deg = 45.0;
        let d = ramp(0.0, -6.0, &s, 100.0);
        assert!((d.run - 6.0).abs() < 1e-9);
        assert!((d.z_at(3.0) + 3.0).abs() < 1e-9);
        assert!((d.z_at(50.0) + 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_ramp_clamped_to_path() {
        let d = ramp(0.0, -6.0, &settings(), 20.0);
        // 5° needs ~68.6 of run
        assert!((d.run - 20.0).abs() < 1e-9);
        assert!((d.z_at(20.0) + 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_helix_ends_at_depth_and_point() {
        let moves = helix((10.0, 0.0), (0.0, -1.0), 0.0, -6.0, &settings());
        let last = moves.last().expect("moves");
        assert!((last.x - 10.0).abs() < 1e-12 && last.y.abs() < 1e-12);
        assert!((last.z + 6.0).abs() < 1e-12);
        // every point on the 4 mm circle centred at (10, -4)
        for m in &moves {
            let r = ((m.x - 10.0).powi(2) + (m.y + 4.0).powi(2)).sqrt();
            assert!((r - 4.0).abs() < 1e-9);
            assert!(m.y <= 1e-9);
            assert_eq!(m.kind, MoveKind::Plunge);
        }
        for pair in moves.windows(2) {
            assert!(pair[1].z <= pair[0].z + 1e-12);
        }
    }

    #[test]
    fn test_helix_falls_back_to_straight() {
        let mut s = settings();
        s.helix_diameter = 0.0;
        let moves = helix((1.0, 1.0), (1.0, 0.0), 0.0, -3.0, &s);
        assert_eq!(moves, straight((1.0, 1.0), -3.0));
    }
}
