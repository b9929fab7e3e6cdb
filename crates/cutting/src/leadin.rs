//! Tangent lead-in and lead-out arcs.
//!
//! Both arcs lie on one circle of the configured radius that touches the
//! tool path at the entry point from the waste side. The lead-in arrives
//! tangent to the direction of travel, the lead-out leaves tangent to it, so
//! the cutter never dwells on the finished edge.

use std::f64::consts::PI;

use u_cutlist_core::geometry::{arc_segment_count, point_distance, Point, EPS};
use u_cutlist_core::LeadSettings;

/// Chord tolerance for tessellated arcs.
pub const ARC_TOLERANCE: f64 = 0.01;

/// Approach and exit polylines around an entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct Leads {
    /// From the lead start to the entry point (last point is the entry).
    pub lead_in: Vec<Point>,
    /// From the entry point (first point) to the lead end.
    pub lead_out: Vec<Point>,
}

impl Leads {
    /// No leads: the cutter enters directly at `entry`.
    pub fn none(entry: Point) -> Self {
        Self {
            lead_in: vec![entry],
            lead_out: vec![entry],
        }
    }

    /// First point of the lead-in.
    pub fn start(&self) -> Point {
        self.lead_in[0]
    }

    /// Length of the lead-in polyline.
    pub fn lead_in_length(&self) -> f64 {
        self.lead_in.windows(2).map(|w| point_distance(w[0], w[1])).sum()
    }
}

/// Builds the lead arcs at `entry`.
///
/// `tangent` is the unit direction of travel and `waste_normal` the unit
/// normal pointing away from the part.
pub fn arc_leads(entry: Point, tangent: Point, waste_normal: Point, lead: &LeadSettings) -> Leads {
    let sweep = lead_sweep(lead.angle_deg);
    if lead.radius <= EPS || sweep <= EPS {
        return Leads::none(entry);
    }
    let r = lead.radius;
    let center = (entry.0 + waste_normal.0 * r, entry.1 + waste_normal.1 * r);
    let entry_angle = (-waste_normal.1).atan2(-waste_normal.0);
    let segments = arc_segment_count(r, sweep, ARC_TOLERANCE);

    // clockwise around a center in the waste runs along +tangent at the entry
    debug_assert!({
        let (s, c) = entry_angle.sin_cos();
        (s - tangent.0).abs() < 1e-6 && (-c - tangent.1).abs() < 1e-6
    });
    let arc = |start: f64| -> Vec<Point> {
        (0..=segments)
            .map(|i| {
                let a = start - sweep * i as f64 / segments as f64;
                (center.0 + r * a.cos(), center.1 + r * a.sin())
            })
            .collect()
    };

    let mut lead_in = arc(entry_angle + sweep);
    let mut lead_out = arc(entry_angle);
    // pin the shared point exactly
    if let Some(last) = lead_in.last_mut() {
        *last = entry;
    }
    lead_out[0] = entry;
    Leads { lead_in, lead_out }
}

/// Full sweep in radians represented by `angle_deg`, clamped to a half turn.
pub fn lead_sweep(angle_deg: f64) -> f64 {
    angle_deg.clamp(0.0, 180.0) * PI / 180.0
}
