//! Tool-center contours for placed parts.
//!
//! Every placed part is cut along its outer boundary with the tool running
//! outside the part: the tool center follows the boundary offset outward by
//! the tool radius, so the finished part keeps its nominal size. Outline
//! parts use their polygon, everything else the placement footprint.
//!
//! Contours are counter-clockwise, so the part lies to the left of the
//! direction of travel and the waste to the right.

use u_cutlist_core::geometry::{
    cumulative_lengths, dedup_ring, direction, ensure_ccw, offset_polygon, point_at_distance,
    polygon_bbox, Point, EPS,
};
use u_cutlist_core::{Part, PlacedPart, Rect, SheetLayout};

/// One closed cut around a placed part.
#[derive(Debug, Clone)]
pub struct CutContour {
    /// Index of the placement on its sheet.
    pub id: usize,
    /// Index into the part list.
    pub part_index: usize,
    /// Part identifier.
    pub part_id: String,
    /// Copy number of the part.
    pub instance: u32,
    /// Finished part edge (CCW, sheet coordinates).
    pub boundary: Vec<Point>,
    /// Tool-center path (CCW); vertex `i` belongs to boundary vertex `i`.
    pub path: Vec<Point>,
    /// Cumulative lengths along `path`; the last entry is the perimeter.
    pub cumulative: Vec<f64>,
    /// Bounding box of the finished part.
    pub bbox: Rect,
}

impl CutContour {
    /// Builds a contour from a finished boundary and the tool radius.
    ///
    /// Returns `None` for degenerate boundaries.
    pub fn new(
        placement_id: usize,
        placed: &PlacedPart,
        boundary: &[Point],
        tool_radius: f64,
    ) -> Option<Self> {
        let boundary = ensure_ccw(&dedup_ring(boundary));
        if boundary.len() < 3 {
            return None;
        }
        let bbox = polygon_bbox(&boundary)?;
        let path = offset_polygon(&boundary, tool_radius.max(0.0));
        let cumulative = cumulative_lengths(&path);
        if cumulative.last().copied().unwrap_or(0.0) < EPS {
            return None;
        }
        Some(Self {
            id: placement_id,
            part_index: placed.part_index,
            part_id: placed.part_id.clone(),
            instance: placed.instance,
            boundary,
            path,
            cumulative,
            bbox,
        })
    }

    /// Length of the tool-center path.
    pub fn perimeter(&self) -> f64 {
        self.cumulative[self.path.len()]
    }

    /// Wraps a distance into `[0, perimeter)`.
    pub fn wrap(&self, dist: f64) -> f64 {
        let p = self.perimeter();
        if p < EPS {
            0.0
        } else {
            dist.rem_euclid(p)
        }
    }

    /// Point and edge index at a distance along the path.
    pub fn point_at(&self, dist: f64) -> (Point, usize) {
        point_at_distance(&self.path, &self.cumulative, dist).unwrap_or((self.path[0], 0))
    }

    /// Unit direction of travel on edge `edge`.
    pub fn edge_direction(&self, edge: usize) -> Point {
        let n = self.path.len();
        direction(self.path[edge % n], self.path[(edge + 1) % n]).unwrap_or((1.0, 0.0))
    }

    /// Unit normal pointing into the waste (right of travel) on edge `edge`.
    pub fn waste_normal(&self, edge: usize) -> Point {
        let (tx, ty) = self.edge_direction(edge);
        (ty, -tx)
    }

    /// Path points from `from` to `to` (distances measured along the path,
    /// `to >= from`, may exceed the perimeter to wrap around).
    ///
    /// The result starts at `from`, ends at `to` and contains every path
    /// vertex in between, each paired with its running distance.
    pub fn walk(&self, from: f64, to: f64) -> Vec<(Point, f64)> {
        let perimeter = self.perimeter();
        let n = self.path.len();
        let mut out = vec![(self.point_at(from).0, from)];
        if to <= from + EPS {
            return out;
        }
        // vertices lie at cumulative[i] + k * perimeter
        let lap0 = (from / perimeter).floor() as i64;
        let lap1 = (to / perimeter).floor() as i64;
        for lap in lap0..=lap1 {
            let base = lap as f64 * perimeter;
            for i in 0..n {
                let d = base + self.cumulative[i];
                if d > from + EPS && d < to - EPS {
                    out.push((self.path[i], d));
                }
            }
        }
        out.push((self.point_at(to).0, to));
        out
    }

    /// Boundary vertices where the part turns inward (reflex corners).
    pub fn reflex_vertices(&self) -> Vec<usize> {
        let n = self.boundary.len();
        (0..n)
            .filter(|&i| {
                let a = self.boundary[(i + n - 1) % n];
                let b = self.boundary[i];
                let c = self.boundary[(i + 1) % n];
                let cross = (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0);
                cross < -EPS
            })
            .collect()
    }

    /// Distance along the path of vertex `i`.
    pub fn vertex_distance(&self, i: usize) -> f64 {
        self.cumulative[i % self.path.len()]
    }
}

/// Finished boundary of a placement in sheet coordinates.
pub fn placement_boundary(placed: &PlacedPart, parts: &[Part]) -> Vec<Point> {
    parts
        .get(placed.part_index)
        .and_then(|p| p.outline.as_ref())
        .map(|outline| outline.placed(placed.x, placed.y, placed.rotation))
        .unwrap_or_else(|| placed.bbox().to_polygon())
}

/// Extracts one tool-center contour per placement.
///
/// `parts` supplies outlines; an empty slice cuts every placement along its
/// footprint rectangle.
pub fn extract_contours(sheet: &SheetLayout, parts: &[Part], tool_radius: f64) -> Vec<CutContour> {
    sheet
        .placements
        .iter()
        .enumerate()
        .filter_map(|(i, placed)| {
            let boundary = placement_boundary(placed, parts);
            let contour = CutContour::new(i, placed, &boundary, tool_radius);
            if contour.is_none() {
                log::warn!(
                    "skipping degenerate contour for part '{}' #{}",
                    placed.part_id,
                    placed.instance
                );
            }
            contour
        })
        .collect()
}
