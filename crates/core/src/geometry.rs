//! Geometry kernel: rectangles, polygons, arcs and segment chaining.
//!
//! Points are plain `(x, y)` tuples in millimetres. Polygons are open rings
//! (the closing edge from the last vertex back to the first is implicit).
//! Area, centroid, containment and segment intersection delegate to the
//! `geo` crate; everything the packers and the toolpath planner need on top
//! of that lives here.

use geo::{Area, Centroid, Contains, Coord, Intersects, Line, LineString, Polygon};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2-D point `(x, y)`.
pub type Point = (f64, f64);

/// Tolerance for geometric comparisons.
pub const EPS: f64 = 1e-9;

/// An axis-aligned rectangle anchored at its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Bottom edge.
    pub y: f64,
    /// Extent along X.
    pub width: f64,
    /// Extent along Y.
    pub height: f64,
}

impl Rect {
    /// Creates a new rectangle.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from two opposite corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let (x0, x1) = if a.0 <= b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let (y0, y1) = if a.1 <= b.1 { (a.1, b.1) } else { (b.1, a.1) };
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Top edge.
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Area of the rectangle.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Center point.
    pub fn center(&self) -> Point {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns true if either extent is (numerically) zero or negative.
    pub fn is_empty(&self) -> bool {
        self.width <= EPS || self.height <= EPS
    }

    /// Returns true if the point lies inside or on the border.
    pub fn contains_point(&self, p: Point) -> bool {
        p.0 >= self.x - EPS && p.0 <= self.right() + EPS && p.1 >= self.y - EPS && p.1 <= self.top() + EPS
    }

    /// Returns true if `other` lies entirely within this rectangle (within `tol`).
    pub fn contains_rect(&self, other: &Rect, tol: f64) -> bool {
        other.x >= self.x - tol
            && other.y >= self.y - tol
            && other.right() <= self.right() + tol
            && other.top() <= self.top() + tol
    }

    /// Returns true if the interiors overlap. Touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right() - EPS
            && other.x < self.right() - EPS
            && self.y < other.top() - EPS
            && other.y < self.top() - EPS
    }

    /// Intersection rectangle, if the interiors overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.overlaps(other) {
            return None;
        }
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.top().min(other.top());
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Grows the rectangle by `d` on every side (negative `d` shrinks it).
    pub fn inflate(&self, d: f64) -> Rect {
        Rect::new(
            self.x - d,
            self.y - d,
            self.width + 2.0 * d,
            self.height + 2.0 * d,
        )
    }

    /// Shrinks the rectangle by `d` on every side; `None` if nothing remains.
    pub fn inset(&self, d: f64) -> Option<Rect> {
        let r = self.inflate(-d);
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    /// Returns the rectangle moved by `(dx, dy)`.
    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Counter-clockwise corner ring starting at the lower-left corner.
    pub fn to_polygon(&self) -> Vec<Point> {
        vec![
            (self.x, self.y),
            (self.right(), self.y),
            (self.right(), self.top()),
            (self.x, self.top()),
        ]
    }

    /// Shortest distance from the rectangle border to a point outside it (0 inside).
    pub fn distance_to_point(&self, p: Point) -> f64 {
        let dx = (self.x - p.0).max(0.0).max(p.0 - self.right());
        let dy = (self.y - p.1).max(0.0).max(p.1 - self.top());
        (dx * dx + dy * dy).sqrt()
    }

    /// Shortest gap between two rectangles (0 when they touch or overlap).
    pub fn distance_to_rect(&self, other: &Rect) -> f64 {
        let dx = (other.x - self.right()).max(self.x - other.right()).max(0.0);
        let dy = (other.y - self.top()).max(self.y - other.top()).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Euclidean distance between two points.
#[inline]
pub fn point_distance(a: Point, b: Point) -> f64 {
    point_distance_sq(a, b).sqrt()
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn point_distance_sq(a: Point, b: Point) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    dx * dx + dy * dy
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: Point, b: Point, t: f64) -> Point {
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}

/// Unit vector from `a` to `b`, or `None` for coincident points.
pub fn direction(a: Point, b: Point) -> Option<Point> {
    let len = point_distance(a, b);
    if len < EPS {
        None
    } else {
        Some(((b.0 - a.0) / len, (b.1 - a.1) / len))
    }
}

fn to_geo_polygon(points: &[Point]) -> Polygon<f64> {
    Polygon::new(LineString::from(points.to_vec()), vec![])
}

/// Axis-aligned bounding box of a point set.
pub fn polygon_bbox(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
    for &(x, y) in &points[1..] {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Signed area (positive for counter-clockwise rings).
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    to_geo_polygon(points).signed_area()
}

/// Unsigned polygon area.
pub fn polygon_area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

/// Returns true if the ring winds counter-clockwise.
pub fn is_ccw(points: &[Point]) -> bool {
    signed_area(points) > 0.0
}

/// Returns the ring in counter-clockwise order.
pub fn ensure_ccw(points: &[Point]) -> Vec<Point> {
    let mut ring = points.to_vec();
    if !is_ccw(&ring) {
        ring.reverse();
    }
    ring
}

/// Area centroid of the polygon.
pub fn polygon_centroid(points: &[Point]) -> Option<Point> {
    if points.len() < 3 {
        return None;
    }
    to_geo_polygon(points).centroid().map(|p| (p.x(), p.y()))
}

/// Perimeter of the closed ring.
pub fn polygon_perimeter(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| point_distance(points[i], points[(i + 1) % n]))
        .sum()
}

/// Translates every point by `(dx, dy)`.
pub fn translate_polygon(points: &[Point], dx: f64, dy: f64) -> Vec<Point> {
    points.iter().map(|&(x, y)| (x + dx, y + dy)).collect()
}

/// Rotates a shape whose bounding box starts at the origin by 90° counter-clockwise,
/// keeping the rotated bounding box anchored at the origin.
///
/// `height` is the original bounding-box height.
pub fn rotate_polygon_90(points: &[Point], height: f64) -> Vec<Point> {
    points.iter().map(|&(x, y)| (height - y, x)).collect()
}

/// Strict point-in-polygon test (points on the boundary are outside).
pub fn point_in_polygon(points: &[Point], p: Point) -> bool {
    if points.len() < 3 {
        return false;
    }
    to_geo_polygon(points).contains(&geo::Point::new(p.0, p.1))
}

/// Returns true if segments `a0-a1` and `b0-b1` touch or cross.
pub fn segments_intersect(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    let la = Line::new(Coord { x: a0.0, y: a0.1 }, Coord { x: a1.0, y: a1.1 });
    let lb = Line::new(Coord { x: b0.0, y: b0.1 }, Coord { x: b1.0, y: b1.1 });
    la.intersects(&lb)
}

/// Closest point on segment `a-b` to `p`, with its parameter `t` in `[0, 1]`.
pub fn closest_point_on_segment(a: Point, b: Point, p: Point) -> (Point, f64) {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let len_sq = dx * dx + dy * dy;
    if len_sq < EPS * EPS {
        return (a, 0.0);
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    ((a.0 + t * dx, a.1 + t * dy), t)
}

/// Closest point on a closed ring to `p`: `(point, edge_index, t)`.
pub fn closest_point_on_polygon(points: &[Point], p: Point) -> Option<(Point, usize, f64)> {
    let n = points.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some((points[0], 0, 0.0));
    }
    let mut best: Option<(Point, usize, f64)> = None;
    let mut best_d = f64::INFINITY;
    for i in 0..n {
        let (q, t) = closest_point_on_segment(points[i], points[(i + 1) % n], p);
        let d = point_distance_sq(q, p);
        if d < best_d {
            best_d = d;
            best = Some((q, i, t));
        }
    }
    best
}

/// Cumulative perimeter distances: `cumulative[i]` is the distance from vertex 0
/// to vertex `i`; the last entry is the full perimeter.
pub fn cumulative_lengths(points: &[Point]) -> Vec<f64> {
    let n = points.len();
    let mut cumulative = Vec::with_capacity(n + 1);
    cumulative.push(0.0);
    for i in 0..n {
        let len = point_distance(points[i], points[(i + 1) % n]);
        cumulative.push(cumulative[i] + len);
    }
    cumulative
}

/// Point at a given distance along a closed ring, with the edge it lies on.
pub fn point_at_distance(points: &[Point], cumulative: &[f64], dist: f64) -> Option<(Point, usize)> {
    let n = points.len();
    if n < 2 || cumulative.len() != n + 1 {
        return None;
    }
    let perimeter = cumulative[n];
    if perimeter < EPS {
        return Some((points[0], 0));
    }
    let d = dist.rem_euclid(perimeter);
    for i in 0..n {
        if d <= cumulative[i + 1] + EPS {
            let len = cumulative[i + 1] - cumulative[i];
            let t = if len < EPS {
                0.0
            } else {
                ((d - cumulative[i]) / len).clamp(0.0, 1.0)
            };
            return Some((lerp(points[i], points[(i + 1) % n], t), i));
        }
    }
    Some((points[n - 1], n - 1))
}

/// Removes consecutive duplicate vertices (including a duplicated closing vertex).
pub fn dedup_ring(points: &[Point]) -> Vec<Point> {
    let mut ring: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last().map_or(true, |&q| point_distance(p, q) > EPS) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && point_distance(ring[0], ring[ring.len() - 1]) <= EPS {
        ring.pop();
    }
    ring
}

/// Miter offset of a closed ring.
///
/// The ring is normalised to counter-clockwise order first, so a positive
/// distance always grows the shape. Vertex `i` of the result corresponds to
/// vertex `i` of the de-duplicated CCW input. Miter spikes are capped at four
/// times the offset distance.
pub fn offset_polygon(points: &[Point], distance: f64) -> Vec<Point> {
    let ring = ensure_ccw(&dedup_ring(points));
    let n = ring.len();
    if n < 3 || distance.abs() < EPS {
        return ring;
    }

    let normals: Vec<Point> = (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            direction(a, b).map_or((0.0, 0.0), |(dx, dy)| (dy, -dx))
        })
        .collect();

    (0..n)
        .map(|i| {
            let n1 = normals[(i + n - 1) % n];
            let n2 = normals[i];
            let denom = 1.0 + n1.0 * n2.0 + n1.1 * n2.1;
            let (mx, my) = (n1.0 + n2.0, n1.1 + n2.1);
            let v = ring[i];
            if denom < 1.0 / 8.0 {
                let len = (mx * mx + my * my).sqrt();
                if len < EPS {
                    return (v.0 + n2.0 * distance, v.1 + n2.1 * distance);
                }
                let cap = 4.0 * distance;
                return (v.0 + mx / len * cap, v.1 + my / len * cap);
            }
            (v.0 + distance * mx / denom, v.1 + distance * my / denom)
        })
        .collect()
}

/// Number of chords needed so that a `sweep` (radians) arc of `radius`
/// stays within `tolerance` of the true arc.
pub fn arc_segment_count(radius: f64, sweep: f64, tolerance: f64) -> usize {
    let sweep = sweep.abs();
    if radius <= EPS || sweep <= EPS {
        return 1;
    }
    let tol = tolerance.max(1e-4).min(radius);
    let max_step = 2.0 * (1.0 - tol / radius).acos();
    if !max_step.is_finite() || max_step <= EPS {
        return 64;
    }
    ((sweep / max_step).ceil() as usize).clamp(2, 720)
}

/// Tessellates an arc into `segments` chords.
///
/// Returns `segments + 1` points from the start angle to `start_angle + sweep`
/// (positive sweep is counter-clockwise).
pub fn tessellate_arc(
    center: Point,
    radius: f64,
    start_angle: f64,
    sweep: f64,
    segments: usize,
) -> Vec<Point> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let a = start_angle + sweep * i as f64 / segments as f64;
            (center.0 + radius * a.cos(), center.1 + radius * a.sin())
        })
        .collect()
}

/// A drawing primitive to be chained into outlines.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Segment {
    /// Straight line between two points.
    Line {
        /// Start point.
        start: Point,
        /// End point.
        end: Point,
    },
    /// Circular arc; positive sweep is counter-clockwise.
    Arc {
        /// Arc center.
        center: Point,
        /// Arc radius.
        radius: f64,
        /// Start angle in radians.
        start_angle: f64,
        /// Signed sweep in radians.
        sweep: f64,
    },
}

impl Segment {
    /// First point of the segment.
    pub fn start(&self) -> Point {
        match *self {
            Segment::Line { start, .. } => start,
            Segment::Arc {
                center,
                radius,
                start_angle,
                ..
            } => (
                center.0 + radius * start_angle.cos(),
                center.1 + radius * start_angle.sin(),
            ),
        }
    }

    /// Last point of the segment.
    pub fn end(&self) -> Point {
        match *self {
            Segment::Line { end, .. } => end,
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => {
                let a = start_angle + sweep;
                (center.0 + radius * a.cos(), center.1 + radius * a.sin())
            }
        }
    }

    /// Polyline approximation from start to end.
    pub fn points(&self, tolerance: f64) -> Vec<Point> {
        match *self {
            Segment::Line { start, end } => vec![start, end],
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => {
                let n = arc_segment_count(radius, sweep, tolerance);
                tessellate_arc(center, radius, start_angle, sweep, n)
            }
        }
    }
}

/// Polyline produced by [`chain_segments`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChainedPath {
    /// Vertices in traversal order (closing vertex omitted for closed paths).
    pub points: Vec<Point>,
    /// Whether the chain returns to its starting point.
    pub closed: bool,
}

/// Disjoint-set forest over endpoint indices.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Chains unordered lines and arcs into polylines.
///
/// Endpoints closer than `tolerance` are merged with a union-find over
/// indexed endpoints (segment `i` owns endpoints `2i` and `2i + 1`); the
/// chains are then walked over the resulting endpoint adjacency. Segments
/// are reversed where needed so each chain is traversed head to tail.
///
/// An open chain is oriented so that its lowest-index segment keeps its
/// drawn direction. A closed loop keeps the direction of the segment it is
/// entered from.
pub fn chain_segments(segments: &[Segment], tolerance: f64) -> Vec<ChainedPath> {
    let n = segments.len();
    if n == 0 {
        return Vec::new();
    }

    let endpoints: Vec<Point> = segments.iter().flat_map(|s| [s.start(), s.end()]).collect();

    // Sweep along x so only nearby endpoints are compared.
    let mut sorted: Vec<usize> = (0..endpoints.len()).collect();
    sorted.sort_by(|&a, &b| endpoints[a].0.total_cmp(&endpoints[b].0));
    let mut sets = DisjointSet::new(endpoints.len());
    for (k, &i) in sorted.iter().enumerate() {
        for &j in &sorted[k + 1..] {
            if endpoints[j].0 - endpoints[i].0 > tolerance {
                break;
            }
            if point_distance(endpoints[i], endpoints[j]) <= tolerance {
                sets.union(i, j);
            }
        }
    }

    // node -> incident segments
    let nodes: Vec<usize> = (0..endpoints.len()).map(|i| sets.find(i)).collect();
    let mut incident: std::collections::HashMap<usize, Vec<usize>> =
        std::collections::HashMap::new();
    for seg in 0..n {
        incident.entry(nodes[2 * seg]).or_default().push(seg);
        incident.entry(nodes[2 * seg + 1]).or_default().push(seg);
    }

    let mut used = vec![false; n];
    let mut paths = Vec::new();

    // Open chains first (start at nodes of odd degree), then closed loops.
    let mut starts: Vec<usize> = (0..n).collect();
    starts.sort_by_key(|&s| {
        let deg_start = incident.get(&nodes[2 * s]).map_or(0, |v| v.len());
        let deg_end = incident.get(&nodes[2 * s + 1]).map_or(0, |v| v.len());
        if deg_start % 2 == 1 || deg_end % 2 == 1 {
            0
        } else {
            1
        }
    });

    for first in starts {
        if used[first] {
            continue;
        }
        used[first] = true;

        // Orient the first segment so an open chain starts at its free end.
        let start_deg = incident.get(&nodes[2 * first]).map_or(0, |v| v.len());
        let end_deg = incident.get(&nodes[2 * first + 1]).map_or(0, |v| v.len());
        let reversed_first = start_deg != 1 && end_deg == 1;

        let mut points = oriented_points(&segments[first], reversed_first, tolerance);
        let origin = if reversed_first {
            nodes[2 * first + 1]
        } else {
            nodes[2 * first]
        };
        let mut tail = if reversed_first {
            nodes[2 * first]
        } else {
            nodes[2 * first + 1]
        };

        let mut lowest = (first, reversed_first);
        loop {
            let next = incident
                .get(&tail)
                .and_then(|segs| segs.iter().copied().find(|&s| !used[s]));
            let Some(seg) = next else { break };
            used[seg] = true;
            let reversed = nodes[2 * seg] != tail;
            if seg < lowest.0 {
                lowest = (seg, reversed);
            }
            let pts = oriented_points(&segments[seg], reversed, tolerance);
            points.extend(pts.into_iter().skip(1));
            tail = if reversed {
                nodes[2 * seg]
            } else {
                nodes[2 * seg + 1]
            };
        }

        let closed = tail == origin && points.len() > 2;
        if closed {
            points.pop();
        } else if lowest.1 {
            points.reverse();
        }
        paths.push(ChainedPath { points, closed });
    }

    paths
}

fn oriented_points(segment: &Segment, reversed: bool, tolerance: f64) -> Vec<Point> {
    let mut pts = segment.points(tolerance);
    if reversed {
        pts.reverse();
    }
    pts
}
