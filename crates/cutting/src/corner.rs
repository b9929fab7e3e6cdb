//! Interior-corner relief.
//!
//! A round cutter running outside a part leaves a fillet of its radius in
//! every reflex (inward) corner. A relief excursion pushes the tool center
//! toward the sharp corner and back:
//!
//! - **DogBone**: along the corner bisector until the cutter touches the
//!   corner point
//! - **TBone**: perpendicular to the incoming side, until the cutter edge
//!   reaches the corner on the outgoing side's line

use u_cutlist_core::geometry::{point_distance, Point, EPS};
use u_cutlist_core::CornerOvercut;

use crate::contour::CutContour;

/// Relief excursion at one path vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Relief {
    /// Path vertex index the excursion starts and ends at.
    pub vertex: usize,
    /// Distance of the vertex along the path.
    pub distance: f64,
    /// Excursion points; the last point is the vertex again.
    pub points: Vec<Point>,
}

/// Computes relief excursions for every reflex corner of a contour.
pub fn corner_reliefs(contour: &CutContour, style: CornerOvercut, tool_radius: f64) -> Vec<Relief> {
    if style == CornerOvercut::None || tool_radius <= EPS {
        return Vec::new();
    }
    contour
        .reflex_vertices()
        .into_iter()
        .filter_map(|i| {
            let target = relief_target(contour, i, style, tool_radius)?;
            let vertex = contour.path[i];
            if point_distance(vertex, target) <= EPS {
                return None;
            }
            Some(Relief {
                vertex: i,
                distance: contour.vertex_distance(i),
                points: vec![target, vertex],
            })
        })
        .collect()
}

/// Tool-center target of the excursion at vertex `i`.
fn relief_target(contour: &CutContour, i: usize, style: CornerOvercut, r: f64) -> Option<Point> {
    let corner = contour.boundary[i];
    let vertex = contour.path[i];
    match style {
        CornerOvercut::None => None,
        CornerOvercut::DogBone => {
            let d = point_distance(corner, vertex);
            if d <= r + EPS {
                return None;
            }
            let k = r / d;
            Some((
                corner.0 + (vertex.0 - corner.0) * k,
                corner.1 + (vertex.1 - corner.1) * k,
            ))
        }
        CornerOvercut::TBone => {
            let n2 = contour.waste_normal(i);
            Some((corner.0 + n2.0 * r, corner.1 + n2.1 * r))
        }
    }
}
