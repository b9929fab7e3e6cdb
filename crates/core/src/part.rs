//! Part and stock sheet model.
//!
//! [`Part`] and [`StockSheet`] are the records handed to the engine. Before
//! packing they are expanded into one [`PartInstance`] / [`SheetInstance`]
//! per unit of quantity.

use crate::error::{Error, Result};
use crate::geometry::{self, chain_segments, Point, Rect, Segment};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Grain direction of a part or sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Grain {
    /// No grain; any orientation is allowed.
    #[default]
    None,
    /// Grain runs along the X axis (width).
    Horizontal,
    /// Grain runs along the Y axis (height).
    Vertical,
}

impl Grain {
    /// Returns true if the grain constrains orientation.
    pub fn is_directional(self) -> bool {
        !matches!(self, Grain::None)
    }

    /// Grain direction after a 90° rotation.
    pub fn rotated(self) -> Grain {
        match self {
            Grain::None => Grain::None,
            Grain::Horizontal => Grain::Vertical,
            Grain::Vertical => Grain::Horizontal,
        }
    }
}

/// Placement rotation. Only quarter turns are produced by the packers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rotation {
    /// As designed.
    #[default]
    Deg0,
    /// Rotated 90° counter-clockwise.
    Deg90,
}

impl Rotation {
    /// Rotation angle in degrees.
    pub fn degrees(self) -> f64 {
        match self {
            Rotation::Deg0 => 0.0,
            Rotation::Deg90 => 90.0,
        }
    }

    /// Returns true for a quarter turn.
    pub fn is_rotated(self) -> bool {
        matches!(self, Rotation::Deg90)
    }

    /// The other rotation.
    pub fn flipped(self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg0,
        }
    }

    /// Footprint `(width, height)` of a `w × h` part under this rotation.
    pub fn apply(self, w: f64, h: f64) -> (f64, f64) {
        match self {
            Rotation::Deg0 => (w, h),
            Rotation::Deg90 => (h, w),
        }
    }
}

/// Rotations a part may take on a sheet.
///
/// A grained part on a grained sheet must keep its grain aligned with the
/// sheet: unrotated when the directions agree, a quarter turn when they are
/// crossed. Otherwise both orientations are allowed, the designed one first.
pub fn allowed_rotations(part_grain: Grain, sheet_grain: Grain) -> &'static [Rotation] {
    if !part_grain.is_directional() || !sheet_grain.is_directional() {
        &[Rotation::Deg0, Rotation::Deg90]
    } else if part_grain == sheet_grain {
        &[Rotation::Deg0]
    } else {
        &[Rotation::Deg90]
    }
}

/// Returns true if a part with tag `part` may be cut from a sheet with tag `sheet`.
///
/// Empty tags match anything; otherwise the comparison ignores ASCII case.
pub fn materials_match(part: &str, sheet: &str) -> bool {
    let (p, s) = (part.trim(), sheet.trim());
    p.is_empty() || s.is_empty() || p.eq_ignore_ascii_case(s)
}

/// Edge-banding flags per side of a part (in design orientation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeBanding {
    /// Band the top edge.
    pub top: bool,
    /// Band the bottom edge.
    pub bottom: bool,
    /// Band the left edge.
    pub left: bool,
    /// Band the right edge.
    pub right: bool,
}

impl EdgeBanding {
    /// All four sides banded.
    pub fn all() -> Self {
        Self {
            top: true,
            bottom: true,
            left: true,
            right: true,
        }
    }

    /// Number of banded sides.
    pub fn count(&self) -> usize {
        [self.top, self.bottom, self.left, self.right]
            .iter()
            .filter(|&&b| b)
            .count()
    }

    /// Total banded edge length for a `width × height` part.
    pub fn length(&self, width: f64, height: f64) -> f64 {
        let mut len = 0.0;
        if self.top {
            len += width;
        }
        if self.bottom {
            len += width;
        }
        if self.left {
            len += height;
        }
        if self.right {
            len += height;
        }
        len
    }
}

/// Closed part outline, normalised to counter-clockwise order with its
/// bounding box anchored at the origin.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<Point>", into = "Vec<Point>"))]
pub struct Outline {
    points: Vec<Point>,
}

impl TryFrom<Vec<Point>> for Outline {
    type Error = Error;

    fn try_from(points: Vec<Point>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<Outline> for Vec<Point> {
    fn from(outline: Outline) -> Self {
        outline.points
    }
}

impl Outline {
    /// Builds an outline from a closed ring of points.
    pub fn new(points: Vec<Point>) -> Result<Self> {
        let ring = geometry::ensure_ccw(&geometry::dedup_ring(&points));
        if ring.len() < 3 {
            return Err(Error::invalid("outline needs at least 3 distinct points"));
        }
        if geometry::polygon_area(&ring) <= geometry::EPS {
            return Err(Error::invalid("outline has zero area"));
        }
        let bbox = geometry::polygon_bbox(&ring)
            .ok_or_else(|| Error::invalid("outline has no bounding box"))?;
        Ok(Self {
            points: geometry::translate_polygon(&ring, -bbox.x, -bbox.y),
        })
    }

    /// Builds an outline from unordered line and arc segments.
    ///
    /// Segments are chained with endpoint `tolerance`; the closed chain with
    /// the largest area becomes the outline.
    pub fn from_segments(segments: &[Segment], tolerance: f64) -> Result<Self> {
        let best = chain_segments(segments, tolerance)
            .into_iter()
            .filter(|path| path.closed)
            .max_by(|a, b| {
                geometry::polygon_area(&a.points).total_cmp(&geometry::polygon_area(&b.points))
            })
            .ok_or_else(|| Error::invalid("segments do not form a closed outline"))?;
        Self::new(best.points)
    }

    /// Outline vertices.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Bounding-box width.
    pub fn width(&self) -> f64 {
        self.bbox().width
    }

    /// Bounding-box height.
    pub fn height(&self) -> f64 {
        self.bbox().height
    }

    /// Bounding box (anchored at the origin).
    pub fn bbox(&self) -> Rect {
        geometry::polygon_bbox(&self.points).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Enclosed area.
    pub fn area(&self) -> f64 {
        geometry::polygon_area(&self.points)
    }

    /// Outline placed on a sheet at `(x, y)` under `rotation`.
    pub fn placed(&self, x: f64, y: f64, rotation: Rotation) -> Vec<Point> {
        let local = match rotation {
            Rotation::Deg0 => self.points.clone(),
            Rotation::Deg90 => geometry::rotate_polygon_90(&self.points, self.height()),
        };
        geometry::translate_polygon(&local, x, y)
    }
}

/// A required part.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Part {
    /// Caller-assigned identifier.
    pub id: String,
    /// Display label.
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: String,
    /// Width (X extent in design orientation).
    pub width: f64,
    /// Height (Y extent in design orientation).
    pub height: f64,
    /// Optional non-rectangular outline; `width`/`height` then hold its bounding box.
    #[cfg_attr(feature = "serde", serde(default))]
    pub outline: Option<Outline>,
    /// Number of identical copies required.
    #[cfg_attr(feature = "serde", serde(default = "default_quantity"))]
    pub quantity: u32,
    /// Grain direction.
    #[cfg_attr(feature = "serde", serde(default))]
    pub grain: Grain,
    /// Material tag; empty matches any sheet.
    #[cfg_attr(feature = "serde", serde(default))]
    pub material: String,
    /// Edge-banding flags.
    #[cfg_attr(feature = "serde", serde(default))]
    pub edge_banding: EdgeBanding,
}

#[cfg(feature = "serde")]
fn default_quantity() -> u32 {
    1
}

impl Part {
    /// Creates a rectangular part with quantity 1.
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            width,
            height,
            outline: None,
            quantity: 1,
            grain: Grain::None,
            material: String::new(),
            edge_banding: EdgeBanding::default(),
        }
    }

    /// Creates a part from an outline; the bounding box becomes its size.
    pub fn from_outline(id: impl Into<String>, outline: Outline) -> Self {
        let bbox = outline.bbox();
        let mut part = Self::new(id, bbox.width, bbox.height);
        part.outline = Some(outline);
        part
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Sets the grain direction.
    pub fn with_grain(mut self, grain: Grain) -> Self {
        self.grain = grain;
        self
    }

    /// Sets the material tag.
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = material.into();
        self
    }

    /// Sets the edge-banding flags.
    pub fn with_edge_banding(mut self, banding: EdgeBanding) -> Self {
        self.edge_banding = banding;
        self
    }

    /// Material area of one instance (outline area for shaped parts).
    pub fn area(&self) -> f64 {
        match &self.outline {
            Some(outline) => outline.area(),
            None => self.width * self.height,
        }
    }

    /// Label if set, otherwise the id.
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }

    /// Rejects non-positive dimensions and zero quantity.
    pub fn validate(&self) -> Result<()> {
        if !(self.width > 0.0 && self.width.is_finite()) || !(self.height > 0.0 && self.height.is_finite()) {
            return Err(Error::invalid(format!(
                "part '{}' has non-positive size {}x{}",
                self.id, self.width, self.height
            )));
        }
        if self.quantity == 0 {
            return Err(Error::invalid(format!("part '{}' has quantity 0", self.id)));
        }
        Ok(())
    }
}

/// An available stock sheet type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StockSheet {
    /// Caller-assigned identifier.
    pub id: String,
    /// Display label.
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: String,
    /// Sheet width.
    pub width: f64,
    /// Sheet height.
    pub height: f64,
    /// Number of sheets available.
    #[cfg_attr(feature = "serde", serde(default = "default_quantity"))]
    pub quantity: u32,
    /// Grain direction.
    #[cfg_attr(feature = "serde", serde(default))]
    pub grain: Grain,
    /// Material tag; empty accepts any part.
    #[cfg_attr(feature = "serde", serde(default))]
    pub material: String,
    /// Price of one sheet.
    #[cfg_attr(feature = "serde", serde(default))]
    pub price: f64,
}

impl StockSheet {
    /// Creates a sheet type with quantity 1 and no price.
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            width,
            height,
            quantity: 1,
            grain: Grain::None,
            material: String::new(),
            price: 0.0,
        }
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Sets the grain direction.
    pub fn with_grain(mut self, grain: Grain) -> Self {
        self.grain = grain;
        self
    }

    /// Sets the material tag.
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = material.into();
        self
    }

    /// Sets the price per sheet.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Sheet area.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Label if set, otherwise the id.
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }

    /// Rejects non-positive dimensions, zero quantity and negative prices.
    pub fn validate(&self) -> Result<()> {
        if !(self.width > 0.0 && self.width.is_finite()) || !(self.height > 0.0 && self.height.is_finite()) {
            return Err(Error::invalid(format!(
                "stock '{}' has non-positive size {}x{}",
                self.id, self.width, self.height
            )));
        }
        if self.quantity == 0 {
            return Err(Error::invalid(format!("stock '{}' has quantity 0", self.id)));
        }
        if self.price < 0.0 {
            return Err(Error::invalid(format!("stock '{}' has negative price", self.id)));
        }
        Ok(())
    }
}

/// One unit of a [`Part`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartInstance {
    /// Index into the part list.
    pub part_index: usize,
    /// Copy number (0-based) within the part's quantity.
    pub instance: u32,
    /// Design width.
    pub width: f64,
    /// Design height.
    pub height: f64,
    /// Material area.
    pub area: f64,
    /// Grain direction.
    pub grain: Grain,
}

impl PartInstance {
    /// Bounding-box area used for placement priority.
    pub fn footprint(&self) -> f64 {
        self.width * self.height
    }
}

/// One unit of a [`StockSheet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetInstance {
    /// Index into the stock list.
    pub stock_index: usize,
    /// Copy number (0-based) within the stock's quantity.
    pub instance: u32,
}

/// Expands parts into instances, in part order then copy order.
pub fn expand_parts(parts: &[Part]) -> Vec<PartInstance> {
    parts
        .iter()
        .enumerate()
        .flat_map(|(part_index, part)| {
            let area = part.area();
            (0..part.quantity).map(move |instance| PartInstance {
                part_index,
                instance,
                width: part.width,
                height: part.height,
                area,
                grain: part.grain,
            })
        })
        .collect()
}

/// Expands stock sheets into instances, in stock order then copy order.
pub fn expand_stocks(stocks: &[StockSheet]) -> Vec<SheetInstance> {
    stocks
        .iter()
        .enumerate()
        .flat_map(|(stock_index, stock)| {
            (0..stock.quantity).map(move |instance| SheetInstance {
                stock_index,
                instance,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_rotations_grain_rules() {
        assert_eq!(
            allowed_rotations(Grain::None, Grain::Horizontal),
            &[Rotation::Deg0, Rotation::Deg90]
        );
        assert_eq!(
            allowed_rotations(Grain::Vertical, Grain::None),
            &[Rotation::Deg0, Rotation::Deg90]
        );
        assert_eq!(
            allowed_rotations(Grain::Horizontal, Grain::Horizontal),
            &[Rotation::Deg0]
        );
        assert_eq!(
            allowed_rotations(Grain::Horizontal, Grain::Vertical),
            &[Rotation::Deg90]
        );
    }

    #[test]
    fn test_rotation_apply() {
        assert_eq!(Rotation::Deg0.apply(600.0, 300.0), (600.0, 300.0));
        assert_eq!(Rotation::Deg90.apply(600.0, 300.0), (300.0, 600.0));
        assert_eq!(Rotation::Deg90.flipped(), Rotation::Deg0);
        assert_eq!(Grain::Horizontal.rotated(), Grain::Vertical);
    }

    #[test]
    fn test_materials_match() {
        assert!(materials_match("", "Birch"));
        assert!(materials_match("MDF", ""));
        assert!(materials_match("birch ply", "Birch Ply"));
        assert!(!materials_match("MDF", "Birch"));
    }

    #[test]
    fn test_part_validation() {
        assert!(Part::new("P1", 100.0, 50.0).validate().is_ok());
        assert!(Part::new("P2", 0.0, 50.0).validate().is_err());
        assert!(Part::new("P3", 100.0, -1.0).validate().is_err());
        assert!(Part::new("P4", 100.0, 50.0)
            .with_quantity(0)
            .validate()
            .is_err());
        assert!(Part::new("P5", f64::NAN, 50.0).validate().is_err());
    }

    #[test]
    fn test_stock_validation() {
        assert!(StockSheet::new("S1", 2440.0, 1220.0).validate().is_ok());
        assert!(StockSheet::new("S2", 2440.0, 0.0).validate().is_err());
        assert!(StockSheet::new("S3", 2440.0, 1220.0)
            .with_price(-5.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_outline_normalised() {
        // clockwise, offset from the origin
        let outline = Outline::new(vec![
            (10.0, 10.0),
            (10.0, 30.0),
            (50.0, 30.0),
            (50.0, 10.0),
        ])
        .expect("valid outline");
        assert!(geometry::is_ccw(outline.points()));
        assert_eq!(outline.bbox(), Rect::new(0.0, 0.0, 40.0, 20.0));
        assert!((outline.area() - 800.0).abs() < 1e-9);

        let part = Part::from_outline("shape", outline);
        assert!((part.width - 40.0).abs() < 1e-9);
        assert!((part.height - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_outline_rejects_degenerate() {
        assert!(Outline::new(vec![(0.0, 0.0), (1.0, 1.0)]).is_err());
        assert!(Outline::new(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).is_err());
    }

    #[test]
    fn test_outline_placed_rotated() {
        let outline =
            Outline::new(vec![(0.0, 0.0), (40.0, 0.0), (40.0, 20.0), (0.0, 20.0)]).expect("rect");
        let placed = outline.placed(100.0, 200.0, Rotation::Deg90);
        let bbox = geometry::polygon_bbox(&placed).expect("bbox");
        assert!((bbox.x - 100.0).abs() < 1e-9);
        assert!((bbox.y - 200.0).abs() < 1e-9);
        assert!((bbox.width - 20.0).abs() < 1e-9);
        assert!((bbox.height - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_outline_from_segments() {
        let segments = vec![
            Segment::Line {
                start: (0.0, 0.0),
                end: (30.0, 0.0),
            },
            Segment::Line {
                start: (0.0, 10.0),
                end: (0.0, 0.0),
            },
            Segment::Line {
                start: (30.0, 0.0),
                end: (30.0, 10.0),
            },
            Segment::Line {
                start: (30.0, 10.0),
                end: (0.0, 10.0),
            },
        ];
        let outline = Outline::from_segments(&segments, 1e-6).expect("closed");
        assert!((outline.area() - 300.0).abs() < 1e-9);

        let open = &segments[..3];
        assert!(Outline::from_segments(open, 1e-6).is_err());
    }

    #[test]
    fn test_expand_instances() {
        let parts = vec![
            Part::new("A", 100.0, 50.0).with_quantity(2),
            Part::new("B", 30.0, 30.0),
        ];
        let instances = expand_parts(&parts);
        assert_eq!(instances.len(), 3);
        assert_eq!(instances[1].part_index, 0);
        assert_eq!(instances[1].instance, 1);
        assert_eq!(instances[2].part_index, 1);
        assert!((instances[0].footprint() - 5000.0).abs() < 1e-9);

        let stocks = vec![StockSheet::new("S", 1000.0, 500.0).with_quantity(3)];
        let sheets = expand_stocks(&stocks);
        assert_eq!(sheets.len(), 3);
        assert_eq!(sheets[2].instance, 2);
    }

    #[test]
    fn test_edge_banding_length() {
        let banding = EdgeBanding {
            top: true,
            left: true,
            ..Default::default()
        };
        assert_eq!(banding.count(), 2);
        assert!((banding.length(600.0, 300.0) - 900.0).abs() < 1e-9);
        assert_eq!(EdgeBanding::all().count(), 4);
    }
}
