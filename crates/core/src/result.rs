//! Optimization result representation.

use crate::geometry::{Point, Rect, EPS};
use crate::part::{Grain, Rotation};
use crate::solver::Algorithm;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A part instance placed on a sheet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlacedPart {
    /// Index into the part list.
    pub part_index: usize,
    /// Part identifier.
    pub part_id: String,
    /// Copy number within the part's quantity.
    pub instance: u32,
    /// Index of the sheet layout holding this part.
    pub sheet_index: usize,
    /// Lower-left corner of the footprint in sheet coordinates.
    pub x: f64,
    /// Lower-left corner of the footprint in sheet coordinates.
    pub y: f64,
    /// Applied rotation.
    pub rotation: Rotation,
    /// Footprint width after rotation.
    pub width: f64,
    /// Footprint height after rotation.
    pub height: f64,
    /// Material area of the part.
    pub area: f64,
}

impl PlacedPart {
    /// Footprint in sheet coordinates.
    pub fn bbox(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// One straight saw line recorded by the guillotine packer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GuillotineCut {
    /// Start of the cut line.
    pub start: Point,
    /// End of the cut line.
    pub end: Point,
}

impl GuillotineCut {
    /// Length of the cut.
    pub fn length(&self) -> f64 {
        crate::geometry::point_distance(self.start, self.end)
    }

    /// Returns true for a cut parallel to the X axis.
    pub fn is_horizontal(&self) -> bool {
        (self.start.1 - self.end.1).abs() < EPS
    }
}

/// One used stock sheet instance and everything placed on it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SheetLayout {
    /// Index into the stock list.
    pub stock_index: usize,
    /// Stock identifier.
    pub stock_id: String,
    /// Stock display name.
    pub stock_label: String,
    /// Copy number within the stock's quantity.
    pub instance: u32,
    /// Sheet width.
    pub width: f64,
    /// Sheet height.
    pub height: f64,
    /// Sheet grain.
    pub grain: Grain,
    /// Sheet price.
    pub price: f64,
    /// Usable area after edge trim.
    pub usable: Rect,
    /// Placed parts.
    pub placements: Vec<PlacedPart>,
    /// Sheet area not covered by parts or kerf channels.
    pub waste_area: f64,
    /// Area of kerf channels between adjacent parts.
    pub kerf_loss: f64,
    /// Saw lines, in the order they were made.
    pub cuts: Vec<GuillotineCut>,
}

impl SheetLayout {
    /// Full sheet area.
    pub fn sheet_area(&self) -> f64 {
        self.width * self.height
    }

    /// Total material area of the placed parts.
    pub fn parts_area(&self) -> f64 {
        self.placements.iter().map(|p| p.area).sum()
    }

    /// Fraction of the sheet covered by parts.
    pub fn utilization(&self) -> f64 {
        let area = self.sheet_area();
        if area > 0.0 {
            self.parts_area() / area
        } else {
            0.0
        }
    }

    /// Total length of recorded saw lines.
    pub fn cut_length(&self) -> f64 {
        self.cuts.iter().map(GuillotineCut::length).sum()
    }

    /// Recomputes kerf loss and waste from the placements.
    ///
    /// Kerf loss is the channel area between pairs of parts whose facing
    /// edges are exactly one kerf apart and whose extents overlap. Waste is
    /// whatever remains of the sheet area.
    pub fn finalize(&mut self, kerf: f64) {
        self.kerf_loss = kerf_channel_area(&self.placements, kerf);
        self.waste_area = (self.sheet_area() - self.parts_area() - self.kerf_loss).max(0.0);
    }
}

fn kerf_channel_area(placements: &[PlacedPart], kerf: f64) -> f64 {
    if kerf <= 0.0 {
        return 0.0;
    }
    let tol = 1e-6_f64.max(kerf * 1e-6);
    let mut loss = 0.0;
    for (i, a) in placements.iter().enumerate() {
        let ra = a.bbox();
        for b in &placements[i + 1..] {
            let rb = b.bbox();
            let overlap_y = ra.top().min(rb.top()) - ra.y.max(rb.y);
            let overlap_x = ra.right().min(rb.right()) - ra.x.max(rb.x);
            let gap_x = (rb.x - ra.right()).max(ra.x - rb.right());
            let gap_y = (rb.y - ra.top()).max(ra.y - rb.top());
            if overlap_y > EPS && (gap_x - kerf).abs() < tol {
                loss += kerf * overlap_y;
            } else if overlap_x > EPS && (gap_y - kerf).abs() < tol {
                loss += kerf * overlap_x;
            }
        }
    }
    loss
}

/// Why a part instance could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnplaceReason {
    /// Larger than the usable area of every compatible sheet type in every allowed rotation.
    TooLarge,
    /// No sheet type carries a compatible material.
    MaterialMismatch,
    /// Would fit, but the sheet supply ran out.
    OutOfStock,
}

impl std::fmt::Display for UnplaceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            UnplaceReason::TooLarge => "too large for any sheet",
            UnplaceReason::MaterialMismatch => "no sheet of matching material",
            UnplaceReason::OutOfStock => "out of stock",
        };
        f.write_str(text)
    }
}

/// A part instance the packer could not place.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnplacedPart {
    /// Index into the part list.
    pub part_index: usize,
    /// Part identifier.
    pub part_id: String,
    /// Copy number within the part's quantity.
    pub instance: u32,
    /// Reason.
    pub reason: UnplaceReason,
}

/// Aggregate statistics of a result.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    /// Sheets used.
    pub sheets_used: usize,
    /// Part instances placed.
    pub parts_placed: usize,
    /// Part instances not placed.
    pub parts_unplaced: usize,
    /// Σ part area / Σ sheet area over used sheets.
    pub utilization: f64,
    /// Σ waste area.
    pub total_waste: f64,
    /// Σ kerf loss.
    pub total_kerf_loss: f64,
    /// Σ price of used sheets.
    pub total_cost: f64,
    /// Σ saw-line length.
    pub total_cut_length: f64,
    /// Cut length at feed rate plus handling time per part, in minutes.
    pub estimated_minutes: f64,
}

/// Result of an optimization run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationResult {
    /// Used sheets in opening order.
    pub sheets: Vec<SheetLayout>,
    /// Part instances that could not be placed.
    pub unplaced: Vec<UnplacedPart>,
    /// Algorithm that produced the layout.
    pub algorithm: Algorithm,
    /// Generations run (0 for the guillotine packer).
    pub generations: u32,
    /// Fitness of the returned layout.
    pub best_fitness: f64,
    /// Best fitness per generation.
    pub fitness_history: Vec<f64>,
    /// Whether the run was cancelled early.
    pub cancelled: bool,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u64,
    /// Aggregate statistics.
    pub summary: Summary,
}

impl OptimizationResult {
    /// Creates an empty result for `algorithm`.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            sheets: Vec::new(),
            unplaced: Vec::new(),
            algorithm,
            generations: 0,
            best_fitness: 0.0,
            fitness_history: Vec::new(),
            cancelled: false,
            elapsed_ms: 0,
            summary: Summary::default(),
        }
    }

    /// Returns true if every part instance was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Number of placed part instances.
    pub fn placed_count(&self) -> usize {
        self.sheets.iter().map(|s| s.placements.len()).sum()
    }

    /// Iterates over every placement.
    pub fn placements(&self) -> impl Iterator<Item = &PlacedPart> {
        self.sheets.iter().flat_map(|s| s.placements.iter())
    }

    /// Recomputes [`Summary`]; job time uses `feed_rate` in mm/min.
    pub fn compute_summary(&mut self, feed_rate: f64) {
        let sheet_area: f64 = self.sheets.iter().map(SheetLayout::sheet_area).sum();
        let parts_area: f64 = self.sheets.iter().map(SheetLayout::parts_area).sum();
        let total_cut_length: f64 = self.sheets.iter().map(SheetLayout::cut_length).sum();
        let parts_placed = self.placed_count();
        self.summary = Summary {
            sheets_used: self.sheets.len(),
            parts_placed,
            parts_unplaced: self.unplaced.len(),
            utilization: if sheet_area > 0.0 {
                parts_area / sheet_area
            } else {
                0.0
            },
            total_waste: self.sheets.iter().map(|s| s.waste_area).sum(),
            total_kerf_loss: self.sheets.iter().map(|s| s.kerf_loss).sum(),
            total_cost: self.sheets.iter().map(|s| s.price).sum(),
            total_cut_length,
            estimated_minutes: estimate_minutes(total_cut_length, parts_placed, feed_rate),
        };
    }

    /// Utilization as a percentage string.
    pub fn utilization_percent(&self) -> String {
        format!("{:.1}%", self.summary.utilization * 100.0)
    }
}

/// Rough job time: cut length at `feed_rate` plus a fixed handling time per part.
pub fn estimate_minutes(cut_length: f64, parts: usize, feed_rate: f64) -> f64 {
    const HANDLING_MINUTES_PER_PART: f64 = 0.05;
    let cutting = if feed_rate > 0.0 {
        cut_length / feed_rate
    } else {
        0.0
    };
    cutting + parts as f64 * HANDLING_MINUTES_PER_PART
}
