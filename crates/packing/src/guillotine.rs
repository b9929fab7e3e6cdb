//! Guillotine packer.
//!
//! Sheets are filled one at a time. Each open sheet keeps a list of free
//! rectangles, initially the sheet inset by the edge trim. Parts are taken in
//! priority order (largest footprint first, original order on ties) and put
//! into the free rectangle that leaves the least area over (best-area-fit).
//! The chosen rectangle is then split in two along a full-span cut, with the
//! kerf width left as dead space along each cut line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use u_cutlist_core::geometry::{Rect, EPS};
use u_cutlist_core::part::{
    allowed_rotations, expand_parts, expand_stocks, materials_match, PartInstance, SheetInstance,
};
use u_cutlist_core::{
    Algorithm, GuillotineCut, OptimizationResult, Packer, Part, PlacedPart, ProgressCallback,
    ProgressInfo, Result, Rotation, Settings, SheetLayout, StockSheet, UnplaceReason,
    UnplacedPart,
};

use crate::objective::layout_fitness;

/// Slack allowed when testing whether a part fits a free rectangle.
const FIT_EPS: f64 = 1e-6;

/// A possible position for one part.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    free_index: usize,
    rotation: Rotation,
    width: f64,
    height: f64,
    x: f64,
    y: f64,
    leftover: f64,
    short_side: f64,
}

impl Candidate {
    /// Best-area-fit order: leftover area, then leftover short side, then
    /// lower y, lower x, earlier free rectangle.
    fn better_than(&self, other: &Candidate) -> bool {
        self.leftover
            .total_cmp(&other.leftover)
            .then(self.short_side.total_cmp(&other.short_side))
            .then(self.y.total_cmp(&other.y))
            .then(self.x.total_cmp(&other.x))
            .then(self.free_index.cmp(&other.free_index))
            .is_lt()
    }
}

/// Free space of one open sheet.
#[derive(Debug, Clone)]
pub struct FreeSpace {
    rects: Vec<Rect>,
    kerf: f64,
    merge: bool,
}

impl FreeSpace {
    /// Free space covering `usable`.
    ///
    /// With `merge` set, free rectangles sharing a full edge are joined after
    /// every placement; the layout is then no longer strictly guillotine.
    pub fn new(usable: Rect, kerf: f64, merge: bool) -> Self {
        Self {
            rects: vec![usable],
            kerf,
            merge,
        }
    }

    /// Current free rectangles.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    fn best_fit(&self, width: f64, height: f64, rotations: &[Rotation]) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (free_index, fr) in self.rects.iter().enumerate() {
            for &rotation in rotations {
                let (w, h) = rotation.apply(width, height);
                if w > fr.width + FIT_EPS || h > fr.height + FIT_EPS {
                    continue;
                }
                let candidate = Candidate {
                    free_index,
                    rotation,
                    width: w,
                    height: h,
                    x: fr.x,
                    y: fr.y,
                    leftover: fr.area() - w * h,
                    short_side: (fr.width - w).min(fr.height - h),
                };
                if best.map_or(true, |b| candidate.better_than(&b)) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Occupies the candidate's corner and splits the rest of its free
    /// rectangle. Returns the saw lines made.
    fn place(&mut self, c: &Candidate) -> Vec<GuillotineCut> {
        let fr = self.rects.remove(c.free_index);
        let k = self.kerf;
        let (w, h) = (c.width, c.height);

        let right_w = (fr.width - w - k).max(0.0);
        let top_h = (fr.height - h - k).max(0.0);

        // vertical cut first: right residual spans the full height
        let v_right = Rect::new(fr.x + w + k, fr.y, right_w, fr.height);
        let v_top = Rect::new(fr.x, fr.y + h + k, w, top_h);
        // horizontal cut first: top residual spans the full width
        let h_top = Rect::new(fr.x, fr.y + h + k, fr.width, top_h);
        let h_right = Rect::new(fr.x + w + k, fr.y, right_w, h);

        let v_min = v_right.area().min(v_top.area());
        let h_min = h_top.area().min(h_right.area());
        let vertical_first = v_min < h_min;

        let part_right = fr.x + w;
        let part_top = fr.y + h;
        let has_right = fr.right() - part_right > EPS;
        let has_top = fr.top() - part_top > EPS;
        let cut_x = (part_right + k / 2.0).min(fr.right());
        let cut_y = (part_top + k / 2.0).min(fr.top());

        let mut cuts = Vec::with_capacity(2);
        let residuals = if vertical_first {
            if has_right {
                cuts.push(GuillotineCut {
                    start: (cut_x, fr.y),
                    end: (cut_x, fr.top()),
                });
            }
            if has_top {
                cuts.push(GuillotineCut {
                    start: (fr.x, cut_y),
                    end: (part_right, cut_y),
                });
            }
            [v_right, v_top]
        } else {
            if has_top {
                cuts.push(GuillotineCut {
                    start: (fr.x, cut_y),
                    end: (fr.right(), cut_y),
                });
            }
            if has_right {
                cuts.push(GuillotineCut {
                    start: (cut_x, fr.y),
                    end: (cut_x, part_top),
                });
            }
            [h_right, h_top]
        };

        self.rects
            .extend(residuals.into_iter().filter(|r| !r.is_empty()));
        if self.merge {
            self.merge_adjacent();
        }
        cuts
    }

    fn merge_adjacent(&mut self) {
        loop {
            let mut merged = None;
            'search: for i in 0..self.rects.len() {
                for j in 0..self.rects.len() {
                    if i == j {
                        continue;
                    }
                    if let Some(m) = try_merge(&self.rects[i], &self.rects[j], self.kerf) {
                        merged = Some((i, j, m));
                        break 'search;
                    }
                }
            }
            let Some((i, j, m)) = merged else { break };
            self.rects[i] = m;
            self.rects.remove(j);
        }
    }
}

/// Joins `b` onto `a` when it continues `a` upward or rightward across a gap
/// of at most `gap`, sharing the full edge.
fn try_merge(a: &Rect, b: &Rect, gap: f64) -> Option<Rect> {
    let same_column = (a.x - b.x).abs() < EPS && (a.width - b.width).abs() < EPS;
    let dy = b.y - a.top();
    if same_column && dy > -EPS && dy < gap + EPS {
        return Some(Rect::new(a.x, a.y, a.width, b.top() - a.y));
    }
    let same_row = (a.y - b.y).abs() < EPS && (a.height - b.height).abs() < EPS;
    let dx = b.x - a.right();
    if same_row && dx > -EPS && dx < gap + EPS {
        return Some(Rect::new(a.x, a.y, b.right() - a.x, a.height));
    }
    None
}

/// Sheets and unplaced instances produced by one decoding pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Packing {
    /// Opened sheets in order.
    pub sheets: Vec<SheetLayout>,
    /// Instances left over, in instance order.
    pub unplaced: Vec<UnplacedPart>,
}

impl Packing {
    /// Wraps the packing into an [`OptimizationResult`] with summary and fitness.
    pub fn into_result(self, algorithm: Algorithm, settings: &Settings) -> OptimizationResult {
        let mut result = OptimizationResult::new(algorithm);
        result.best_fitness = layout_fitness(
            &self.sheets,
            self.unplaced.len(),
            &settings.weights,
            settings.tool.feed_rate,
        );
        result.sheets = self.sheets;
        result.unplaced = self.unplaced;
        result.compute_summary(settings.tool.feed_rate);
        result
    }
}

/// Replays the guillotine placement for any instance order.
///
/// Shared by the guillotine packer (priority order) and the population
/// search (genome order and rotation flags).
pub struct LayoutBuilder<'a> {
    parts: &'a [Part],
    stocks: &'a [StockSheet],
    instances: Vec<PartInstance>,
    sheets: Vec<SheetInstance>,
    verdicts: Vec<Option<UnplaceReason>>,
    kerf: f64,
    trim: f64,
    merge: bool,
}

impl<'a> LayoutBuilder<'a> {
    /// Expands the input and classifies instances that can never be placed.
    pub fn new(parts: &'a [Part], stocks: &'a [StockSheet], settings: &Settings) -> Self {
        let mut builder = Self {
            parts,
            stocks,
            instances: expand_parts(parts),
            sheets: expand_stocks(stocks),
            verdicts: Vec::new(),
            kerf: settings.kerf_width,
            trim: settings.edge_trim,
            merge: !settings.guillotine_only,
        };
        builder.verdicts = (0..builder.instances.len())
            .map(|i| builder.infeasibility(i))
            .collect();
        builder
    }

    /// Expanded part instances.
    pub fn instances(&self) -> &[PartInstance] {
        &self.instances
    }

    /// Deterministic priority: largest footprint first, original order on ties.
    pub fn priority_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.instances.len()).collect();
        order.sort_by(|&a, &b| {
            self.instances[b]
                .footprint()
                .total_cmp(&self.instances[a].footprint())
                .then(a.cmp(&b))
        });
        order
    }

    fn usable(&self, stock_index: usize) -> Option<Rect> {
        let stock = &self.stocks[stock_index];
        Rect::new(0.0, 0.0, stock.width, stock.height).inset(self.trim)
    }

    fn compatible(&self, idx: usize, stock_index: usize) -> bool {
        let part = &self.parts[self.instances[idx].part_index];
        materials_match(&part.material, &self.stocks[stock_index].material)
    }

    fn fits_empty(&self, idx: usize, stock_index: usize) -> bool {
        if !self.compatible(idx, stock_index) {
            return false;
        }
        let Some(usable) = self.usable(stock_index) else {
            return false;
        };
        let inst = &self.instances[idx];
        allowed_rotations(inst.grain, self.stocks[stock_index].grain)
            .iter()
            .any(|r| {
                let (w, h) = r.apply(inst.width, inst.height);
                w <= usable.width + FIT_EPS && h <= usable.height + FIT_EPS
            })
    }

    fn infeasibility(&self, idx: usize) -> Option<UnplaceReason> {
        let compatible: Vec<usize> = (0..self.stocks.len())
            .filter(|&s| self.compatible(idx, s))
            .collect();
        if compatible.is_empty() {
            Some(UnplaceReason::MaterialMismatch)
        } else if !compatible.iter().any(|&s| self.fits_empty(idx, s)) {
            Some(UnplaceReason::TooLarge)
        } else {
            None
        }
    }

    fn choose(
        &self,
        space: &FreeSpace,
        idx: usize,
        sheet: &SheetInstance,
        flips: Option<&[bool]>,
    ) -> Option<Candidate> {
        if !self.compatible(idx, sheet.stock_index) {
            return None;
        }
        let inst = &self.instances[idx];
        let rotations = allowed_rotations(inst.grain, self.stocks[sheet.stock_index].grain);
        let best = space.best_fit(inst.width, inst.height, rotations)?;

        // a set flag asks for the orientation best-fit would not pick
        let flip = flips.and_then(|f| f.get(idx).copied()).unwrap_or(false);
        if flip {
            let alternatives: Vec<Rotation> = rotations
                .iter()
                .copied()
                .filter(|&r| r != best.rotation)
                .collect();
            if let Some(alt) = space.best_fit(inst.width, inst.height, &alternatives) {
                return Some(alt);
            }
        }
        Some(best)
    }

    /// Places instances in `order`; `flips` holds an optional rotation flag per instance.
    pub fn build(&self, order: &[usize], flips: Option<&[bool]>) -> Packing {
        let mut remaining: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&i| i < self.instances.len() && self.verdicts[i].is_none())
            .collect();
        let mut layouts = Vec::new();

        for sheet in &self.sheets {
            if remaining.is_empty() {
                break;
            }
            let Some(usable) = self.usable(sheet.stock_index) else {
                continue;
            };
            if !remaining.iter().any(|&i| self.fits_empty(i, sheet.stock_index)) {
                continue;
            }

            let stock = &self.stocks[sheet.stock_index];
            let sheet_index = layouts.len();
            let mut space = FreeSpace::new(usable, self.kerf, self.merge);
            let mut layout = SheetLayout {
                stock_index: sheet.stock_index,
                stock_id: stock.id.clone(),
                stock_label: stock.display_name().to_string(),
                instance: sheet.instance,
                width: stock.width,
                height: stock.height,
                grain: stock.grain,
                price: stock.price,
                usable,
                placements: Vec::new(),
                waste_area: 0.0,
                kerf_loss: 0.0,
                cuts: Vec::new(),
            };

            loop {
                let mut placed_any = false;
                let mut k = 0;
                while k < remaining.len() {
                    let idx = remaining[k];
                    match self.choose(&space, idx, sheet, flips) {
                        Some(c) => {
                            layout.cuts.extend(space.place(&c));
                            layout.placements.push(self.placed(idx, sheet_index, &c));
                            remaining.remove(k);
                            placed_any = true;
                        }
                        None => k += 1,
                    }
                }
                // without merging, free space only shrinks, so one pass is final
                if !placed_any || !self.merge {
                    break;
                }
            }

            layout.finalize(self.kerf);
            layouts.push(layout);
        }

        let mut unplaced: Vec<(usize, UnplaceReason)> = self
            .verdicts
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|reason| (i, reason)))
            .chain(remaining.into_iter().map(|i| (i, UnplaceReason::OutOfStock)))
            .collect();
        unplaced.sort_by_key(|&(i, _)| i);

        Packing {
            sheets: layouts,
            unplaced: unplaced
                .into_iter()
                .map(|(i, reason)| {
                    let inst = &self.instances[i];
                    UnplacedPart {
                        part_index: inst.part_index,
                        part_id: self.parts[inst.part_index].id.clone(),
                        instance: inst.instance,
                        reason,
                    }
                })
                .collect(),
        }
    }

    fn placed(&self, idx: usize, sheet_index: usize, c: &Candidate) -> PlacedPart {
        let inst = &self.instances[idx];
        PlacedPart {
            part_index: inst.part_index,
            part_id: self.parts[inst.part_index].id.clone(),
            instance: inst.instance,
            sheet_index,
            x: c.x,
            y: c.y,
            rotation: c.rotation,
            width: c.width,
            height: c.height,
            area: inst.area,
        }
    }
}

/// Deterministic best-area-fit guillotine packer.
pub struct GuillotinePacker {
    cancelled: Arc<AtomicBool>,
}

impl GuillotinePacker {
    /// Creates a packer with its own cancel flag.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a packer sharing an external cancel flag.
    pub fn with_cancel_flag(cancelled: Arc<AtomicBool>) -> Self {
        Self { cancelled }
    }

    fn run(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        settings: &Settings,
        callback: Option<&ProgressCallback>,
    ) -> OptimizationResult {
        let start = Instant::now();
        let builder = LayoutBuilder::new(parts, stocks, settings);
        let packing = builder.build(&builder.priority_order(), None);

        let mut result = packing.into_result(Algorithm::Guillotine, settings);
        result.cancelled = self.cancelled.load(Ordering::Relaxed);
        result.elapsed_ms = start.elapsed().as_millis() as u64;

        log::info!(
            "guillotine: {} sheet(s), {} placed, {} unplaced, utilization {}",
            result.summary.sheets_used,
            result.summary.parts_placed,
            result.summary.parts_unplaced,
            result.utilization_percent()
        );

        if let Some(cb) = callback {
            cb(ProgressInfo::new()
                .with_fitness(result.best_fitness)
                .with_elapsed(result.elapsed_ms)
                .with_phase("guillotine")
                .finished());
        }
        result
    }
}

impl Default for GuillotinePacker {
    fn default() -> Self {
        Self::new()
    }
}

impl Packer for GuillotinePacker {
    fn pack(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        settings: &Settings,
    ) -> Result<OptimizationResult> {
        Ok(self.run(parts, stocks, settings, None))
    }

    fn pack_with_progress(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        settings: &Settings,
        callback: ProgressCallback,
    ) -> Result<OptimizationResult> {
        Ok(self.run(parts, stocks, settings, Some(&callback)))
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use u_cutlist_core::Grain;

    fn settings(kerf: f64) -> Settings {
        Settings::new().with_kerf(kerf)
    }

    fn pack(parts: &[Part], stocks: &[StockSheet], settings: &Settings) -> OptimizationResult {
        GuillotinePacker::new()
            .pack(parts, stocks, settings)
            .expect("pack")
    }

    fn assert_no_overlap(result: &OptimizationResult, kerf: f64) {
        for sheet in &result.sheets {
            for (i, a) in sheet.placements.iter().enumerate() {
                assert!(
                    sheet.usable.contains_rect(&a.bbox(), 1e-6),
                    "part {} outside usable area",
                    a.part_id
                );
                for b in &sheet.placements[i + 1..] {
                    assert!(
                        !a.bbox().inflate(kerf / 2.0 - 1e-6).overlaps(&b.bbox().inflate(kerf / 2.0 - 1e-6)),
                        "parts {} and {} overlap",
                        a.part_id,
                        b.part_id
                    );
                }
            }
        }
    }

    #[test]
    fn test_single_part_scenario() {
        let parts = vec![Part::new("P1", 600.0, 300.0)];
        let stocks = vec![StockSheet::new("S1", 1200.0, 600.0)];
        let result = pack(&parts, &stocks, &settings(3.0));

        assert_eq!(result.sheets.len(), 1);
        assert_eq!(result.sheets[0].placements.len(), 1);
        assert!(result.unplaced.is_empty());
        let expected = 1200.0 * 600.0 - 600.0 * 300.0;
        assert!((result.sheets[0].waste_area - expected).abs() < 1e-6);
        let p = &result.sheets[0].placements[0];
        assert_eq!((p.x, p.y), (0.0, 0.0));
    }

    #[test]
    fn test_oversized_part_unplaced() {
        let parts = vec![Part::new("BIG", 2000.0, 2000.0)];
        let stocks = vec![StockSheet::new("S1", 1200.0, 600.0).with_quantity(5)];
        let result = pack(&parts, &stocks, &settings(3.0));

        assert!(result.sheets.is_empty());
        assert_eq!(result.unplaced.len(), 1);
        assert_eq!(result.unplaced[0].reason, UnplaceReason::TooLarge);
    }

    #[test]
    fn test_exact_fit_with_kerf() {
        let parts = vec![Part::new("H", 497.0, 500.0).with_quantity(2)];
        let stocks = vec![StockSheet::new("S", 1000.0, 500.0)];
        let result = pack(&parts, &stocks, &settings(6.0));

        assert_eq!(result.sheets.len(), 1);
        let sheet = &result.sheets[0];
        assert_eq!(sheet.placements.len(), 2);
        assert!((sheet.placements[1].x - 503.0).abs() < 1e-9);
        assert!((sheet.kerf_loss - 3000.0).abs() < 1e-9);
        assert!(sheet.waste_area.abs() < 1e-6);
        assert_eq!(sheet.cuts.len(), 1);
    }

    #[test]
    fn test_rotation_used_to_fit() {
        let parts = vec![Part::new("TALL", 500.0, 1100.0)];
        let stocks = vec![StockSheet::new("S", 1200.0, 600.0)];
        let result = pack(&parts, &stocks, &settings(3.0));
        assert_eq!(result.sheets[0].placements[0].rotation, Rotation::Deg90);
        assert!((result.sheets[0].placements[0].width - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn test_flip_flag_relative_to_best_fit() {
        let stocks = vec![StockSheet::new("S", 1200.0, 600.0)];
        let s = settings(3.0);
        let rotation = |parts: &[Part], flip: bool| {
            let builder = LayoutBuilder::new(parts, &stocks, &s);
            let packing = builder.build(&[0], Some(&[flip][..]));
            packing.sheets[0].placements[0].rotation
        };

        // only the turned orientation fits, so the flag cannot undo it
        let tall = vec![Part::new("TALL", 500.0, 1100.0)];
        assert_eq!(rotation(&tall, false), Rotation::Deg90);
        assert_eq!(rotation(&tall, true), Rotation::Deg90);

        let small = vec![Part::new("SMALL", 500.0, 300.0)];
        assert_ne!(rotation(&small, false), rotation(&small, true));
    }

    #[test]
    fn test_grain_forces_orientation() {
        let stocks = vec![StockSheet::new("S", 2000.0, 2000.0).with_grain(Grain::Vertical)];

        let crossed = vec![Part::new("X", 300.0, 200.0).with_grain(Grain::Horizontal)];
        let result = pack(&crossed, &stocks, &settings(3.0));
        assert_eq!(result.sheets[0].placements[0].rotation, Rotation::Deg90);

        let aligned = vec![Part::new("A", 300.0, 200.0).with_grain(Grain::Vertical)];
        let result = pack(&aligned, &stocks, &settings(3.0));
        assert_eq!(result.sheets[0].placements[0].rotation, Rotation::Deg0);

        // grain would require rotation, but rotated it no longer fits
        let stocks = vec![StockSheet::new("S", 1200.0, 600.0).with_grain(Grain::Vertical)];
        let blocked = vec![Part::new("B", 1000.0, 500.0).with_grain(Grain::Horizontal)];
        let result = pack(&blocked, &stocks, &settings(3.0));
        assert_eq!(result.unplaced[0].reason, UnplaceReason::TooLarge);
    }

    #[test]
    fn test_material_mismatch_and_matching() {
        let parts = vec![
            Part::new("M", 100.0, 100.0).with_material("MDF"),
            Part::new("B", 100.0, 100.0).with_material("birch"),
        ];
        let stocks = vec![StockSheet::new("S", 1000.0, 1000.0).with_material("Birch")];
        let result = pack(&parts, &stocks, &settings(3.0));
        assert_eq!(result.placed_count(), 1);
        assert_eq!(result.sheets[0].placements[0].part_id, "B");
        assert_eq!(result.unplaced.len(), 1);
        assert_eq!(result.unplaced[0].part_id, "M");
        assert_eq!(result.unplaced[0].reason, UnplaceReason::MaterialMismatch);
    }

    #[test]
    fn test_out_of_stock() {
        let parts = vec![Part::new("P", 1000.0, 500.0).with_quantity(3)];
        let stocks = vec![StockSheet::new("S", 1200.0, 600.0).with_quantity(2)];
        let result = pack(&parts, &stocks, &settings(3.0));
        assert_eq!(result.sheets.len(), 2);
        assert_eq!(result.unplaced.len(), 1);
        assert_eq!(result.unplaced[0].reason, UnplaceReason::OutOfStock);
        assert_eq!(result.unplaced[0].instance, 2);
    }

    #[test]
    fn test_edge_trim_respected() {
        let parts = vec![Part::new("P", 100.0, 100.0).with_quantity(4)];
        let stocks = vec![StockSheet::new("S", 500.0, 300.0)];
        let result = pack(&parts, &stocks, &settings(4.0).with_edge_trim(10.0));
        let sheet = &result.sheets[0];
        assert_eq!(sheet.usable, Rect::new(10.0, 10.0, 480.0, 280.0));
        for p in &sheet.placements {
            assert!(p.x >= 10.0 - 1e-9 && p.y >= 10.0 - 1e-9);
        }
        assert_no_overlap(&result, 4.0);
    }

    #[test]
    fn test_area_balance_and_no_overlap() {
        let parts = vec![
            Part::new("A", 400.0, 300.0).with_quantity(3),
            Part::new("B", 250.0, 250.0).with_quantity(5),
            Part::new("C", 700.0, 120.0).with_quantity(2),
            Part::new("D", 90.0, 60.0).with_quantity(10),
        ];
        let stocks = vec![StockSheet::new("S", 1220.0, 1000.0).with_quantity(5)];
        let kerf = 4.0;
        let result = pack(&parts, &stocks, &settings(kerf));

        assert!(result.all_placed());
        assert_no_overlap(&result, kerf);
        for sheet in &result.sheets {
            let total = sheet.parts_area() + sheet.waste_area + sheet.kerf_loss;
            assert!((total - sheet.sheet_area()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_deterministic() {
        let parts = vec![
            Part::new("A", 333.0, 211.0).with_quantity(7),
            Part::new("B", 120.0, 480.0).with_quantity(6),
        ];
        let stocks = vec![StockSheet::new("S", 1000.0, 800.0).with_quantity(10)];
        let a = pack(&parts, &stocks, &settings(3.0));
        let b = pack(&parts, &stocks, &settings(3.0));
        assert_eq!(a.sheets, b.sheets);
        assert_eq!(a.unplaced, b.unplaced);
    }

    #[test]
    fn test_priority_largest_first() {
        let parts = vec![Part::new("small", 50.0, 50.0), Part::new("large", 400.0, 400.0)];
        let stocks = vec![StockSheet::new("S", 1000.0, 1000.0)];
        let builder = LayoutBuilder::new(&parts, &stocks, &settings(3.0));
        assert_eq!(builder.priority_order(), vec![1, 0]);
    }

    #[test]
    fn test_merge_mode_keeps_invariants() {
        let parts = vec![
            Part::new("A", 300.0, 200.0).with_quantity(6),
            Part::new("B", 610.0, 90.0).with_quantity(3),
        ];
        let stocks = vec![StockSheet::new("S", 1000.0, 600.0).with_quantity(3)];
        let merged = pack(&parts, &stocks, &settings(5.0).with_guillotine_only(false));
        assert!(merged.all_placed());
        assert_no_overlap(&merged, 5.0);
        for sheet in &merged.sheets {
            let total = sheet.parts_area() + sheet.waste_area + sheet.kerf_loss;
            assert!((total - sheet.sheet_area()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_try_merge_across_kerf_gap() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(0.0, 53.0, 100.0, 20.0);
        let m = try_merge(&a, &b, 3.0).expect("merge");
        assert_eq!(m, Rect::new(0.0, 0.0, 100.0, 73.0));
        assert!(try_merge(&a, &Rect::new(0.0, 60.0, 100.0, 20.0), 3.0).is_none());
        assert!(try_merge(&a, &Rect::new(10.0, 53.0, 90.0, 20.0), 3.0).is_none());
    }

    #[test]
    fn test_skips_sheets_nothing_fits() {
        let parts = vec![Part::new("P", 900.0, 900.0)];
        let stocks = vec![
            StockSheet::new("small", 500.0, 500.0),
            StockSheet::new("large", 1000.0, 1000.0),
        ];
        let result = pack(&parts, &stocks, &settings(3.0));
        assert_eq!(result.sheets.len(), 1);
        assert_eq!(result.sheets[0].stock_id, "large");
        assert_eq!(result.sheets[0].placements[0].sheet_index, 0);
    }
}
