//! Weighted layout objective (lower is better).

use u_cutlist_core::result::estimate_minutes;
use u_cutlist_core::{ObjectiveWeights, SheetLayout};

/// Penalty per unplaced instance; dominates every other term.
pub const UNPLACED_PENALTY: f64 = 1000.0;

/// Scores a layout.
///
/// `waste · (Σ waste / Σ sheet area) + sheets · count + cut_length · metres
/// + job_time · minutes`, plus [`UNPLACED_PENALTY`] per unplaced instance.
pub fn layout_fitness(
    sheets: &[SheetLayout],
    unplaced: usize,
    weights: &ObjectiveWeights,
    feed_rate: f64,
) -> f64 {
    let sheet_area: f64 = sheets.iter().map(SheetLayout::sheet_area).sum();
    let waste: f64 = sheets.iter().map(|s| s.waste_area).sum();
    let waste_ratio = if sheet_area > 0.0 {
        waste / sheet_area
    } else {
        0.0
    };
    let cut_length: f64 = sheets.iter().map(SheetLayout::cut_length).sum();
    let parts: usize = sheets.iter().map(|s| s.placements.len()).sum();

    weights.waste * waste_ratio
        + weights.sheets * sheets.len() as f64
        + weights.cut_length * cut_length / 1000.0
        + weights.job_time * estimate_minutes(cut_length, parts, feed_rate)
        + UNPLACED_PENALTY * unplaced as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use u_cutlist_core::{Grain, Rect};

    fn sheet(waste: f64) -> SheetLayout {
        SheetLayout {
            stock_index: 0,
            stock_id: "S".into(),
            stock_label: "S".into(),
            instance: 0,
            width: 100.0,
            height: 100.0,
            grain: Grain::None,
            price: 0.0,
            usable: Rect::new(0.0, 0.0, 100.0, 100.0),
            placements: Vec::new(),
            waste_area: waste,
            kerf_loss: 0.0,
            cuts: Vec::new(),
        }
    }

    #[test]
    fn test_fitness_terms() {
        let weights = ObjectiveWeights {
            waste: 2.0,
            sheets: 1.0,
            cut_length: 0.0,
            job_time: 0.0,
        };
        let f = layout_fitness(&[sheet(2500.0)], 0, &weights, 1000.0);
        assert!((f - (2.0 * 0.25 + 1.0)).abs() < 1e-9);

        let penalised = layout_fitness(&[sheet(2500.0)], 2, &weights, 1000.0);
        assert!((penalised - f - 2.0 * UNPLACED_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn test_fewer_sheets_score_better() {
        let weights = ObjectiveWeights::default();
        let one = layout_fitness(&[sheet(5000.0)], 0, &weights, 3000.0);
        let two = layout_fitness(&[sheet(0.0), sheet(0.0)], 0, &weights, 3000.0);
        assert!(one < two);
    }
}
