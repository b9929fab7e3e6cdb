//! Planned toolpaths.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use u_cutlist_core::geometry::Point;
use u_cutlist_core::ToolSettings;

/// Kind of a machine motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MoveKind {
    /// Non-cutting traverse at rapid rate.
    Rapid,
    /// Descending feed move at plunge rate.
    Plunge,
    /// Cutting feed move at feed rate (includes lifts over tabs).
    Cut,
}

/// One linear motion to an absolute position. Z = 0 is the stock top.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Move {
    /// Motion kind.
    pub kind: MoveKind,
    /// Target X.
    pub x: f64,
    /// Target Y.
    pub y: f64,
    /// Target Z.
    pub z: f64,
}

impl Move {
    /// Creates a move.
    pub fn new(kind: MoveKind, p: Point, z: f64) -> Self {
        Self {
            kind,
            x: p.0,
            y: p.1,
            z,
        }
    }

    /// Target XY.
    pub fn xy(&self) -> Point {
        (self.x, self.y)
    }

    /// 3-D distance from another position.
    pub fn length_from(&self, from: (f64, f64, f64)) -> f64 {
        let (dx, dy, dz) = (self.x - from.0, self.y - from.1, self.z - from.2);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Role of a planned cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CutKind {
    /// Profile cut of a part.
    Profile,
    /// Full-depth pass removing an onion skin.
    Cleanup,
}

/// An uncut interval along a contour.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tab {
    /// What the interval holds.
    pub kind: TabKind,
    /// Start distance along the tool path.
    pub start: f64,
    /// End distance along the tool path.
    pub end: f64,
    /// Deepest Z the tool may reach inside the interval.
    pub top_z: f64,
}

impl Tab {
    /// Interval length.
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Source of a held interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TabKind {
    /// Holding tab keeping the part attached.
    Part,
    /// Stock padding zone near a sheet edge.
    Stock,
}

/// Toolpath of one contour.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlannedCut {
    /// Role of the cut.
    pub kind: CutKind,
    /// Index of the placement on its sheet.
    pub placement: usize,
    /// Part identifier.
    pub part_id: String,
    /// Copy number of the part.
    pub instance: u32,
    /// Entry point on the tool path.
    pub entry: Point,
    /// Where the tool first goes down.
    pub plunge_point: Point,
    /// Z of every pass, shallowest first.
    pub pass_depths: Vec<f64>,
    /// Held intervals.
    pub tabs: Vec<Tab>,
    /// Motions, starting with the traverse to the plunge point.
    pub moves: Vec<Move>,
}

/// Dust-shoe conflict with a clamp zone.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionHit {
    /// Label of the clamp zone.
    pub zone: String,
    /// Index of the cut in [`PlannedSheet::cuts`].
    pub cut: usize,
    /// Tool position at the first conflict.
    pub position: Point,
    /// Tool Z at the first conflict.
    pub z: f64,
}

/// Outcome of the fixture check.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionReport {
    /// Whether the check ran.
    pub checked: bool,
    /// One entry per offending (zone, cut) pair.
    pub hits: Vec<CollisionHit>,
}

impl CollisionReport {
    /// True when no conflict was found (or the check was disabled).
    pub fn passed(&self) -> bool {
        self.hits.is_empty()
    }

    /// Distinct offending zone labels.
    pub fn offending_zones(&self) -> Vec<&str> {
        let mut zones: Vec<&str> = self.hits.iter().map(|h| h.zone.as_str()).collect();
        zones.sort_unstable();
        zones.dedup();
        zones
    }
}

/// Motion totals of a planned sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CutStats {
    /// Length of feed moves (cut and plunge).
    pub feed_length: f64,
    /// Length of rapid moves.
    pub rapid_length: f64,
    /// Number of entries into the stock from above.
    pub plunge_count: usize,
    /// Estimated machine time in seconds.
    pub estimated_seconds: f64,
}

impl CutStats {
    /// Totals for a motion sequence starting at `start`.
    pub fn from_moves<'a>(
        moves: impl IntoIterator<Item = &'a Move>,
        start: (f64, f64, f64),
        tool: &ToolSettings,
    ) -> Self {
        let mut stats = Self::default();
        let mut pos = start;
        let mut minutes = 0.0;
        for m in moves {
            let len = m.length_from(pos);
            let rate = match m.kind {
                MoveKind::Rapid => {
                    stats.rapid_length += len;
                    tool.rapid_rate
                }
                MoveKind::Plunge => {
                    stats.feed_length += len;
                    tool.plunge_rate
                }
                MoveKind::Cut => {
                    stats.feed_length += len;
                    tool.feed_rate
                }
            };
            if pos.2 >= 0.0 && m.z < 0.0 {
                stats.plunge_count += 1;
            }
            if rate > 0.0 {
                minutes += len / rate;
            }
            pos = (m.x, m.y, m.z);
        }
        stats.estimated_seconds = minutes * 60.0;
        stats
    }
}

/// A sheet ready for code emission.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlannedSheet {
    /// Index of the sheet in the optimization result.
    pub sheet_index: usize,
    /// Stock identifier.
    pub stock_id: String,
    /// Stock display label.
    pub stock_label: String,
    /// Sheet width.
    pub width: f64,
    /// Sheet height.
    pub height: f64,
    /// Tool parameters the moves were planned for.
    pub tool: ToolSettings,
    /// Cuts in machining order.
    pub cuts: Vec<PlannedCut>,
    /// Fixture check outcome.
    pub collision: CollisionReport,
    /// Motion totals.
    pub stats: CutStats,
}

impl PlannedSheet {
    /// All moves in machining order.
    pub fn moves(&self) -> impl Iterator<Item = &Move> {
        self.cuts.iter().flat_map(|c| c.moves.iter())
    }

    /// Home position: sheet origin at safe height.
    pub fn home(&self) -> (f64, f64, f64) {
        (0.0, 0.0, self.tool.safe_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_moves() {
        let tool = ToolSettings::default();
        let moves = [
            Move::new(MoveKind::Rapid, (30.0, 40.0), 5.0),
            Move::new(MoveKind::Plunge, (30.0, 40.0), -6.0),
            Move::new(MoveKind::Cut, (130.0, 40.0), -6.0),
            Move::new(MoveKind::Rapid, (130.0, 40.0), 5.0),
        ];
        let stats = CutStats::from_moves(&moves, (0.0, 0.0, 5.0), &tool);
        assert!((stats.rapid_length - (50.0 + 11.0)).abs() < 1e-9);
        assert!((stats.feed_length - 111.0).abs() < 1e-9);
        assert_eq!(stats.plunge_count, 1);
        let expected = (61.0 / tool.rapid_rate + 11.0 / tool.plunge_rate + 100.0 / tool.feed_rate) * 60.0;
        assert!((stats.estimated_seconds - expected).abs() < 1e-9);
    }

    #[test]
    fn test_collision_report_zones() {
        let mut report = CollisionReport {
            checked: true,
            hits: Vec::new(),
        };
        assert!(report.passed());
        for (zone, cut) in [("B", 0), ("A", 1), ("B", 2)] {
            report.hits.push(CollisionHit {
                zone: zone.into(),
                cut,
                position: (0.0, 0.0),
                z: 0.0,
            });
        }
        assert!(!report.passed());
        assert_eq!(report.offending_zones(), vec!["A", "B"]);
    }
}
