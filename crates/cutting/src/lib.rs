//! Toolpath planning for U-Cutlist sheet layouts.
//!
//! Given a packed sheet (placed parts with positions and rotations), this
//! crate computes the motions of a CNC router cutting every part free:
//! - Tool-radius compensated profile contours
//! - Holding tabs and uncut stock padding along the sheet edges
//! - Straight, ramp or helix plunge entry
//! - Tangent lead-in/lead-out arcs on the waste side
//! - Dog-bone or T-bone relief at interior corners
//! - Onion-skin passes with optional cleanup
//! - Dust-shoe clearance check against clamp zones
//!
//! # Algorithm
//!
//! 1. **Contour extraction**: offset each part boundary outward by the tool radius
//! 2. **Tab insertion**: part tabs per side, stock padding holds
//! 3. **Sequencing**: structural order, or nearest neighbor + 2-opt on rapid
//!    travel, with the entry point chosen among evenly spread candidates
//! 4. **Pass generation**: plunge, lead in, follow, lead out, per depth pass
//! 5. **Collision check**: report only, moves are never altered
//!
//! # Example
//!
//! ```rust
//! use u_cutlist_core::{Part, Settings, StockSheet};
//! use u_cutlist_cutting::plan_toolpaths;
//! use u_cutlist_packing::optimize;
//!
//! let parts = vec![Part::new("door", 400.0, 700.0)];
//! let stocks = vec![StockSheet::new("mdf", 1220.0, 2440.0)];
//! let settings = Settings::new().with_kerf(6.0);
//! let result = optimize(&parts, &stocks, &settings).unwrap();
//!
//! let planned = plan_toolpaths(&result.sheets[0], &settings);
//! assert_eq!(planned.cuts.len(), 1);
//! assert!(planned.collision.passed());
//! ```

pub mod collision;
pub mod contour;
pub mod corner;
pub mod leadin;
pub mod path;
pub mod plunge;
pub mod result;
pub mod sequence;
pub mod tabs;

pub use collision::check_collisions;
pub use contour::{extract_contours, CutContour};
pub use path::{pass_depths, plan_all, plan_sheet, plan_toolpaths};
pub use result::{
    CollisionHit, CollisionReport, CutKind, CutStats, Move, MoveKind, PlannedCut, PlannedSheet,
    Tab, TabKind,
};
pub use sequence::{clear_entries, order_cuts, EntryStyle, SequenceResult, SequencedCut};
