//! # U-Cutlist Packing
//!
//! Sheet packing for the U-Cutlist engine.
//!
//! ## Algorithms
//!
//! - **Guillotine**: deterministic best-area-fit placement over recursively
//!   split free rectangles, with kerf dead space along every cut
//! - **Genetic search**: order and rotation genomes decoded through the same
//!   placement, evaluated in parallel on a bounded worker pool
//!
//! Remnants of a finished layout are found with [`detect_offcuts`].
//!
//! ## Quick Start
//!
//! ```rust
//! use u_cutlist_core::{Part, Settings, StockSheet};
//! use u_cutlist_packing::optimize;
//!
//! let parts = vec![Part::new("shelf", 600.0, 300.0).with_quantity(2)];
//! let stocks = vec![StockSheet::new("ply", 1200.0, 600.0)];
//! let result = optimize(&parts, &stocks, &Settings::new().with_kerf(3.0)).unwrap();
//!
//! assert!(result.all_placed());
//! assert_eq!(result.summary.sheets_used, 1);
//! ```

pub mod genetic;
pub mod guillotine;
pub mod objective;
pub mod offcut;
pub mod optimizer;

pub use genetic::{GeneticPacker, PackingProblem};
pub use guillotine::{FreeSpace, GuillotinePacker, LayoutBuilder, Packing};
pub use objective::{layout_fitness, UNPLACED_PENALTY};
pub use offcut::{detect_offcuts, detect_offcuts_with, sheet_offcuts, Offcut, OffcutConfig};
pub use optimizer::{optimize, Optimizer};

// Re-export core types
pub use u_cutlist_core::{
    Algorithm, Error, OptimizationResult, Packer, Part, ProgressCallback, ProgressInfo, Result,
    Settings, StockSheet,
};
