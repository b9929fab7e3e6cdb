//! # U-Cutlist Core
//!
//! Shared model and building blocks for the U-Cutlist cutting-stock optimizer
//! and toolpath generator.
//!
//! ## Core Components
//!
//! - **Geometry kernel**: [`Rect`], polygon helpers, arc tessellation and
//!   segment chaining in [`geometry`]
//! - **Model**: [`Part`], [`StockSheet`], [`Outline`], [`Grain`], [`Rotation`]
//! - **Settings**: [`Settings`] and its per-concern groups
//! - **Results**: [`OptimizationResult`], [`SheetLayout`], [`PlacedPart`]
//! - **Packer trait**: [`Packer`], implemented by the packing crate
//! - **GA framework**: [`GaRunner`], [`GaProblem`], [`PermutationChromosome`]
//!
//! ## Configuration
//!
//! ```rust
//! use u_cutlist_core::{Algorithm, GeneticSettings, Settings};
//!
//! let settings = Settings::new()
//!     .with_kerf(3.0)
//!     .with_edge_trim(10.0)
//!     .with_algorithm(Algorithm::GeneticSearch)
//!     .with_genetic(GeneticSettings::default().with_seed(42));
//! assert!(settings.validate_packing().is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod error;
pub mod ga;
pub mod geometry;
pub mod part;
pub mod result;
pub mod settings;
pub mod solver;

// Re-exports
pub use error::{Error, Result};
pub use ga::{GaConfig, GaProblem, GaProgress, GaResult, GaRunner, Individual, PermutationChromosome};
pub use geometry::{Point, Rect, Segment};
pub use part::{
    allowed_rotations, expand_parts, expand_stocks, materials_match, EdgeBanding, Grain, Outline,
    Part, PartInstance, Rotation, SheetInstance, StockSheet,
};
pub use result::{
    GuillotineCut, OptimizationResult, PlacedPart, SheetLayout, Summary, UnplaceReason,
    UnplacedPart,
};
pub use settings::{
    ClampZone, CornerOvercut, DustShoeSettings, GeneticSettings, LeadSettings, ObjectiveWeights,
    OnionSkinSettings, OrderingSettings, PlungeSettings, PlungeStrategy, Settings,
    StockTabPadding, TabSettings, ToolSettings,
};
pub use solver::{Algorithm, Packer, ProgressCallback, ProgressInfo};
