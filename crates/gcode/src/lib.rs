//! G-code emission for U-Cutlist toolpaths.
//!
//! Turns a [`PlannedSheet`](u_cutlist_cutting::PlannedSheet) into a command
//! stream for a machine profile. Profiles are plain values: the built-ins
//! ([`GCodeProfile::generic`], [`GCodeProfile::grbl`], [`GCodeProfile::mach3`],
//! [`GCodeProfile::linuxcnc`]) are constructed on demand and callers pass one
//! resolved profile per call.
//!
//! Coordinates are rounded half away from zero to the profile's decimal
//! places; a value that rounds to zero is written without a sign.
//!
//! # Example
//!
//! ```rust
//! use u_cutlist_core::{Part, Settings, StockSheet};
//! use u_cutlist_cutting::plan_toolpaths;
//! use u_cutlist_gcode::{generate_sheet_code, GCodeProfile};
//! use u_cutlist_packing::optimize;
//!
//! let parts = vec![Part::new("panel", 300.0, 200.0)];
//! let stocks = vec![StockSheet::new("ply", 1220.0, 2440.0)];
//! let settings = Settings::new().with_kerf(6.0);
//! let result = optimize(&parts, &stocks, &settings).unwrap();
//! let planned = plan_toolpaths(&result.sheets[0], &settings);
//!
//! let code = generate_sheet_code(&planned, &GCodeProfile::grbl()).unwrap();
//! assert!(code.contains("G90"));
//! assert!(code.trim_end().ends_with("M2"));
//! ```

pub mod emitter;
pub mod format;
pub mod profile;

pub use emitter::{generate_all_code, generate_combined_code, generate_sheet_code, Emitter};
pub use format::format_number;
pub use profile::{builtin, builtin_names, resolve, GCodeProfile, Units};
