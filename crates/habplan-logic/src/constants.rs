//! Layout constants: validation defaults and instance id prefixes.
//!
//! Plain values with no dependencies. `ValidationConfig::default()` and
//! `EditorConfig::default()` are built from these.

/// Minimum pressurized volume each crew member needs (m³).
pub const MIN_VOLUME_PER_CREW: f64 = 10.0;

/// Fraction of a parent's volume above which child volume is a warning.
pub const CAPACITY_WARNING_RATIO: f64 = 0.9;

/// Edge tolerance for footprint overlap tests (m).
pub const OVERLAP_TOLERANCE: f64 = 0.01;

/// Crew members served by one hygiene module.
pub const CREW_PER_HYGIENE_MODULE: u32 = 3;

/// Crew size of a fresh layout.
pub const DEFAULT_CREW_SIZE: u32 = 4;

/// Default editor grid (m).
pub const GRID_SIZE: f64 = 0.5;

pub mod id_prefix {
    pub const CONNECTION: &str = "conn";
}
