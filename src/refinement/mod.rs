//! refinement — percentile-based outlier exclusion on finished parameter maps.
//!
//! Purpose
//! -------
//! Clean a fitted map region by region: for every integer label in a region
//! mask, keep only the map values inside a `[P_low, P_up]` percentile band.
//!
//! Key behaviors
//! -------------
//! - [`PercentileRefiner`] holds a validated band (default `(5, 95)`).
//! - [`PercentileRefiner::refine`] runs the order-dependent sequential fold;
//!   [`PercentileRefiner::refine_independent`] treats labels separately.
//!   [`RefineMode`] selects between them.
//! - [`percentile`] implements linear interpolation between closest ranks,
//!   ignoring NaN.
//!
//! Conventions
//! -----------
//! - Region masks carry labels `1..L` as `f64`; `0` (and NaN) is unlabelled.
//! - Errors are reported as [`RefineError`] / [`RefineResult`].

pub mod errors;
pub mod percentile;
pub mod refiner;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{RefineError, RefineResult};
pub use self::refiner::{PercentileRefiner, RefineMode};

pub mod prelude {
    pub use super::errors::{RefineError, RefineResult};
    pub use super::refiner::{PercentileRefiner, RefineMode};
}
