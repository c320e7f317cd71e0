//! refinement::errors — error type for percentile map refinement.
//!
//! Purpose
//! -------
//! Report invalid refiner configuration and mismatched inputs as structured
//! values instead of panics, with a `PyErr` bridge for the Python bindings.
//!
//! Conventions
//! -----------
//! - Percentiles are on the 0–100 scale.
//! - Messages are phrased in terms of the violated constraint.

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

pub type RefineResult<T> = Result<T, RefineError>;

/// RefineError — error conditions for the percentile refiner.
///
/// Variants
/// --------
/// - `InvalidPercentile { name, value }`
///   A percentile is NaN or outside `[0, 100]`.
/// - `PercentileOrder { low, up }`
///   The lower percentile is not strictly below the upper one.
/// - `ShapeMismatch { map, mask }`
///   Map and region mask shapes differ.
/// - `InvalidLabel { value }`
///   The region mask holds an infinite label.
/// - `UnknownMode { name }`
///   A refinement mode string was not recognized.
#[derive(Debug, Clone, PartialEq)]
pub enum RefineError {
    InvalidPercentile { name: &'static str, value: f64 },
    PercentileOrder { low: f64, up: f64 },
    ShapeMismatch { map: Vec<usize>, mask: Vec<usize> },
    InvalidLabel { value: f64 },
    UnknownMode { name: String },
}

impl std::error::Error for RefineError {}

impl std::fmt::Display for RefineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefineError::InvalidPercentile { name, value } => {
                write!(f, "Invalid {name} percentile: {value}. Must lie in [0, 100].")
            }
            RefineError::PercentileOrder { low, up } => {
                write!(f, "Lower percentile {low} must be strictly below upper percentile {up}.")
            }
            RefineError::ShapeMismatch { map, mask } => {
                write!(f, "Map shape {map:?} does not match region mask shape {mask:?}.")
            }
            RefineError::InvalidLabel { value } => {
                write!(f, "Invalid region label {value}. Labels must be finite.")
            }
            RefineError::UnknownMode { name } => {
                write!(f, "Unknown refinement mode '{name}'. Expected 'sequential' or 'independent'.")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<RefineError> for PyErr {
    fn from(err: RefineError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
