//! Errors for relaxometry fitting (shape checks, model configuration, engine
//! setup, time-vector I/O) and per-voxel fit failures.
//!
//! This module defines the batch-level error type, [`RelaxError`], and the
//! per-voxel failure type, [`FitFailure`]. A `RelaxError` stops a batch before
//! any voxel is dispatched; a `FitFailure` is absorbed by the engine and only
//! shows up in the status map.
//!
//! ## Conventions
//! - Voxel coordinates are 0-based `[x, y, z]` in the promoted 3-D grid.
//! - Optimizer failures keep their [`OptError`] reason.
use crate::optimization::errors::OptError;
use std::path::PathBuf;

/// Crate-wide result alias for relaxometry operations.
pub type RelaxResult<T> = Result<T, RelaxError>;

/// Batch-level configuration and setup errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RelaxError {
    // ---- Shape validation ----
    /// Leading axis of the volume does not match the time vector.
    TimeAxisMismatch { volume_len: usize, times_len: usize },

    /// Mask rank must be exactly one less than the volume rank.
    MaskRankMismatch { mask_ndim: usize, volume_ndim: usize },

    /// Spatial extents of mask and volume differ.
    SpatialShapeMismatch { mask: Vec<usize>, volume: Vec<usize> },

    /// Only 2-D and 3-D spatial grids are supported.
    UnsupportedRank { spatial_ndim: usize },

    /// Volume has no voxels or no time points.
    EmptyVolume,

    // ---- Model configuration ----
    /// A physical constant baked into a model must be finite.
    InvalidModelConstant { name: &'static str, value: f64 },

    /// A constant required by the chosen model is missing from the config map.
    MissingModelConstant { name: &'static str },

    /// Model name not recognized.
    UnknownModel { name: String },

    /// Bounds must provide one (lower, upper) pair per model parameter.
    BoundsLengthMismatch { expected: usize, found: usize },

    /// Initial guess must provide one value per model parameter.
    InitialGuessLengthMismatch { expected: usize, found: usize },

    /// Acceptance threshold must not be NaN.
    InvalidMinR2 { value: f64 },

    // ---- Engine ----
    /// Reference solve used to determine the parameter count failed.
    ReferenceSolveFailed { voxel: [usize; 3], reason: FitFailure },

    /// Reference solve returned an unexpected number of parameters.
    ParamCountMismatch { expected: usize, found: usize },

    /// Worker pool could not be constructed.
    ThreadPool { text: String },

    // ---- Time-vector I/O ----
    /// Underlying filesystem error.
    Io { path: PathBuf, text: String },

    /// A token in a time-vector file is not a number.
    ParseTimes { path: PathBuf, token: String },

    // ---- Optimizer configuration ----
    /// Invalid solver options or bounds.
    Optimizer(OptError),
}

impl std::error::Error for RelaxError {}

impl std::fmt::Display for RelaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shape validation ----
            RelaxError::TimeAxisMismatch { volume_len, times_len } => {
                write!(
                    f,
                    "Volume has {volume_len} time points but the time vector has {times_len} entries"
                )
            }
            RelaxError::MaskRankMismatch { mask_ndim, volume_ndim } => {
                write!(
                    f,
                    "Mask rank {mask_ndim} must be one less than volume rank {volume_ndim}"
                )
            }
            RelaxError::SpatialShapeMismatch { mask, volume } => {
                write!(f, "Mask shape {mask:?} does not match volume spatial shape {volume:?}")
            }
            RelaxError::UnsupportedRank { spatial_ndim } => {
                write!(f, "Unsupported spatial rank {spatial_ndim}: expected 2 or 3")
            }
            RelaxError::EmptyVolume => write!(f, "Volume has no voxels or no time points"),

            // ---- Model configuration ----
            RelaxError::InvalidModelConstant { name, value } => {
                write!(f, "Invalid model constant {name} = {value}: must be finite")
            }
            RelaxError::MissingModelConstant { name } => {
                write!(f, "Missing model constant '{name}'")
            }
            RelaxError::UnknownModel { name } => write!(f, "Unknown signal model '{name}'"),
            RelaxError::BoundsLengthMismatch { expected, found } => {
                write!(f, "Bounds length mismatch: model has {expected} parameters, got {found}")
            }
            RelaxError::InitialGuessLengthMismatch { expected, found } => {
                write!(
                    f,
                    "Initial guess length mismatch: model has {expected} parameters, got {found}"
                )
            }
            RelaxError::InvalidMinR2 { value } => {
                write!(f, "Invalid R² threshold {value}: must not be NaN")
            }

            // ---- Engine ----
            RelaxError::ReferenceSolveFailed { voxel, reason } => {
                write!(f, "Reference solve at voxel {voxel:?} failed: {reason}")
            }
            RelaxError::ParamCountMismatch { expected, found } => {
                write!(f, "Reference solve returned {found} parameters, model declares {expected}")
            }
            RelaxError::ThreadPool { text } => write!(f, "Failed to build worker pool: {text}"),

            // ---- Time-vector I/O ----
            RelaxError::Io { path, text } => write!(f, "I/O error on {}: {text}", path.display()),
            RelaxError::ParseTimes { path, token } => {
                write!(f, "Invalid number '{token}' in {}", path.display())
            }

            // ---- Optimizer configuration ----
            RelaxError::Optimizer(err) => write!(f, "Optimizer configuration error: {err}"),
        }
    }
}

impl From<OptError> for RelaxError {
    fn from(err: OptError) -> Self {
        RelaxError::Optimizer(err)
    }
}

/// Reason a single voxel could not be fitted.
///
/// Absorbed by the engine: the voxel's parameters stay NaN, its R² stays 0
/// and its status becomes `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum FitFailure {
    /// Optimizer did not converge or hit a numerical failure.
    Optimizer(OptError),

    /// Signal and time vector lengths differ.
    LengthMismatch { y_len: usize, x_len: usize },

    /// Starting point contains NaN or ±inf.
    NonFiniteSeed { index: usize, value: f64 },
}

impl std::error::Error for FitFailure {}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitFailure::Optimizer(err) => write!(f, "{err}"),
            FitFailure::LengthMismatch { y_len, x_len } => {
                write!(f, "Signal has {y_len} samples but time vector has {x_len}")
            }
            FitFailure::NonFiniteSeed { index, value } => {
                write!(f, "Non-finite starting value at index {index}: {value}")
            }
        }
    }
}

impl From<OptError> for FitFailure {
    fn from(err: OptError) -> Self {
        FitFailure::Optimizer(err)
    }
}

#[cfg(feature = "python-bindings")]
impl From<RelaxError> for pyo3::PyErr {
    fn from(err: RelaxError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
