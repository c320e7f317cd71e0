//! relaxometry — voxel-wise signal-model fitting for quantitative MRI maps.
//!
//! Purpose
//! -------
//! Turn a time series of images into parametric maps (amplitude, relaxation
//! time, offset) by fitting a physical signal model independently to every
//! masked voxel, scoring each fit with R², and keeping only fits that pass a
//! quality threshold.
//!
//! Key behaviors
//! -------------
//! - [`models`]: the signal equations ([`SignalModel`]) with acquisition
//!   constants fixed at construction, plus their residual/Jacobian hooks for
//!   the least-squares optimizer.
//! - [`solver`]: one voxel curve → [`FittedParams`] or a [`FitFailure`]
//!   (normalization, seeding via [`init`], bounds via [`bounds`]).
//! - [`goodness`]: R² scoring and the acceptance gate.
//! - [`engine`]: [`VoxelFitter`] validates shapes ([`volume`]), runs the
//!   reference solve, dispatches the worklist sequentially or on a rayon pool,
//!   and assembles [`FitMaps`].
//! - [`io`]: plain-text time vector store/reload.
//!
//! Invariants & assumptions
//! ------------------------
//! - Configuration problems are [`RelaxError`]s raised before any voxel is
//!   dispatched; per-voxel problems are [`FitFailure`]s recorded in the status
//!   map and never abort a batch.
//! - Every shipped model has exactly three parameters; a voxel's stored
//!   parameters are either all finite or all NaN.
//!
//! Conventions
//! -----------
//! - Volumes are `[T, X, Y(, Z)]`; 2-D inputs come back on a `[X, Y, 1]` grid.
//! - The library logs through the `log` facade (`debug!` for batch progress,
//!   `warn!` for degenerate inputs, `trace!` for per-voxel failures) and never
//!   installs a logger.

pub mod bounds;
pub mod engine;
pub mod errors;
pub mod goodness;
pub mod init;
pub mod io;
pub mod models;
pub mod options;
pub mod solver;
pub mod volume;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::bounds::ParamBounds;
pub use self::engine::{FitMaps, FitSummary, VoxelFitter, VoxelStatus};
pub use self::errors::{FitFailure, RelaxError, RelaxResult};
pub use self::io::{load_times, save_times};
pub use self::models::{CurveData, SignalModel, T1rhoConfig};
pub use self::options::FitOptions;
pub use self::solver::{FittedParams, SolveOptions, VoxelSolution, VoxelSolver};

pub mod prelude {
    pub use super::bounds::ParamBounds;
    pub use super::engine::{FitMaps, VoxelFitter, VoxelStatus};
    pub use super::errors::{FitFailure, RelaxError, RelaxResult};
    pub use super::models::SignalModel;
    pub use super::options::FitOptions;
    pub use super::solver::SolveOptions;
}
