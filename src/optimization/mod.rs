//! optimization — least-squares solver and unified error surface.
//!
//! Purpose
//! -------
//! Provide the numerical fitting layer used by the relaxometry engine: a
//! bounded Levenberg–Marquardt solver on top of the `levenberg_marquardt`
//! crate, and a single error/result surface for everything that can go wrong
//! inside it.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **minimizing sums of squared residuals**
//!   (`least_squares`), including box constraints and stopping criteria.
//! - Normalize configuration issues, numerical failures, and unsuccessful
//!   backend terminations into a single enum (`errors::OptError`) with a common result alias
//!   (`OptResult<T>`).
//!
//! Conventions
//! -----------
//! - Parameters and residuals are `ndarray` vectors (`Theta`, `Residuals`);
//!   Jacobians are dense `n_obs × n_params` matrices.
//! - Public optimization entrypoints that can fail return `OptResult<T>`;
//!   callers never see raw backend termination reasons.
//! - This module and its submodules avoid I/O and logging; the engine layer
//!   reports per-voxel outcomes.
//!
//! Downstream usage
//! ----------------
//! - Front-ends typically import the curated surface via
//!   `optimization::prelude::*`.

pub mod errors;
pub mod least_squares;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use relaxfit::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::least_squares::prelude::*;
}
