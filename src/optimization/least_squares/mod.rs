//! least_squares — bounded nonlinear least squares on MINPACK-style
//! Levenberg–Marquardt.
//!
//! Purpose
//! -------
//! Provide a small, dependable curve-fitting core: callers implement a single
//! trait, [`ResidualModel`], and invoke [`minimize`] to run a bounded
//! Levenberg–Marquardt solve with configurable tolerances and a
//! finite-difference Jacobian fallback.
//!
//! Key behaviors
//! -------------
//! - [`problem::BoundedProblem`] exposes a user residual map to the
//!   `levenberg_marquardt` crate's `LeastSquaresProblem` trait.
//! - [`minimize`] validates the initial guess with
//!   [`ResidualModel::check`], checks bounds, problem size and the starting
//!   residuals, and delegates to [`run::run_levenberg_marquardt`].
//! - Box constraints ([`Bounds`]) are enforced through a bounded-parameter
//!   transform; parameters that converge onto a bound are pinned there and
//!   the rest re-solved.
//! - Finite-difference Jacobians ([`finite_diff`]) are used whenever a model
//!   does not implement [`ResidualModel::jacobian`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Residuals at the starting point must be finite; a trial point the model
//!   cannot evaluate is penalized and rejected by the trust region.
//! - [`LsqOptions`] values are validated on construction and treated as
//!   internally consistent by the solver.
//! - A successful [`LsqOutcome`] always has finite `theta_hat` inside the
//!   bounds and a finite cost.
//!
//! Conventions
//! -----------
//! - Residuals are `model − observation`; the Jacobian is `∂r/∂θ`
//!   (`n_obs × n_params`).
//! - Errors bubble up as [`OptResult<T>`](crate::optimization::errors::OptResult);
//!   this module never intentionally panics.
//!
//! Downstream usage
//! ----------------
//! - The relaxometry solver implements [`ResidualModel`] for its signal
//!   models and calls [`minimize`] once per voxel.
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover validation, the bound transform, FD
//!   fallback, convergence on linear/exponential/Rosenbrock problems, optima
//!   on an active bound, and the evaluation budget.

pub mod api;
pub mod bounds;
pub mod finite_diff;
pub mod problem;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::minimize;
pub use self::bounds::Bounds;
pub use self::traits::{LsqOptions, LsqOutcome, LsqStatus, ResidualModel};
pub use self::types::{Cost, JacobianMatrix, Residuals, Theta};

pub mod prelude {
    pub use super::api::minimize;
    pub use super::bounds::Bounds;
    pub use super::traits::{LsqOptions, LsqOutcome, LsqStatus, ResidualModel};
    pub use super::types::{JacobianMatrix, Residuals, Theta};
}
