//! least_squares::types — shared numeric aliases and solver defaults.
//!
//! Purpose
//! -------
//! Centralize the numeric types and default constants used by the bounded
//! Levenberg–Marquardt run so the rest of the optimizer stays agnostic to
//! `ndarray` generics.
//!
//! Conventions
//! -----------
//! - `Residuals` has one entry per observation, `r_i = f(x_i; θ) − y_i`.
//! - `JacobianMatrix` is `n_obs × n_params` with entries `∂r_i/∂θ_j`.
//! - `Cost` is always `½·Σ r_i²`.
use ndarray::{Array1, Array2};

/// Parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Residual vector `r(θ)`, one entry per observation.
pub type Residuals = Array1<f64>;

/// Dense Jacobian of the residuals, `n_obs × n_params`.
pub type JacobianMatrix = Array2<f64>;

/// Scalar objective `½·‖r(θ)‖²`.
pub type Cost = f64;

/// Default relative parameter-change tolerance.
pub const DEFAULT_XTOL: f64 = 1e-6;

/// Default relative cost-reduction tolerance.
pub const DEFAULT_FTOL: f64 = 1e-8;

/// Default scaled-gradient tolerance.
pub const DEFAULT_GTOL: f64 = 1e-8;

/// Default MINPACK `factor`: the first step is bounded by
/// `factor·‖D·θ₀‖` (or `factor` itself when that norm is zero).
pub const DEFAULT_STEP_BOUND: f64 = 100.0;

/// Stand-in for a residual the model could not evaluate at a trial point.
///
/// Large enough that the trial cost exceeds any finite starting cost, small
/// enough that its square summed over a curve stays finite.
pub const PENALTY_RESIDUAL: f64 = 1e150;

/// Relative distance a start on (or outside) a finite bound is moved inward,
/// so the bounded-parameter transform is not started at a stationary point.
pub const INTERIOR_MARGIN: f64 = 1e-6;

/// Residual-evaluation budget used when the caller does not provide one.
///
/// The classic MINPACK `maxfev` default of `200·(n + 1)` for a
/// Jacobian-based Levenberg–Marquardt run over `n` parameters.
pub const fn default_max_iter(n_params: usize) -> usize {
    200 * (n_params + 1)
}
