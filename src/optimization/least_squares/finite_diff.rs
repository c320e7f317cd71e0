//! least_squares::finite_diff — finite-difference Jacobians with error capture.
//!
//! Purpose
//! -------
//! Approximate the residual Jacobian `J_ij = ∂r_i/∂θ_j` when a
//! [`ResidualModel`](crate::optimization::least_squares::ResidualModel) does
//! not provide one analytically, so the solver never depends directly on the
//! `finitediff` API.
//!
//! Key behaviors
//! -------------
//! - Each Jacobian row is the gradient of the scalar map `θ ↦ r_i(θ)`,
//!   computed with `finitediff`'s central scheme.
//! - When a residual evaluation fails inside the finite-difference closure,
//!   or the central row is non-finite, the row is recomputed with forward
//!   differences via [`run_fd_row`].
//! - The assembled matrix is validated for shape and finiteness.
//!
//! Invariants & assumptions
//! ------------------------
//! - Closures passed to `finitediff` must return `f64`, so residual errors are
//!   routed into a shared `RefCell<Option<OptError>>` and the closure returns
//!   `NaN`; the captured error is surfaced after differencing.
//! - Residual vectors are assumed to keep a fixed length `n_obs` for every θ.
//!
//! Testing notes
//! -------------
//! - Unit tests check agreement with an analytic Jacobian on a linear model
//!   and propagation of residual failures.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        types::{JacobianMatrix, Residuals, Theta},
        validation::validate_jacobian,
    },
};
use finitediff::FiniteDiff;
use ndarray::{Array1, Array2};
use std::cell::RefCell;

/// compute_jacobian — row-wise finite-difference Jacobian of a residual map.
///
/// Parameters
/// ----------
/// - `theta`: `&Theta`
///   Point at which the Jacobian is approximated.
/// - `n_obs`: `usize`
///   Number of residuals (rows of the Jacobian).
/// - `residual_fn`: `&R`
///   Residual map `θ ↦ r(θ)`. Errors are captured and reported.
///
/// Returns
/// -------
/// `OptResult<JacobianMatrix>`
///   An `n_obs × theta.len()` matrix with finite entries.
///
/// Errors
/// ------
/// - Any error raised by `residual_fn` on the forward-difference path.
/// - `OptError::InvalidJacobian` if a row is still non-finite after the
///   forward fallback.
pub fn compute_jacobian<R>(theta: &Theta, n_obs: usize, residual_fn: &R) -> OptResult<JacobianMatrix>
where
    R: Fn(&Theta) -> OptResult<Residuals>,
{
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let mut jac: JacobianMatrix = Array2::zeros((n_obs, theta.len()));
    for i in 0..n_obs {
        let row_fn = |p: &Theta| -> f64 {
            match residual_fn(p) {
                Ok(r) => r.get(i).copied().unwrap_or(f64::NAN),
                Err(e) => {
                    let mut slot = closure_err.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                    f64::NAN
                }
            }
        };
        closure_err.replace(None);
        let central = theta.central_diff(&row_fn);
        let row = if closure_err.borrow().is_some() || central.iter().any(|v| !v.is_finite()) {
            run_fd_row(theta, &row_fn, &closure_err)?
        } else {
            central
        };
        jac.row_mut(i).assign(&row);
    }
    validate_jacobian(&jac, n_obs, theta.len())?;
    Ok(jac)
}

/// run_fd_row — forward-difference gradient of one residual with error capture.
///
/// Clears `closure_err`, differentiates `func` forward at `theta`, and returns
/// any error captured during the evaluations.
///
/// # Errors
/// Returns the captured residual error.
pub fn run_fd_row<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<OptError>>,
) -> OptResult<Array1<f64>> {
    closure_err.replace(None);
    let row = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    Ok(row)
}
