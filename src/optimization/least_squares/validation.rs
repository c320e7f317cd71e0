//! Validation helpers for least-squares optimization.
//!
//! This module centralizes common consistency checks used across the
//! least-squares interface:
//!
//! - **Tolerance checks**: [`verify_xtol`], [`verify_ftol`], [`verify_gtol`]
//!   ensure stopping tolerances are finite and strictly positive.
//! - **Configuration checks**: [`verify_max_iter`], [`verify_step_bound`].
//! - **Residual/Jacobian validation**: [`validate_residuals`] and
//!   [`validate_jacobian`] enforce shape and finite entries.
//! - **Parameter vectors**: [`validate_theta_input`] and
//!   [`validate_theta_hat`] ensure candidate θ vectors are finite.
//!
//! These helpers standardize error reporting by returning domain-specific
//! [`OptError`] variants.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::types::{Cost, JacobianMatrix, Residuals, Theta},
};

/// Validate the parameter-change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidXTol`] if the value is non-finite or ≤ 0.0.
pub fn verify_xtol(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidXTol { tol, reason: "Tolerance must be finite." });
    }
    if tol <= 0.0 {
        return Err(OptError::InvalidXTol { tol, reason: "Tolerance must be positive." });
    }
    Ok(())
}

/// Validate the relative cost-reduction tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidFTol`] if the value is non-finite or ≤ 0.0.
pub fn verify_ftol(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidFTol { tol, reason: "Tolerance must be finite." });
    }
    if tol <= 0.0 {
        return Err(OptError::InvalidFTol { tol, reason: "Tolerance must be positive." });
    }
    Ok(())
}

/// Validate the scaled-gradient tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidGTol`] if the value is non-finite or ≤ 0.0.
pub fn verify_gtol(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidGTol { tol, reason: "Tolerance must be finite." });
    }
    if tol <= 0.0 {
        return Err(OptError::InvalidGTol { tol, reason: "Tolerance must be positive." });
    }
    Ok(())
}

/// Validate an optional iteration cap.
///
/// # Errors
/// Returns [`OptError::InvalidMaxIter`] if `max_iter == Some(0)`.
pub fn verify_max_iter(max_iter: Option<usize>) -> OptResult<()> {
    if let Some(max_iter) = max_iter {
        if max_iter == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter,
                reason: "Evaluation budget must be greater than zero.",
            });
        }
    }
    Ok(())
}

/// Validate the initial step bound factor.
///
/// # Errors
/// Returns [`OptError::InvalidStepBound`] if the value is non-finite or ≤ 0.0.
pub fn verify_step_bound(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::InvalidStepBound { value, reason: "Step bound must be finite." });
    }
    if value <= 0.0 {
        return Err(OptError::InvalidStepBound { value, reason: "Step bound must be positive." });
    }
    Ok(())
}

/// Validate a residual vector against length and finiteness.
///
/// Checks:
/// - `residuals.len() == n_obs`
/// - every element is finite (`NaN` or `±∞` are rejected)
///
/// # Errors
/// - [`OptError::ResidualDimMismatch`] if the length does not match `n_obs`.
/// - [`OptError::NonFiniteResidual`] with the index/value of the first
///   offending element.
pub fn validate_residuals(residuals: &Residuals, n_obs: usize) -> OptResult<()> {
    if residuals.len() != n_obs {
        return Err(OptError::ResidualDimMismatch { expected: n_obs, found: residuals.len() });
    }
    for (index, &value) in residuals.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::NonFiniteResidual { index, value });
        }
    }
    Ok(())
}

/// Validate the shape and entries of a Jacobian matrix.
///
/// # Errors
/// - [`OptError::JacobianDimMismatch`] if the shape is not `n_obs × n_params`.
/// - [`OptError::InvalidJacobian`] if any entry is non-finite, with offending
///   row/col indices and value.
pub fn validate_jacobian(jac: &JacobianMatrix, n_obs: usize, n_params: usize) -> OptResult<()> {
    if jac.nrows() != n_obs || jac.ncols() != n_params {
        return Err(OptError::JacobianDimMismatch {
            expected: (n_obs, n_params),
            found: (jac.nrows(), jac.ncols()),
        });
    }
    for ((row, col), &value) in jac.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidJacobian { row, col, value });
        }
    }
    Ok(())
}

/// Validate an initial parameter vector.
///
/// # Errors
/// - [`OptError::ThetaLengthMismatch`] if `theta.len() != n_params`.
/// - [`OptError::InvalidThetaInput`] for the first non-finite entry.
pub fn validate_theta_input(theta: &Theta, n_params: usize) -> OptResult<()> {
    if theta.len() != n_params {
        return Err(OptError::ThetaLengthMismatch { expected: n_params, actual: theta.len() });
    }
    for (index, &value) in theta.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidThetaInput { index, value });
        }
    }
    Ok(())
}

/// Validate an estimated parameter vector.
///
/// # Errors
/// Returns [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: &Theta) -> OptResult<()> {
    for (index, &value) in theta_hat.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidThetaHat {
                index,
                value,
                reason: "Parameter estimates must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate that a scalar cost is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_cost(value: Cost) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}
