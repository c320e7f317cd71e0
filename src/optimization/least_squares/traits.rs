//! Public API surface for bounded nonlinear least squares.
//!
//! - [`ResidualModel`]: trait users implement for their model.
//! - [`LsqOptions`]: validated configuration for the solver.
//! - [`LsqStatus`]: which convergence test ended a run.
//! - [`LsqOutcome`]: normalized result returned by the high-level `minimize` API.
//!
//! Convention: we *minimize* the cost `c(θ) = ½·‖r(θ)‖²`. If an analytic
//! Jacobian is provided it must be the Jacobian of the residuals,
//! `J_ij = ∂r_i/∂θ_j`.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        types::{
            Cost, DEFAULT_FTOL, DEFAULT_GTOL, DEFAULT_STEP_BOUND, DEFAULT_XTOL, JacobianMatrix,
            Residuals, Theta, default_max_iter,
        },
        validation::{
            validate_cost, validate_theta_hat, verify_ftol, verify_gtol, verify_max_iter,
            verify_step_bound, verify_xtol,
        },
    },
};

/// User-implemented residual interface.
///
/// - `type Data`: per-model data carried into `residuals`/`jacobian`/`check`.
///
/// Required:
/// - `residuals(&Theta, &Data) -> OptResult<Residuals>`: evaluate `r(θ)`.
///   Non-finite residuals are allowed here; the problem bridge reports them
///   so the solver can treat the trial point as a bad step.
/// - `check(&Theta, &Data) -> OptResult<()>`: validation hook to reject
///   obviously invalid `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `jacobian(&Theta, &Data) -> OptResult<JacobianMatrix>`: analytic
///   Jacobian of the residuals. If not implemented, finite differences are
///   used automatically.
pub trait ResidualModel {
    type Data;

    // Required methods
    fn residuals(&self, theta: &Theta, data: &Self::Data) -> OptResult<Residuals>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn jacobian(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<JacobianMatrix> {
        Err(OptError::JacobianNotImplemented)
    }
}

/// Solver configuration, passed through to MINPACK-style
/// Levenberg–Marquardt.
///
/// Fields:
/// - `xtol`: stop when the relative error between two consecutive iterates
///   is at most `xtol`.
/// - `ftol`: stop when both the actual and predicted relative reductions of
///   the cost are at most `ftol`.
/// - `gtol`: stop when the largest cosine between the residuals and a
///   Jacobian column is at most `gtol`.
/// - `max_iter`: residual-evaluation budget; `None` means `200·(n + 1)`.
/// - `step_bound`: initial step bound factor.
///
/// Default:
/// - `xtol = 1e-6`, `ftol = 1e-8`, `gtol = 1e-8`, `max_iter = None`,
///   `step_bound = 100`.
///
/// Each `with_*` builder overrides one field and re-validates it, leaving the
/// remaining fields at their current values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LsqOptions {
    pub xtol: f64,
    pub ftol: f64,
    pub gtol: f64,
    pub max_iter: Option<usize>,
    pub step_bound: f64,
}

impl LsqOptions {
    /// Construct validated solver options.
    ///
    /// # Errors
    /// - [`OptError::InvalidXTol`] / [`OptError::InvalidFTol`] /
    ///   [`OptError::InvalidGTol`] for non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == Some(0)`.
    /// - [`OptError::InvalidStepBound`] for a non-finite or non-positive
    ///   step bound.
    pub fn new(
        xtol: f64, ftol: f64, gtol: f64, max_iter: Option<usize>, step_bound: f64,
    ) -> OptResult<Self> {
        verify_xtol(xtol)?;
        verify_ftol(ftol)?;
        verify_gtol(gtol)?;
        verify_max_iter(max_iter)?;
        verify_step_bound(step_bound)?;
        Ok(Self { xtol, ftol, gtol, max_iter, step_bound })
    }

    pub fn with_xtol(self, xtol: f64) -> OptResult<Self> {
        verify_xtol(xtol)?;
        Ok(Self { xtol, ..self })
    }

    pub fn with_ftol(self, ftol: f64) -> OptResult<Self> {
        verify_ftol(ftol)?;
        Ok(Self { ftol, ..self })
    }

    pub fn with_gtol(self, gtol: f64) -> OptResult<Self> {
        verify_gtol(gtol)?;
        Ok(Self { gtol, ..self })
    }

    pub fn with_max_iter(self, max_iter: usize) -> OptResult<Self> {
        verify_max_iter(Some(max_iter))?;
        Ok(Self { max_iter: Some(max_iter), ..self })
    }

    pub fn with_step_bound(self, step_bound: f64) -> OptResult<Self> {
        verify_step_bound(step_bound)?;
        Ok(Self { step_bound, ..self })
    }

    /// Evaluation budget for a problem with `n_params` free parameters.
    pub fn resolved_max_iter(&self, n_params: usize) -> usize {
        self.max_iter.unwrap_or_else(|| default_max_iter(n_params))
    }
}

impl Default for LsqOptions {
    fn default() -> Self {
        Self {
            xtol: DEFAULT_XTOL,
            ftol: DEFAULT_FTOL,
            gtol: DEFAULT_GTOL,
            max_iter: None,
            step_bound: DEFAULT_STEP_BOUND,
        }
    }
}

/// Convergence test that terminated a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsqStatus {
    /// Step size fell below the parameter-change tolerance.
    XtolReached,
    /// Relative cost reduction fell below the cost tolerance.
    FtolReached,
    /// Residuals became orthogonal to the Jacobian columns within `gtol`.
    GtolReached,
    /// The model reproduces the data exactly.
    ResidualsZero,
}

impl std::fmt::Display for LsqStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LsqStatus::XtolReached => write!(f, "parameter change below xtol"),
            LsqStatus::FtolReached => write!(f, "relative cost reduction below ftol"),
            LsqStatus::GtolReached => write!(f, "scaled gradient below gtol"),
            LsqStatus::ResidualsZero => write!(f, "residuals are exactly zero"),
        }
    }
}

/// Canonical result returned by `minimize`.
///
/// - `theta_hat`: converged parameter vector (inside the bounds).
/// - `cost`: `½·‖r(θ̂)‖²`.
/// - `status`: which convergence test fired.
/// - `n_evals`: residual evaluations, including rejected trial points.
#[derive(Debug, Clone, PartialEq)]
pub struct LsqOutcome {
    pub theta_hat: Theta,
    pub cost: Cost,
    pub status: LsqStatus,
    pub n_evals: usize,
}

impl LsqOutcome {
    /// Build a validated [`LsqOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - [`OptError::InvalidThetaHat`] if `theta_hat` has a non-finite entry.
    /// - [`OptError::NonFiniteCost`] if `cost` is not finite.
    pub fn new(
        theta_hat: Theta, cost: Cost, status: LsqStatus, n_evals: usize,
    ) -> OptResult<Self> {
        validate_theta_hat(&theta_hat)?;
        validate_cost(cost)?;
        Ok(Self { theta_hat, cost, status, n_evals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Defaults and override semantics of `LsqOptions`.
    // - Validation performed by `LsqOutcome::new`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that `with_*` overrides one field and keeps the others.
    //
    // Given
    // -----
    // - `LsqOptions::default()` overridden with `max_iter = 50`.
    //
    // Expect
    // ------
    // - `max_iter == Some(50)` and `xtol` remains at its 1e-6 default.
    // - With no override the cap resolves to `200·(k + 1)`.
    fn with_max_iter_keeps_default_tolerances() {
        // Arrange
        let base = LsqOptions::default();

        // Act
        let opts = base.with_max_iter(50).unwrap();

        // Assert
        assert_eq!(opts.max_iter, Some(50));
        assert_eq!(opts.xtol, 1e-6);
        assert_eq!(opts.resolved_max_iter(3), 50);
        assert_eq!(base.resolved_max_iter(3), 800);
    }

    #[test]
    // Purpose
    // -------
    // Ensure invalid overrides surface as errors rather than silently applying.
    //
    // Given
    // -----
    // - `with_xtol(-1.0)` and `with_max_iter(0)`.
    //
    // Expect
    // ------
    // - `InvalidXTol` and `InvalidMaxIter` respectively.
    fn invalid_overrides_are_rejected() {
        // Arrange
        let base = LsqOptions::default();

        // Act / Assert
        assert!(matches!(base.with_xtol(-1.0), Err(OptError::InvalidXTol { .. })));
        assert!(matches!(base.with_max_iter(0), Err(OptError::InvalidMaxIter { .. })));
        assert!(matches!(
            LsqOptions::new(1e-6, 1e-8, 1e-8, None, 0.0),
            Err(OptError::InvalidStepBound { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Confirm `LsqOutcome::new` rejects non-finite estimates.
    //
    // Given
    // -----
    // - θ̂ containing NaN with a finite cost.
    //
    // Expect
    // ------
    // - `InvalidThetaHat { index: 1 }`.
    fn outcome_rejects_non_finite_theta_hat() {
        // Arrange
        let theta_hat = array![1.0, f64::NAN];

        // Act
        let result = LsqOutcome::new(theta_hat, 0.5, LsqStatus::XtolReached, 7);

        // Assert
        assert!(matches!(result, Err(OptError::InvalidThetaHat { index: 1, .. })));
    }
}
