//! Bridge that exposes a user `ResidualModel` as a `levenberg_marquardt`
//! problem.
//!
//! The optimizer works on a vector of internal coordinates, one per *free*
//! parameter; pinned parameters keep a fixed value and never reach it. Each
//! free coordinate is mapped to θ through the bounded-parameter transform of
//! [`Bounds`], so every trial point is feasible. The Jacobian is assembled in θ
//! (analytic, or finite differences when the model has none) and then scaled
//! column-wise by `dθ/dq`.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        bounds::Bounds,
        finite_diff::compute_jacobian,
        traits::ResidualModel,
        types::{Cost, JacobianMatrix, PENALTY_RESIDUAL, Residuals, Theta},
        validation::{validate_jacobian, validate_residuals},
    },
};
use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::{DMatrix, DVector, Dyn, Owned};
use std::cell::RefCell;

/// A `ResidualModel` + data pair seen through the bounded-parameter transform.
///
/// - `residuals` returns `r(θ)`. A trial point where the model fails or
///   produces a non-finite residual gets [`PENALTY_RESIDUAL`] entries, so the
///   optimizer rejects the step and shrinks its trust region.
/// - `jacobian` returns `∂r/∂q`. A failed Jacobian is recorded and reported
///   through [`BoundedProblem::take_failure`].
pub struct BoundedProblem<'a, M: ResidualModel> {
    model: &'a M,
    data: &'a M::Data,
    n_obs: usize,
    bounds: Option<&'a Bounds>,
    free: Vec<usize>,
    theta: Theta,
    internal: DVector<f64>,
    failure: RefCell<Option<OptError>>,
}

impl<'a, M: ResidualModel> BoundedProblem<'a, M> {
    /// Construct a problem starting at `start`, optimizing only the
    /// coordinates listed in `free`; the others stay at their `start` value.
    ///
    /// `n_obs` fixes the residual length every evaluation is checked against.
    pub fn new(
        model: &'a M, data: &'a M::Data, n_obs: usize, bounds: Option<&'a Bounds>, start: Theta,
        free: Vec<usize>,
    ) -> Self {
        let internal = DVector::from_iterator(
            free.len(),
            free.iter().map(|&j| match bounds {
                Some(b) => b.to_internal(j, start[j]),
                None => start[j],
            }),
        );
        let mut problem = Self {
            model,
            data,
            n_obs,
            bounds,
            free,
            theta: start,
            internal: DVector::zeros(0),
            failure: RefCell::new(None),
        };
        problem.set_params(&internal);
        problem
    }

    /// Current parameter vector in model coordinates.
    pub fn theta(&self) -> &Theta {
        &self.theta
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    /// Evaluate and validate the residuals at `theta`.
    ///
    /// # Errors
    /// - Propagates any `OptError` from the user's `residuals`.
    /// - `ResidualDimMismatch` / `NonFiniteResidual` from validation.
    pub fn evaluate(&self, theta: &Theta) -> OptResult<Residuals> {
        let residuals = self.model.residuals(theta, self.data)?;
        validate_residuals(&residuals, self.n_obs)?;
        Ok(residuals)
    }

    /// `½·‖r(θ)‖²` at `theta`.
    pub fn cost(&self, theta: &Theta) -> OptResult<Cost> {
        let residuals = self.evaluate(theta)?;
        Ok(0.5 * residuals.dot(&residuals))
    }

    /// Residual Jacobian `∂r/∂θ` over all parameters at `theta`.
    ///
    /// Behavior:
    /// - If the model implements `jacobian(θ, data)`, validate and return it.
    /// - On `JacobianNotImplemented`, finite-difference the residual map
    ///   (central first, forward fallback per row).
    ///
    /// # Errors
    /// - Propagates model errors other than `JacobianNotImplemented`.
    /// - Propagates residual failures raised during finite differencing.
    /// - Returns validation errors for a wrong shape or non-finite entries.
    pub fn model_jacobian(&self, theta: &Theta) -> OptResult<JacobianMatrix> {
        match self.model.jacobian(theta, self.data) {
            Ok(jac) => {
                validate_jacobian(&jac, self.n_obs, theta.len())?;
                Ok(jac)
            }
            Err(OptError::JacobianNotImplemented) => {
                let residual_fn = |p: &Theta| self.evaluate(p);
                compute_jacobian(theta, self.n_obs, &residual_fn)
            }
            Err(e) => Err(e),
        }
    }

    /// Error recorded by the last failed Jacobian evaluation, if any.
    pub fn take_failure(&self) -> Option<OptError> {
        self.failure.take()
    }

    fn slope(&self, j: usize, q: f64) -> f64 {
        self.bounds.map_or(1.0, |b| b.external_slope(j, q))
    }
}

impl<'a, M: ResidualModel> LeastSquaresProblem<f64, Dyn, Dyn> for BoundedProblem<'a, M> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, q: &DVector<f64>) {
        self.internal = q.clone();
        for (k, &j) in self.free.iter().enumerate() {
            self.theta[j] = match self.bounds {
                Some(b) => b.to_external(j, q[k]),
                None => q[k],
            };
        }
    }

    fn params(&self) -> DVector<f64> {
        self.internal.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let residuals = match self.evaluate(&self.theta) {
            Ok(r) => DVector::from_iterator(self.n_obs, r.iter().copied()),
            Err(_) => DVector::from_element(self.n_obs, PENALTY_RESIDUAL),
        };
        Some(residuals)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let jac = match self.model_jacobian(&self.theta) {
            Ok(jac) => jac,
            Err(err) => {
                self.failure.replace(Some(err));
                return None;
            }
        };
        Some(DMatrix::from_fn(self.n_obs, self.free.len(), |i, k| {
            let j = self.free[k];
            jac[[i, j]] * self.slope(j, self.internal[k])
        }))
    }
}
