//! High-level entry point for minimizing a user-provided `ResidualModel`.
//!
//! This validates the inputs and the starting residuals, then delegates the
//! run to `run_levenberg_marquardt`.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        bounds::Bounds,
        run::run_levenberg_marquardt,
        traits::{LsqOptions, LsqOutcome, ResidualModel},
        types::Theta,
        validation::validate_residuals,
    },
};

/// Minimize `½·‖r(θ)‖²` with bounded Levenberg–Marquardt.
///
/// # Behavior
/// - Validates the initial guess via `model.check(theta0, data)`.
/// - Checks that `bounds` (if any) match `theta0.len()`.
/// - Evaluates the residuals once at the start (clamped into the bounds) to
///   fix the number of observations, rejects non-finite starting residuals
///   and under-determined problems.
/// - Calls `run_levenberg_marquardt`, which iterates until one of the
///   `xtol`/`ftol`/`gtol` tests passes.
///
/// # Parameters
/// - `model`: Your model implementing [`ResidualModel`].
/// - `theta0`: Initial parameter vector.
/// - `data`: Model data passed through to `residuals`/`jacobian`.
/// - `bounds`: Optional box constraints.
/// - `opts`: Solver options.
///
/// # Errors
/// - Propagates any error from `model.check`.
/// - `OptError::BoundsDimMismatch` for bounds of the wrong length.
/// - `OptError::NonFiniteResidual` when the model cannot be evaluated at the
///   start.
/// - `OptError::InsufficientData` when there are fewer residuals than
///   parameters.
/// - Propagates runtime errors from `run_levenberg_marquardt`.
///
/// # Example
/// ```
/// use ndarray::array;
/// use relaxfit::optimization::errors::OptResult;
/// use relaxfit::optimization::least_squares::{
///     minimize, LsqOptions, ResidualModel, Residuals, Theta,
/// };
///
/// struct Line;
/// impl ResidualModel for Line {
///     type Data = (Vec<f64>, Vec<f64>);
///     fn residuals(&self, theta: &Theta, data: &Self::Data) -> OptResult<Residuals> {
///         let (x, y) = data;
///         Ok(x.iter().zip(y).map(|(xi, yi)| theta[0] * xi + theta[1] - yi).collect())
///     }
///     fn check(&self, _: &Theta, _: &Self::Data) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let data = (vec![0.0, 1.0, 2.0], vec![1.0, 3.0, 5.0]);
/// let out = minimize(&Line, array![0.0, 0.0], &data, None, &LsqOptions::default())?;
/// assert!((out.theta_hat[0] - 2.0).abs() < 1e-6);
/// # Ok::<(), relaxfit::optimization::errors::OptError>(())
/// ```
pub fn minimize<M: ResidualModel>(
    model: &M, theta0: Theta, data: &M::Data, bounds: Option<&Bounds>, opts: &LsqOptions,
) -> OptResult<LsqOutcome> {
    model.check(&theta0, data)?;
    let n_params = theta0.len();
    if let Some(b) = bounds {
        b.check_dim(n_params)?;
    }
    let start = match bounds {
        Some(b) => b.project(&theta0),
        None => theta0.clone(),
    };
    let residuals = model.residuals(&start, data)?;
    let n_obs = residuals.len();
    if n_obs < n_params {
        return Err(OptError::InsufficientData { n_obs, n_params });
    }
    validate_residuals(&residuals, n_obs)?;
    run_levenberg_marquardt(model, data, n_obs, start, bounds, opts)
}
