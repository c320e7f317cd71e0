//! Execution helper that runs a bounded Levenberg–Marquardt solve on a
//! residual problem and returns a crate-friendly [`LsqOutcome`].
//!
//! The iteration itself is MINPACK's trust-region Levenberg–Marquardt from the
//! `levenberg_marquardt` crate, run over the internal coordinates of a
//! [`BoundedProblem`]. A bounded run has two passes:
//!
//! 1. Solve over every parameter through the bounded-parameter transform.
//! 2. Pin each parameter that converged next to a bound with the cost
//!    gradient pointing out of the box, and re-solve over the remaining ones.
//!    The pinned result replaces the first one only if its cost is no larger.
//!
//! The transform alone approaches an active bound only asymptotically; the
//! second pass puts such parameters exactly on the bound and re-optimizes the
//! free ones there.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        bounds::Bounds,
        problem::BoundedProblem,
        traits::{LsqOptions, LsqOutcome, LsqStatus, ResidualModel},
        types::{Cost, Theta},
    },
};
use levenberg_marquardt::{LevenbergMarquardt, TerminationReason};

/// State at the end of one optimizer pass.
#[derive(Debug, Clone)]
struct Pass {
    theta: Theta,
    cost: Cost,
    status: LsqStatus,
    n_evals: usize,
}

/// Run a bounded Levenberg–Marquardt minimization of `½·‖r(θ)‖²`.
///
/// # Arguments
/// - `model`, `data`: the residual map and its data.
/// - `n_obs`: residual length, fixed for every evaluation.
/// - `theta0`: Initial parameter vector, inside `bounds` when given.
/// - `bounds`: Optional box constraints.
/// - `opts`: Tolerances, evaluation budget and initial step bound.
///
/// # Returns
/// An [`LsqOutcome`] with the converged parameters, final cost, the
/// convergence test that fired, and the evaluation count over both passes.
///
/// # Errors
/// - Jacobian errors at an accepted point.
/// - `OptError::MaxIterReached` when the evaluation budget is spent.
/// - `OptError::NumericalBreakdown` / `OptError::BackendError` for other
///   unsuccessful terminations.
pub fn run_levenberg_marquardt<M: ResidualModel>(
    model: &M, data: &M::Data, n_obs: usize, theta0: Theta, bounds: Option<&Bounds>,
    opts: &LsqOptions,
) -> OptResult<LsqOutcome> {
    let n_params = theta0.len();
    let max_iter = opts.resolved_max_iter(n_params);
    let problem = BoundedProblem::new(model, data, n_obs, bounds, theta0, (0..n_params).collect());
    let first = solve_pass(problem, opts, max_iter)?;

    let best = match bounds {
        Some(b) => polish_active(model, data, n_obs, b, first, opts, max_iter)?,
        None => first,
    };
    LsqOutcome::new(best.theta, best.cost, best.status, best.n_evals)
}

/// Re-solve with every active bound pinned; keep whichever pass is cheaper.
fn polish_active<M: ResidualModel>(
    model: &M, data: &M::Data, n_obs: usize, bounds: &Bounds, first: Pass, opts: &LsqOptions,
    max_iter: usize,
) -> OptResult<Pass> {
    let at_first = BoundedProblem::new(model, data, n_obs, None, first.theta.clone(), Vec::new());
    let grad = match (at_first.evaluate(&first.theta), at_first.model_jacobian(&first.theta)) {
        (Ok(residuals), Ok(jac)) => jac.t().dot(&residuals),
        _ => return Ok(first),
    };

    let mut pinned = first.theta.clone();
    let mut free = Vec::with_capacity(pinned.len());
    for (j, value) in pinned.iter_mut().enumerate() {
        match bounds.active_bound(j, *value, grad[j]) {
            Some(bound) => *value = bound,
            None => free.push(j),
        }
    }
    if free.len() == pinned.len() {
        return Ok(first);
    }

    let second = if free.is_empty() {
        let cost = at_first.cost(&pinned)?;
        Pass { theta: pinned, cost, status: first.status, n_evals: 1 }
    } else {
        let problem = BoundedProblem::new(model, data, n_obs, Some(bounds), pinned, free);
        match solve_pass(problem, opts, max_iter) {
            Ok(pass) => pass,
            Err(_) => return Ok(first),
        }
    };

    let total = first.n_evals + second.n_evals + 1;
    if second.cost <= first.cost {
        Ok(Pass { n_evals: total, ..second })
    } else {
        Ok(Pass { n_evals: total, ..first })
    }
}

/// Minimize over the problem's free coordinates.
///
/// The evaluation budget `max_iter` is converted to the backend's patience,
/// which allows `patience·(n_free + 1)` residual evaluations.
fn solve_pass<M: ResidualModel>(
    problem: BoundedProblem<'_, M>, opts: &LsqOptions, max_iter: usize,
) -> OptResult<Pass> {
    let patience = max_iter.div_ceil(problem.n_free() + 1).max(1);
    let (problem, report) = LevenbergMarquardt::new()
        .with_xtol(opts.xtol)
        .with_ftol(opts.ftol)
        .with_gtol(opts.gtol)
        .with_stepbound(opts.step_bound)
        .with_patience(patience)
        .minimize(problem);

    let status = match report.termination {
        TerminationReason::ResidualsZero => LsqStatus::ResidualsZero,
        TerminationReason::Orthogonal => LsqStatus::GtolReached,
        TerminationReason::Converged { xtol: true, .. } => LsqStatus::XtolReached,
        TerminationReason::Converged { .. } => LsqStatus::FtolReached,
        ref other => {
            return Err(problem
                .take_failure()
                .unwrap_or_else(|| OptError::from_termination(other, max_iter)));
        }
    };
    Ok(Pass {
        theta: problem.theta().clone(),
        cost: report.objective_function,
        status,
        n_evals: report.number_of_evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::least_squares::types::{JacobianMatrix, Residuals};
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Exact recovery on linear least squares with an analytic Jacobian.
    // - Noiseless recovery of a three-parameter exponential via the FD path.
    // - Optima on an active bound, against the solution with that parameter
    //   fixed.
    // - `MaxIterReached` when the evaluation budget is too small.
    // -------------------------------------------------------------------------

    struct Linear {
        a: Array2<f64>,
        b: Array1<f64>,
    }

    impl ResidualModel for Linear {
        type Data = ();

        fn residuals(&self, theta: &Theta, _: &()) -> OptResult<Residuals> {
            Ok(self.a.dot(theta) - &self.b)
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }

        fn jacobian(&self, _: &Theta, _: &()) -> OptResult<JacobianMatrix> {
            Ok(self.a.clone())
        }
    }

    /// `S0·exp(−t/T) + c` with finite-difference Jacobian.
    struct ExpOffset;

    impl ResidualModel for ExpOffset {
        type Data = (Array1<f64>, Array1<f64>);

        fn residuals(&self, theta: &Theta, data: &Self::Data) -> OptResult<Residuals> {
            let (t, y) = data;
            Ok(t.mapv(|ti| theta[0] * (-ti / theta[1]).exp() + theta[2]) - y)
        }

        fn check(&self, _: &Theta, _: &Self::Data) -> OptResult<()> {
            Ok(())
        }
    }

    /// `S0·exp(−t/T) + c` with `c` fixed, over `(S0, T)` only.
    struct ExpFixedOffset {
        offset: f64,
    }

    impl ResidualModel for ExpFixedOffset {
        type Data = (Array1<f64>, Array1<f64>);

        fn residuals(&self, theta: &Theta, data: &Self::Data) -> OptResult<Residuals> {
            ExpOffset.residuals(&array![theta[0], theta[1], self.offset], data)
        }

        fn check(&self, _: &Theta, _: &Self::Data) -> OptResult<()> {
            Ok(())
        }
    }

    /// Rosenbrock written as residuals `[10(θ₁ − θ₀²), 1 − θ₀]`.
    struct Rosenbrock;

    impl ResidualModel for Rosenbrock {
        type Data = ();

        fn residuals(&self, theta: &Theta, _: &()) -> OptResult<Residuals> {
            Ok(array![10.0 * (theta[1] - theta[0] * theta[0]), 1.0 - theta[0]])
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    fn decay_data() -> (Array1<f64>, Array1<f64>) {
        let t = array![0.0, 20.0, 80.0, 140.0];
        let y = t.mapv(|ti: f64| 1000.0 * (-ti / 40.0).exp() + 50.0);
        (t, y)
    }

    #[test]
    // Purpose
    // -------
    // Verify convergence to the normal-equation solution of a linear problem.
    //
    // Given
    // -----
    // - `A = [[1, 0], [0, 2], [1, 1]]`, `b = A·[3, -1]` (consistent system).
    //
    // Expect
    // ------
    // - θ̂ ≈ [3, -1] and cost ≈ 0.
    fn linear_problem_recovers_exact_solution() {
        // Arrange
        let a = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let b = a.dot(&array![3.0, -1.0]);
        let model = Linear { a, b };

        // Act
        let out = run_levenberg_marquardt(
            &model,
            &(),
            3,
            array![0.0, 0.0],
            None,
            &LsqOptions::default(),
        )
        .unwrap();

        // Assert
        assert_relative_eq!(out.theta_hat[0], 3.0, max_relative = 1e-6);
        assert_relative_eq!(out.theta_hat[1], -1.0, max_relative = 1e-6);
        assert!(out.cost < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Ensure noiseless exponential data are recovered through the FD Jacobian.
    //
    // Given
    // -----
    // - Truth (1000, 40, 50), t = [0, 10, 20, 40, 80, 140].
    // - Start (800, 25, 0).
    //
    // Expect
    // ------
    // - Each parameter within 1e-4 relative of the truth.
    fn exponential_fit_recovers_noiseless_parameters() {
        // Arrange
        let t = array![0.0, 10.0, 20.0, 40.0, 80.0, 140.0];
        let y = t.mapv(|ti: f64| 1000.0 * (-ti / 40.0).exp() + 50.0);
        let data = (t, y);

        // Act
        let out = run_levenberg_marquardt(
            &ExpOffset,
            &data,
            6,
            array![800.0, 25.0, 0.0],
            None,
            &LsqOptions::default(),
        )
        .unwrap();

        // Assert
        assert_relative_eq!(out.theta_hat[0], 1000.0, max_relative = 1e-4);
        assert_relative_eq!(out.theta_hat[1], 40.0, max_relative = 1e-4);
        assert_relative_eq!(out.theta_hat[2], 50.0, max_relative = 1e-4);
    }

    #[test]
    // Purpose
    // -------
    // Confirm that an active upper bound is hit exactly.
    //
    // Given
    // -----
    // - Residuals `θ·t − 2t` (unconstrained optimum θ = 2).
    // - Bounds `[0, 1]`, start θ = 1 (on the bound).
    //
    // Expect
    // ------
    // - θ̂ == 1.
    fn active_bound_is_respected() {
        // Arrange
        let a = array![[1.0], [2.0], [3.0]];
        let b = a.column(0).mapv(|t| 2.0 * t);
        let model = Linear { a, b };
        let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();

        // Act
        let out = run_levenberg_marquardt(
            &model,
            &(),
            3,
            array![1.0],
            Some(&bounds),
            &LsqOptions::default(),
        )
        .unwrap();

        // Assert
        assert_eq!(out.theta_hat[0], 1.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify that a bounded fit whose optimum lies on a bound matches the fit
    // with that parameter fixed at the bound, and satisfies the projected
    // gradient condition.
    //
    // Given
    // -----
    // - Noiseless decay with truth (1000, 40, 50) at t = [0, 20, 80, 140].
    // - Bounds `[0, 5000] × [1, 500] × [lo, 500]` with lo ∈ {80, 120}, so
    //   the offset is pushed onto its lower bound.
    // - Reference: an unbounded fit of (S0, T) with the offset fixed at lo.
    //
    // Expect
    // ------
    // - Offset exactly lo; S0 and T within 1e-4 relative of the reference.
    // - Cost no more than the reference cost (1e-8 relative slack).
    // - Cost gradient ≈ 0 along S0 and T, and positive along the offset.
    fn bounded_optimum_on_lower_bound_matches_fixed_parameter_fit() {
        for lo in [80.0, 120.0] {
            // Arrange
            let data = decay_data();
            let bounds = Bounds::new(vec![0.0, 1.0, lo], vec![5000.0, 500.0, 500.0]).unwrap();
            let opts = LsqOptions::default();
            let fixed = ExpFixedOffset { offset: lo };
            let reference =
                run_levenberg_marquardt(&fixed, &data, 4, array![900.0, 35.0], None, &opts)
                    .unwrap();

            // Act
            let out = run_levenberg_marquardt(
                &ExpOffset,
                &data,
                4,
                array![900.0, 35.0, lo],
                Some(&bounds),
                &opts,
            )
            .unwrap();

            // Assert
            assert_eq!(out.theta_hat[2], lo);
            assert_relative_eq!(out.theta_hat[0], reference.theta_hat[0], max_relative = 1e-4);
            assert_relative_eq!(out.theta_hat[1], reference.theta_hat[1], max_relative = 1e-4);
            assert!(out.cost <= reference.cost * (1.0 + 1e-8));

            let problem =
                BoundedProblem::new(&ExpOffset, &data, 4, None, out.theta_hat.clone(), vec![]);
            let r = problem.evaluate(&out.theta_hat).unwrap();
            let jac = problem.model_jacobian(&out.theta_hat).unwrap();
            let grad = jac.t().dot(&r);
            let r_norm = r.dot(&r).sqrt();
            for j in 0..2 {
                let col_norm = jac.column(j).dot(&jac.column(j)).sqrt();
                assert!(grad[j].abs() <= 1e-3 * col_norm * r_norm, "free gradient {j}");
            }
            assert!(grad[2] > 0.0);
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure the evaluation budget surfaces as `MaxIterReached`.
    //
    // Given
    // -----
    // - Rosenbrock residuals from (-1.2, 1) with `max_iter = 1`.
    //
    // Expect
    // ------
    // - `Err(OptError::MaxIterReached { max_iter: 1 })`.
    fn evaluation_budget_yields_max_iter_reached() {
        // Arrange
        let opts = LsqOptions::default().with_max_iter(1).unwrap();

        // Act
        let result = run_levenberg_marquardt(&Rosenbrock, &(), 2, array![-1.2, 1.0], None, &opts);

        // Assert
        assert_eq!(result.unwrap_err(), OptError::MaxIterReached { max_iter: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Verify the full Rosenbrock problem converges with the default budget.
    //
    // Given
    // -----
    // - Rosenbrock residuals from (-1.2, 1).
    //
    // Expect
    // ------
    // - θ̂ ≈ (1, 1).
    fn rosenbrock_converges_with_default_budget() {
        // Act
        let out = run_levenberg_marquardt(
            &Rosenbrock,
            &(),
            2,
            array![-1.2, 1.0],
            None,
            &LsqOptions::default(),
        )
        .unwrap();

        // Assert
        assert_relative_eq!(out.theta_hat[0], 1.0, max_relative = 1e-5);
        assert_relative_eq!(out.theta_hat[1], 1.0, max_relative = 1e-5);
    }
}
