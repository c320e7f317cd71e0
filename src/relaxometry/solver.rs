//! Per-voxel solver — fit one signal curve and report parameters or a reason.
//!
//! Purpose
//! -------
//! Turn one voxel's intensity-over-time curve into fitted model parameters.
//! Every failure mode (bad input, non-finite seed, optimizer breakdown) is
//! returned as a [`FitFailure`]; nothing here panics or aborts the batch.
//!
//! Key behaviors
//! -------------
//! - Optional normalization rescales `y` by `max(y)` (skipped when
//!   `max(y) ≤ 0`).
//! - Seed selection, in priority order: a caller-supplied initial guess, the
//!   amplitude/decay/offset heuristic from [`init`](crate::relaxometry::init)
//!   when enabled, otherwise all ones. The seed is clamped into the bounds.
//! - Bounded Levenberg–Marquardt via
//!   [`minimize`](crate::optimization::least_squares::minimize) with
//!   parameter-change tolerance `1e-6` unless overridden.
//!
//! Downstream usage
//! ----------------
//! - The engine builds one [`VoxelSolver`] per batch and calls
//!   [`VoxelSolver::solve`] from worker threads; the solver only holds shared
//!   references and is `Sync`.
use crate::{
    optimization::least_squares::{LsqOptions, LsqStatus, minimize},
    relaxometry::{
        bounds::ParamBounds,
        errors::{FitFailure, RelaxError, RelaxResult},
        init::estimate_initial,
        models::{CurveData, SignalModel},
    },
};
use ndarray::Array1;

/// Fitted parameters for one voxel.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedParams {
    /// Parameter estimates in model order (see `SignalModel::param_names`).
    pub values: Array1<f64>,
    /// Final `½·SSR` on the (possibly normalized) signal.
    pub cost: f64,
    /// Residual evaluations spent by the optimizer.
    pub n_evals: usize,
    pub status: LsqStatus,
}

/// Outcome of a single voxel solve.
pub type VoxelSolution = Result<FittedParams, FitFailure>;

/// Caller overrides for the per-voxel solve.
///
/// - `lsq`: optimizer tolerances and iteration cap.
/// - `initial_guess`: fixed starting point used for every voxel, overriding
///   both the heuristic and the all-ones default.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolveOptions {
    pub lsq: LsqOptions,
    pub initial_guess: Option<Array1<f64>>,
}

impl SolveOptions {
    pub fn new(lsq: LsqOptions, initial_guess: Option<Array1<f64>>) -> Self {
        Self { lsq, initial_guess }
    }

    /// Check the initial guess against `model`.
    ///
    /// # Errors
    /// [`RelaxError::InitialGuessLengthMismatch`] if the lengths differ.
    pub fn validate_for(&self, model: &SignalModel) -> RelaxResult<()> {
        if let Some(guess) = &self.initial_guess {
            if guess.len() != model.n_params() {
                return Err(RelaxError::InitialGuessLengthMismatch {
                    expected: model.n_params(),
                    found: guess.len(),
                });
            }
        }
        Ok(())
    }
}

/// Shared, read-only solve configuration for one batch.
#[derive(Debug, Clone, Copy)]
pub struct VoxelSolver<'a> {
    pub model: &'a SignalModel,
    pub bounds: Option<&'a ParamBounds>,
    pub options: &'a SolveOptions,
    pub normalize: bool,
    pub estimate_initial: bool,
}

impl<'a> VoxelSolver<'a> {
    /// Fit `model` to `(x, y)`.
    ///
    /// Returns
    /// -------
    /// `Ok(FittedParams)` with finite values inside the bounds, or the
    /// [`FitFailure`] explaining why no parameters were produced.
    pub fn solve(&self, y: &[f64], x: &[f64]) -> VoxelSolution {
        if y.len() != x.len() {
            return Err(FitFailure::LengthMismatch { y_len: y.len(), x_len: x.len() });
        }
        let mut signal = Array1::from(y.to_vec());
        if self.normalize {
            normalize_in_place(&mut signal);
        }

        let mut seed = self.seed(signal.as_slice().unwrap_or(y), x);
        if let Some(bounds) = self.bounds {
            bounds.clamp(&mut seed);
        }
        if let Some((index, &value)) = seed.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(FitFailure::NonFiniteSeed { index, value });
        }

        let data = CurveData { x: Array1::from(x.to_vec()), y: signal };
        let outcome = minimize(
            self.model,
            seed,
            &data,
            self.bounds.map(ParamBounds::as_box),
            &self.options.lsq,
        )?;
        Ok(FittedParams {
            values: outcome.theta_hat,
            cost: outcome.cost,
            n_evals: outcome.n_evals,
            status: outcome.status,
        })
    }

    fn seed(&self, y: &[f64], x: &[f64]) -> Array1<f64> {
        if let Some(guess) = &self.options.initial_guess {
            return guess.clone();
        }
        if self.estimate_initial {
            estimate_initial(y, x)
        } else {
            Array1::ones(self.model.n_params())
        }
    }
}

/// Fit one voxel curve; free-function form of [`VoxelSolver::solve`].
pub fn solve(
    y: &[f64], x: &[f64], model: &SignalModel, bounds: Option<&ParamBounds>,
    options: &SolveOptions, normalize: bool, estimate_initial: bool,
) -> VoxelSolution {
    VoxelSolver { model, bounds, options, normalize, estimate_initial }.solve(y, x)
}

/// Divide by the maximum when it is positive; otherwise leave `y` unchanged.
pub fn normalize_in_place(y: &mut Array1<f64>) {
    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        y.mapv_inplace(|v| v / max);
    }
}
