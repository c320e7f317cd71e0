//! Fit options — batch-level configuration for the voxel fitting engine.
//!
//! Purpose
//! -------
//! Collect the knobs that control one engine run in a single validated value:
//! per-voxel solve overrides, signal normalization, worker count, the R²
//! acceptance threshold, and whether the seed heuristic is used.
//!
//! Invariants & assumptions
//! ------------------------
//! - `min_r2` is never NaN (`-inf` accepts every finite R²).
//! - `workers == 0` runs in the calling thread; `workers == N` uses a
//!   dedicated pool of `N` threads.
//! - `estimate_initial == None` defers to
//!   [`SignalModel::supports_initial_estimate`].
//!
//! Conventions
//! -----------
//! - Builders (`with_*`) return a new value and validate the field they set.
use crate::relaxometry::{
    errors::{RelaxError, RelaxResult},
    models::SignalModel,
    solver::SolveOptions,
};

/// FitOptions — engine configuration.
///
/// Fields
/// ------
/// - `solve`: [`SolveOptions`]
///   Optimizer tolerances, iteration cap and optional fixed initial guess.
/// - `normalize`: `bool`
///   Rescale each voxel curve by its maximum before fitting and scoring.
/// - `workers`: `usize`
///   Degree of parallelism; 0 means sequential.
/// - `min_r2`: `f64`
///   Parameters are stored only for voxels with `R² ≥ min_r2`.
/// - `estimate_initial`: `Option<bool>`
///   Force the seed heuristic on or off; `None` uses the model default.
///
/// Default
/// -------
/// No overrides, no normalization, sequential, `min_r2 = -inf`, model
/// default seeding.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub solve: SolveOptions,
    pub normalize: bool,
    pub workers: usize,
    pub min_r2: f64,
    pub estimate_initial: Option<bool>,
}

impl FitOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// [`RelaxError::InvalidMinR2`] if `min_r2` is NaN.
    pub fn new(
        solve: SolveOptions, normalize: bool, workers: usize, min_r2: f64,
        estimate_initial: Option<bool>,
    ) -> RelaxResult<Self> {
        verify_min_r2(min_r2)?;
        Ok(Self { solve, normalize, workers, min_r2, estimate_initial })
    }

    pub fn with_solve(self, solve: SolveOptions) -> Self {
        Self { solve, ..self }
    }

    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    pub fn with_workers(self, workers: usize) -> Self {
        Self { workers, ..self }
    }

    pub fn with_min_r2(self, min_r2: f64) -> RelaxResult<Self> {
        verify_min_r2(min_r2)?;
        Ok(Self { min_r2, ..self })
    }

    pub fn with_estimate_initial(self, estimate_initial: bool) -> Self {
        Self { estimate_initial: Some(estimate_initial), ..self }
    }

    /// Whether the seed heuristic runs for `model`.
    pub fn resolve_estimate_initial(&self, model: &SignalModel) -> bool {
        self.estimate_initial.unwrap_or_else(|| model.supports_initial_estimate())
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            solve: SolveOptions::default(),
            normalize: false,
            workers: 0,
            min_r2: f64::NEG_INFINITY,
            estimate_initial: None,
        }
    }
}

fn verify_min_r2(value: f64) -> RelaxResult<()> {
    if value.is_nan() {
        return Err(RelaxError::InvalidMinR2 { value });
    }
    Ok(())
}
