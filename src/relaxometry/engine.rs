//! Voxel fitting engine — fit a signal model to every masked voxel of a volume.
//!
//! Purpose
//! -------
//! Drive the per-voxel solver across a `[T, X, Y(, Z)]` time-series volume,
//! score each fit, gate it on R², and assemble parameter, R² and status maps.
//!
//! Key behaviors
//! -------------
//! - Shapes are validated up front and 2-D pairs are promoted to unit depth
//!   (see [`promote`]); any violation is a [`RelaxError`] and no maps are
//!   produced.
//! - A reference solve on the first included voxel (`[0, 0, 0]` when the mask
//!   selects nothing) confirms the model's parameter count before dispatch.
//! - Included voxels (mask ≠ 0, row-major order) are materialized into a
//!   worklist and solved either in the calling thread (`workers == 0`) or on a
//!   dedicated rayon pool of `workers` threads.
//! - Aggregation runs single-threaded after the pool joins. Output is
//!   identical for every worker count.
//!
//! Invariants & assumptions
//! ------------------------
//! - A voxel's parameters are either all finite (status `Accepted`) or all
//!   NaN.
//! - R² is written for every voxel the solver returned parameters for, even
//!   when the gate rejects it; excluded and failed voxels keep R² = 0.
//!
//! Conventions
//! -----------
//! - Parameter maps are laid out `[k, X, Y, Z]`, with `k` in
//!   `SignalModel::param_names` order.
use crate::relaxometry::{
    bounds::ParamBounds,
    errors::{FitFailure, RelaxError, RelaxResult},
    goodness::{passes_gate, score},
    models::SignalModel,
    options::FitOptions,
    solver::{VoxelSolution, VoxelSolver},
    volume::promote,
};
use log::{debug, trace, warn};
use ndarray::{Array3, Array4, ArrayView3, ArrayView4, ArrayViewD, Axis, s};
use rayon::prelude::*;

/// Outcome category of one voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoxelStatus {
    /// Mask value is zero; never attempted.
    #[default]
    Excluded,
    /// Solver returned no parameters.
    Failed,
    /// Solved, but R² is below the threshold or non-finite.
    Rejected,
    /// Solved and passed the R² gate; parameters stored.
    Accepted,
}

impl VoxelStatus {
    /// Integer code used by the Python bindings.
    pub const fn code(self) -> u8 {
        match self {
            VoxelStatus::Excluded => 0,
            VoxelStatus::Failed => 1,
            VoxelStatus::Rejected => 2,
            VoxelStatus::Accepted => 3,
        }
    }
}

/// Per-status voxel counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FitSummary {
    pub excluded: usize,
    pub failed: usize,
    pub rejected: usize,
    pub accepted: usize,
}

impl FitSummary {
    /// Voxels the solver was run on.
    pub fn attempted(&self) -> usize {
        self.failed + self.rejected + self.accepted
    }
}

/// Output maps of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct FitMaps {
    /// `[k, X, Y, Z]`, NaN except for accepted voxels.
    pub params: Array4<f64>,
    /// `[X, Y, Z]`, 0 except for solved voxels.
    pub r2: Array3<f64>,
    pub status: Array3<VoxelStatus>,
    pub param_names: Vec<&'static str>,
    /// Failure reason of every `Failed` voxel, in row-major order.
    pub failures: Vec<([usize; 3], FitFailure)>,
    /// Whether the inputs were 2-D and gained a unit depth axis.
    pub promoted: bool,
}

impl FitMaps {
    pub fn n_params(&self) -> usize {
        self.params.len_of(Axis(0))
    }

    /// Voxels the solver returned parameters for (accepted or rejected).
    pub fn success_mask(&self) -> Array3<bool> {
        self.status.mapv(|s| matches!(s, VoxelStatus::Accepted | VoxelStatus::Rejected))
    }

    pub fn accepted_mask(&self) -> Array3<bool> {
        self.status.mapv(|s| s == VoxelStatus::Accepted)
    }

    /// Spatial map of parameter `index`, or `None` if out of range.
    pub fn param_map(&self, index: usize) -> Option<ArrayView3<'_, f64>> {
        (index < self.n_params()).then(|| self.params.index_axis(Axis(0), index))
    }

    pub fn summary(&self) -> FitSummary {
        self.status.iter().fold(FitSummary::default(), |mut acc, s| {
            match s {
                VoxelStatus::Excluded => acc.excluded += 1,
                VoxelStatus::Failed => acc.failed += 1,
                VoxelStatus::Rejected => acc.rejected += 1,
                VoxelStatus::Accepted => acc.accepted += 1,
            }
            acc
        })
    }
}

/// VoxelFitter — model, bounds and options for fitting whole volumes.
///
/// Construct once with [`VoxelFitter::new`] and call [`VoxelFitter::fit`]
/// for each volume.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelFitter {
    model: SignalModel,
    bounds: Option<ParamBounds>,
    options: FitOptions,
}

impl VoxelFitter {
    /// Validate the configuration against `model`.
    ///
    /// # Errors
    /// - [`RelaxError::BoundsLengthMismatch`] if `bounds` does not cover
    ///   `model.n_params()` parameters.
    /// - [`RelaxError::InitialGuessLengthMismatch`] for a mis-sized guess.
    pub fn new(
        model: SignalModel, bounds: Option<ParamBounds>, options: FitOptions,
    ) -> RelaxResult<Self> {
        if let Some(b) = &bounds {
            if b.len() != model.n_params() {
                return Err(RelaxError::BoundsLengthMismatch {
                    expected: model.n_params(),
                    found: b.len(),
                });
            }
        }
        options.solve.validate_for(&model)?;
        Ok(Self { model, bounds, options })
    }

    pub fn model(&self) -> &SignalModel {
        &self.model
    }

    pub fn bounds(&self) -> Option<&ParamBounds> {
        self.bounds.as_ref()
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Per-voxel solver sharing this fitter's configuration.
    pub fn solver(&self) -> VoxelSolver<'_> {
        VoxelSolver {
            model: &self.model,
            bounds: self.bounds.as_ref(),
            options: &self.options.solve,
            normalize: self.options.normalize,
            estimate_initial: self.options.resolve_estimate_initial(&self.model),
        }
    }

    /// Fit every included voxel of `volume`.
    ///
    /// Parameters
    /// ----------
    /// - `volume`: `[T, X, Y]` or `[T, X, Y, Z]` signal intensities.
    /// - `mask`: spatial shape of `volume`; nonzero (including NaN) includes
    ///   the voxel.
    /// - `x`: independent variable, one entry per time point.
    ///
    /// Returns
    /// -------
    /// [`FitMaps`] on the promoted `[X, Y, Z]` grid.
    ///
    /// Errors
    /// ------
    /// - Shape errors from [`promote`].
    /// - [`RelaxError::ReferenceSolveFailed`] /
    ///   [`RelaxError::ParamCountMismatch`] from the reference solve.
    /// - [`RelaxError::ThreadPool`] if the worker pool cannot be built.
    pub fn fit(
        &self, volume: ArrayViewD<'_, f64>, mask: ArrayViewD<'_, f64>, x: &[f64],
    ) -> RelaxResult<FitMaps> {
        let pair = promote(volume, mask, x.len())?;
        let (n_x, n_y, n_z) = pair.mask.dim();
        let solver = self.solver();

        let included: Vec<[usize; 3]> = pair
            .mask
            .indexed_iter()
            .filter(|&(_, &m)| m != 0.0)
            .map(|((i, j, l), _)| [i, j, l])
            .collect();
        debug!(
            "fitting {} of {} voxels ({} time points, {} workers)",
            included.len(),
            n_x * n_y * n_z,
            x.len(),
            self.options.workers
        );

        self.reference_solve(&solver, &pair.volume, included.first().copied(), x)?;

        let worklist: Vec<([usize; 3], Vec<f64>)> =
            included.iter().map(|&voxel| (voxel, series(&pair.volume, voxel))).collect();

        let solutions: Vec<VoxelSolution> = if self.options.workers == 0 {
            worklist.iter().map(|(_, y)| solver.solve(y, x)).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.workers)
                .build()
                .map_err(|e| RelaxError::ThreadPool { text: e.to_string() })?;
            pool.install(|| worklist.par_iter().map(|(_, y)| solver.solve(y, x)).collect())
        };

        let maps = self.aggregate(&worklist, solutions, x, (n_x, n_y, n_z), pair.promoted);
        let summary = maps.summary();
        debug!(
            "fit finished: {} accepted, {} rejected, {} failed, {} excluded",
            summary.accepted, summary.rejected, summary.failed, summary.excluded
        );
        Ok(maps)
    }

    fn reference_solve(
        &self, solver: &VoxelSolver<'_>, volume: &ArrayView4<'_, f64>, first: Option<[usize; 3]>,
        x: &[f64],
    ) -> RelaxResult<()> {
        let voxel = first.unwrap_or_else(|| {
            warn!("mask selects no voxels; reference solve uses voxel [0, 0, 0]");
            [0, 0, 0]
        });
        let fitted = solver.solve(&series(volume, voxel), x).map_err(|reason| {
            warn!("reference solve at voxel {voxel:?} failed: {reason}");
            RelaxError::ReferenceSolveFailed { voxel, reason }
        })?;
        let expected = self.model.n_params();
        if fitted.values.len() != expected {
            return Err(RelaxError::ParamCountMismatch { expected, found: fitted.values.len() });
        }
        Ok(())
    }

    fn aggregate(
        &self, worklist: &[([usize; 3], Vec<f64>)], solutions: Vec<VoxelSolution>, x: &[f64],
        dim: (usize, usize, usize), promoted: bool,
    ) -> FitMaps {
        let k = self.model.n_params();
        let mut params = Array4::from_elem((k, dim.0, dim.1, dim.2), f64::NAN);
        let mut r2 = Array3::zeros(dim);
        let mut status = Array3::from_elem(dim, VoxelStatus::Excluded);
        let mut failures = Vec::new();

        for ((voxel, y), solution) in worklist.iter().zip(solutions) {
            let [i, j, l] = *voxel;
            match solution {
                Err(reason) => {
                    trace!("voxel {voxel:?} failed: {reason}");
                    status[[i, j, l]] = VoxelStatus::Failed;
                    failures.push((*voxel, reason));
                }
                Ok(fitted) => {
                    let values = fitted.values.to_vec();
                    let metric = score(y, &self.model, &values, x, self.options.normalize);
                    if !metric.is_finite() {
                        warn!("voxel {voxel:?} has a degenerate R² ({metric})");
                    }
                    r2[[i, j, l]] = metric;
                    if passes_gate(metric, self.options.min_r2) {
                        params.slice_mut(s![.., i, j, l]).assign(&fitted.values);
                        status[[i, j, l]] = VoxelStatus::Accepted;
                    } else {
                        status[[i, j, l]] = VoxelStatus::Rejected;
                    }
                }
            }
        }

        FitMaps {
            params,
            r2,
            status,
            param_names: self.model.param_names().to_vec(),
            failures,
            promoted,
        }
    }
}

fn series(volume: &ArrayView4<'_, f64>, [i, j, l]: [usize; 3]) -> Vec<f64> {
    volume.slice(s![.., i, j, l]).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relaxometry::solver::SolveOptions;
    use approx::assert_relative_eq;
    use ndarray::{ArrayD, IxDyn, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Map initialization, the mask, the R² gate and status bookkeeping.
    // - Worker-count invariance of the output.
    // - Reference-solve and configuration errors.
    // - 2-D promotion of the output grid.
    // -------------------------------------------------------------------------

    const X: [f64; 4] = [0.0, 20.0, 80.0, 140.0];

    fn curve(t2: f64) -> impl Fn(f64) -> f64 {
        move |t| 1000.0 * (-t / t2).exp() + 50.0
    }

    // [4, 2, 2, 1] volume; T2 alternates 40 / 60 in row-major voxel order.
    fn synthetic_volume() -> ArrayD<f64> {
        ArrayD::from_shape_fn(IxDyn(&[4, 2, 2, 1]), |idx| {
            let t2 = if (idx[1] * 2 + idx[2]) % 2 == 0 { 40.0 } else { 60.0 };
            curve(t2)(X[idx[0]])
        })
    }

    fn same_bits(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(u, v)| u.to_bits() == v.to_bits())
    }

    #[test]
    // Purpose
    // -------
    // Verify masked-out voxels keep their initial values and included voxels
    // are fitted and accepted.
    //
    // Given
    // -----
    // - A 2×2×1 grid with voxels [0,0,0] and [1,1,0] masked in.
    //
    // Expect
    // ------
    // - Excluded voxels: NaN params, R² 0, status `Excluded`.
    // - Included voxels: T2 recovered (40 and 60), R² ≈ 1, status `Accepted`.
    fn fit_respects_mask_and_recovers_parameters() {
        // Arrange
        let volume = synthetic_volume();
        let mut mask = ArrayD::<f64>::zeros(IxDyn(&[2, 2, 1]));
        mask[[0, 0, 0]] = 1.0;
        mask[[1, 1, 0]] = 7.0;
        let fitter =
            VoxelFitter::new(SignalModel::mono_exponential(), None, FitOptions::default()).unwrap();

        // Act
        let maps = fitter.fit(volume.view(), mask.view(), &X).unwrap();

        // Assert
        assert_eq!(maps.params.shape(), &[3, 2, 2, 1]);
        for excluded in [[0usize, 1, 0], [1, 0, 0]] {
            assert_eq!(maps.status[excluded], VoxelStatus::Excluded);
            assert_eq!(maps.r2[excluded], 0.0);
            assert!((0..3).all(|p| maps.params[[p, excluded[0], excluded[1], excluded[2]]].is_nan()));
        }
        assert_eq!(maps.status[[0, 0, 0]], VoxelStatus::Accepted);
        assert_eq!(maps.status[[1, 1, 0]], VoxelStatus::Accepted);
        assert_relative_eq!(maps.params[[1, 0, 0, 0]], 40.0, max_relative = 1e-3);
        assert_relative_eq!(maps.params[[1, 1, 1, 0]], 60.0, max_relative = 1e-3);
        assert_relative_eq!(maps.r2[[0, 0, 0]], 1.0, epsilon = 1e-9);
        assert_eq!(maps.summary(), FitSummary { excluded: 2, failed: 0, rejected: 0, accepted: 2 });
        assert_eq!(maps.param_names, vec!["S0", "T2", "offset"]);
    }

    #[test]
    // Purpose
    // -------
    // Ensure the R² gate withholds parameters but keeps the metric.
    //
    // Given
    // -----
    // - A full mask and `min_r2 = 1.5`, which no fit can reach.
    //
    // Expect
    // ------
    // - Every voxel `Rejected`, params NaN, R² ≈ 1 stored.
    fn fit_gate_rejects_but_keeps_r2() {
        // Arrange
        let volume = synthetic_volume();
        let mask = ArrayD::<f64>::ones(IxDyn(&[2, 2, 1]));
        let options = FitOptions::default().with_min_r2(1.5).unwrap();
        let fitter = VoxelFitter::new(SignalModel::mono_exponential(), None, options).unwrap();

        // Act
        let maps = fitter.fit(volume.view(), mask.view(), &X).unwrap();

        // Assert
        assert!(maps.status.iter().all(|&s| s == VoxelStatus::Rejected));
        assert!(maps.params.iter().all(|v| v.is_nan()));
        assert!(maps.r2.iter().all(|&r| (r - 1.0).abs() < 1e-9));
        assert!(maps.success_mask().iter().all(|&b| b));
        assert!(maps.accepted_mask().iter().all(|&b| !b));
    }

    #[test]
    // Purpose
    // -------
    // Verify output is bit-identical for 0, 1 and 4 workers.
    //
    // Given
    // -----
    // - The synthetic volume with a full mask.
    //
    // Expect
    // ------
    // - Same params, R² and status maps for every worker count.
    fn fit_is_worker_count_invariant() {
        // Arrange
        let volume = synthetic_volume();
        let mask = ArrayD::<f64>::ones(IxDyn(&[2, 2, 1]));
        let run = |workers: usize| {
            let options = FitOptions::default().with_workers(workers);
            VoxelFitter::new(SignalModel::mono_exponential(), None, options)
                .unwrap()
                .fit(volume.view(), mask.view(), &X)
                .unwrap()
        };

        // Act
        let sequential = run(0);
        let single = run(1);
        let pooled = run(4);

        // Assert
        for other in [&single, &pooled] {
            assert!(same_bits(&sequential.params.iter().copied().collect::<Vec<_>>(),
                &other.params.iter().copied().collect::<Vec<_>>()));
            assert!(same_bits(&sequential.r2.iter().copied().collect::<Vec<_>>(),
                &other.r2.iter().copied().collect::<Vec<_>>()));
            assert_eq!(sequential.status, other.status);
        }
    }

    #[test]
    // Purpose
    // -------
    // Check per-voxel failures are absorbed and the reference solve is fatal.
    //
    // Given
    // -----
    // - A volume whose last voxel is flat (degenerate seed).
    // - The same volume masked so the flat voxel is the first included one.
    //
    // Expect
    // ------
    // - Full mask: the flat voxel is `Failed` with NaN params and R² 0, and
    //   its reason is recorded.
    // - Flat voxel first: `ReferenceSolveFailed` at that voxel.
    fn fit_absorbs_failures_but_not_reference_failure() {
        // Arrange
        let mut volume = synthetic_volume();
        for t in 0..4 {
            volume[[t, 1, 1, 0]] = 5.0;
        }
        let full = ArrayD::<f64>::ones(IxDyn(&[2, 2, 1]));
        let mut only_flat = ArrayD::<f64>::zeros(IxDyn(&[2, 2, 1]));
        only_flat[[1, 1, 0]] = 1.0;
        let fitter =
            VoxelFitter::new(SignalModel::mono_exponential(), None, FitOptions::default()).unwrap();

        // Act
        let maps = fitter.fit(volume.view(), full.view(), &X).unwrap();
        let fatal = fitter.fit(volume.view(), only_flat.view(), &X);

        // Assert
        assert_eq!(maps.status[[1, 1, 0]], VoxelStatus::Failed);
        assert_eq!(maps.r2[[1, 1, 0]], 0.0);
        assert!(maps.param_map(1).unwrap()[[1, 1, 0]].is_nan());
        assert_eq!(maps.failures.len(), 1);
        assert_eq!(maps.failures[0].0, [1, 1, 0]);
        assert!(matches!(
            fatal,
            Err(RelaxError::ReferenceSolveFailed { voxel: [1, 1, 0], .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Verify 2-D inputs produce unit-depth 3-D maps and an empty mask yields
    // all-excluded maps.
    //
    // Given
    // -----
    // - A `[4, 2, 2]` volume and an all-zero `[2, 2]` mask.
    //
    // Expect
    // ------
    // - Maps on `[2, 2, 1]`, `promoted == true`, every voxel `Excluded`.
    fn fit_promotes_two_dimensional_input() {
        // Arrange
        let volume = synthetic_volume().into_shape(IxDyn(&[4, 2, 2])).unwrap();
        let mask = ArrayD::<f64>::zeros(IxDyn(&[2, 2]));
        let fitter =
            VoxelFitter::new(SignalModel::mono_exponential(), None, FitOptions::default()).unwrap();

        // Act
        let maps = fitter.fit(volume.view(), mask.view(), &X).unwrap();

        // Assert
        assert!(maps.promoted);
        assert_eq!(maps.r2.shape(), &[2, 2, 1]);
        assert_eq!(maps.summary().excluded, 4);
        assert!(maps.param_map(3).is_none());
    }

    #[test]
    // Purpose
    // -------
    // Ensure configuration errors are raised before any voxel is solved.
    //
    // Given
    // -----
    // - A 2-entry initial guess for a 3-parameter model.
    // - A time vector one entry too long.
    //
    // Expect
    // ------
    // - `InitialGuessLengthMismatch` from `new`; `TimeAxisMismatch` from `fit`.
    fn configuration_errors_are_fatal() {
        // Arrange
        let model = SignalModel::mono_exponential();
        let solve = SolveOptions::new(Default::default(), Some(array![1.0, 2.0]));
        let options = FitOptions::default().with_solve(solve);
        let fitter = VoxelFitter::new(model, None, FitOptions::default()).unwrap();
        let volume = synthetic_volume();
        let mask = ArrayD::<f64>::ones(IxDyn(&[2, 2, 1]));

        // Act
        let bad_guess = VoxelFitter::new(model, None, options);
        let bad_times = fitter.fit(volume.view(), mask.view(), &[0.0, 20.0, 80.0, 140.0, 200.0]);

        // Assert
        assert!(matches!(
            bad_guess,
            Err(RelaxError::InitialGuessLengthMismatch { expected: 3, found: 2 })
        ));
        assert!(matches!(
            bad_times,
            Err(RelaxError::TimeAxisMismatch { volume_len: 4, times_len: 5 })
        ));
    }
}
