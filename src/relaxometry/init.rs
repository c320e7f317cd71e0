//! Initial-guess heuristic for amplitude/decay/offset models.
//!
//! Purpose
//! -------
//! Produce a data-driven starting point `(S0₀, T₀, offset₀)` for a single
//! voxel curve so the optimizer starts in the basin of the physical solution.
//!
//! Key behaviors
//! -------------
//! - `offset₀ = min(y)`, `S0₀ = max(y)`.
//! - Fit a straight line to `ln(y − offset₀ + 1e-4)` against `x` by ordinary
//!   least squares; `d = −1/slope`, capped at [`MAX_LOG_DECAY`].
//! - The decay seed is `T₀ = exp(d)`, so the cap corresponds to
//!   `exp(5) ≈ 148` in the unit of `x`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The shift [`LOG_SHIFT`] keeps the logarithm finite at the minimum sample.
//! - Degenerate curves (constant `y`, repeated `x`) give a non-finite or zero
//!   decay seed; the solver reports those as fit failures rather than
//!   special-casing them here.
use ndarray::{Array1, array};

/// Shift added before taking the logarithm of the offset-corrected signal.
pub const LOG_SHIFT: f64 = 1e-4;

/// Upper cap on the log-decay estimate `−1/slope`.
pub const MAX_LOG_DECAY: f64 = 5.0;

/// Heuristic seed `(S0₀, T₀, offset₀)` for one voxel curve.
///
/// Parameters
/// ----------
/// - `y`: observed signal, same length as `x`.
/// - `x`: independent variable.
///
/// Returns
/// -------
/// A length-3 seed. Entries may be non-finite for degenerate inputs.
pub fn estimate_initial(y: &[f64], x: &[f64]) -> Array1<f64> {
    let amplitude = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let offset = y.iter().copied().fold(f64::INFINITY, f64::min);
    let log_signal: Vec<f64> = y.iter().map(|&v| (v - offset + LOG_SHIFT).ln()).collect();
    let slope = ols_slope(x, &log_signal);
    let mut log_decay = -1.0 / slope;
    if log_decay > MAX_LOG_DECAY {
        log_decay = MAX_LOG_DECAY;
    }
    array![amplitude, log_decay.exp(), offset]
}

/// Slope of the ordinary least-squares line through `(x_i, z_i)`.
///
/// Returns NaN when `x` has no spread or the inputs are empty.
fn ols_slope(x: &[f64], z: &[f64]) -> f64 {
    let n = x.len().min(z.len());
    if n == 0 {
        return f64::NAN;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_z = z[..n].iter().sum::<f64>() / n as f64;
    let (sxz, sxx) = x[..n].iter().zip(&z[..n]).fold((0.0, 0.0), |(sxz, sxx), (&xi, &zi)| {
        let dx = xi - mean_x;
        (sxz + dx * (zi - mean_z), sxx + dx * dx)
    });
    sxz / sxx
}
