//! Box constraints for the least-squares solver.
//!
//! A [`Bounds`] value holds per-parameter `(lower, upper)` limits. Infinite
//! entries are allowed and leave that side unbounded.
//!
//! The solver never steps in θ directly. Each bounded coordinate is mapped to
//! an unconstrained internal coordinate `q` (the MINPACK-1 / lmfit
//! transform), so every point the optimizer visits is feasible:
//!
//! ```text
//! both finite:  θ = lo + (up − lo)·(sin q + 1)/2
//! lower only:   θ = lo − 1 + √(q² + 1)
//! upper only:   θ = up + 1 − √(q² + 1)
//! ```
//!
//! A coordinate sitting exactly on a bound is a stationary point of the
//! transform, so starts are moved [`INTERIOR_MARGIN`] inside the box first.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::types::{INTERIOR_MARGIN, Theta},
};
use ndarray::Array1;

/// Width of the band next to a bound, relative to the box width (or to the
/// bound's magnitude when one side is open), in which a converged coordinate
/// is a candidate for pinning.
const ACTIVE_BAND: f64 = 1e-2;

#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl Bounds {
    /// Construct validated box constraints.
    ///
    /// # Rules
    /// - `lower` and `upper` must have the same length.
    /// - No entry may be NaN.
    /// - Each pair must satisfy `lower[i] < upper[i]`.
    ///
    /// # Errors
    /// - [`OptError::BoundsDimMismatch`] for unequal lengths.
    /// - [`OptError::InvalidBounds`] for the first NaN or unordered pair.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> OptResult<Self> {
        if lower.len() != upper.len() {
            return Err(OptError::BoundsDimMismatch { expected: lower.len(), found: upper.len() });
        }
        for (index, (&lo, &up)) in lower.iter().zip(upper.iter()).enumerate() {
            if lo.is_nan() || up.is_nan() {
                return Err(OptError::InvalidBounds {
                    index,
                    lower: lo,
                    upper: up,
                    reason: "Bounds must not be NaN.",
                });
            }
            if lo >= up {
                return Err(OptError::InvalidBounds {
                    index,
                    lower: lo,
                    upper: up,
                    reason: "Each lower bound must be strictly less than its upper bound.",
                });
            }
        }
        Ok(Self { lower: Array1::from(lower), upper: Array1::from(upper) })
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Ensure the bounds apply to a parameter vector of length `n_params`.
    ///
    /// # Errors
    /// Returns [`OptError::BoundsDimMismatch`] when the lengths differ.
    pub fn check_dim(&self, n_params: usize) -> OptResult<()> {
        if self.len() != n_params {
            return Err(OptError::BoundsDimMismatch { expected: n_params, found: self.len() });
        }
        Ok(())
    }

    /// Clamp every component of `theta` into `[lower, upper]`.
    ///
    /// NaN components stay NaN so that downstream validation can reject them.
    pub fn project(&self, theta: &Theta) -> Theta {
        let mut out = theta.clone();
        self.project_in_place(&mut out);
        out
    }

    fn project_in_place(&self, theta: &mut Theta) {
        for ((value, &lo), &up) in theta.iter_mut().zip(self.lower.iter()).zip(self.upper.iter()) {
            if value.is_nan() {
                continue;
            }
            *value = value.max(lo).min(up);
        }
    }

    /// Internal coordinate of `value` for parameter `j`.
    ///
    /// `value` is first clamped into the box and moved off any finite bound
    /// by [`INTERIOR_MARGIN`].
    pub fn to_internal(&self, j: usize, value: f64) -> f64 {
        let (lo, up) = (self.lower[j], self.upper[j]);
        match (lo.is_finite(), up.is_finite()) {
            (true, true) => {
                let margin = INTERIOR_MARGIN * (up - lo);
                let v = value.max(lo + margin).min(up - margin);
                (2.0 * (v - lo) / (up - lo) - 1.0).asin()
            }
            (true, false) => {
                let v = value.max(lo + INTERIOR_MARGIN * lo.abs().max(1.0));
                ((v - lo + 1.0).powi(2) - 1.0).sqrt()
            }
            (false, true) => {
                let v = value.min(up - INTERIOR_MARGIN * up.abs().max(1.0));
                ((up - v + 1.0).powi(2) - 1.0).sqrt()
            }
            (false, false) => value,
        }
    }

    /// Parameter value for internal coordinate `q` of parameter `j`.
    pub fn to_external(&self, j: usize, q: f64) -> f64 {
        let (lo, up) = (self.lower[j], self.upper[j]);
        let value = match (lo.is_finite(), up.is_finite()) {
            (true, true) => lo + (up - lo) * (q.sin() + 1.0) / 2.0,
            (true, false) => lo - 1.0 + (q * q + 1.0).sqrt(),
            (false, true) => up + 1.0 - (q * q + 1.0).sqrt(),
            (false, false) => q,
        };
        value.max(lo).min(up)
    }

    /// `dθ_j/dq` at internal coordinate `q`.
    pub fn external_slope(&self, j: usize, q: f64) -> f64 {
        let (lo, up) = (self.lower[j], self.upper[j]);
        match (lo.is_finite(), up.is_finite()) {
            (true, true) => (up - lo) / 2.0 * q.cos(),
            (true, false) => q / (q * q + 1.0).sqrt(),
            (false, true) => -q / (q * q + 1.0).sqrt(),
            (false, false) => 1.0,
        }
    }

    /// Bound that parameter `j` should be pinned to, if any.
    ///
    /// A bound qualifies when `value` lies within the active band next to it
    /// and the cost gradient `grad` points out of the box there (positive at a
    /// lower bound, negative at an upper one).
    pub fn active_bound(&self, j: usize, value: f64, grad: f64) -> Option<f64> {
        let (lo, up) = (self.lower[j], self.upper[j]);
        let band = |bound: f64| {
            let scale = if lo.is_finite() && up.is_finite() { up - lo } else { bound.abs().max(1.0) };
            ACTIVE_BAND * scale
        };
        if lo.is_finite() && grad > 0.0 && value - lo <= band(lo) {
            return Some(lo);
        }
        if up.is_finite() && grad < 0.0 && up - value <= band(up) {
            return Some(up);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction-time validation of bound pairs.
    // - Projection of θ onto the feasible box.
    // - The bounded-parameter transform, its slope and active-bound detection.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure unordered, NaN and mismatched bounds are rejected.
    //
    // Given
    // -----
    // - `lower = [0, 2]`, `upper = [1, 1]` (second pair unordered).
    // - A pair containing NaN.
    // - Lower/upper of different lengths.
    //
    // Expect
    // ------
    // - `InvalidBounds { index: 1 }`, `InvalidBounds { index: 0 }`, and
    //   `BoundsDimMismatch` respectively.
    fn new_rejects_invalid_pairs() {
        // Arrange / Act
        let unordered = Bounds::new(vec![0.0, 2.0], vec![1.0, 1.0]);
        let nan = Bounds::new(vec![f64::NAN], vec![1.0]);
        let mismatched = Bounds::new(vec![0.0, 0.0], vec![1.0]);

        // Assert
        assert!(matches!(unordered, Err(OptError::InvalidBounds { index: 1, .. })));
        assert!(matches!(nan, Err(OptError::InvalidBounds { index: 0, .. })));
        assert!(matches!(mismatched, Err(OptError::BoundsDimMismatch { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Verify projection clamps finite entries and leaves NaN untouched.
    //
    // Given
    // -----
    // - Bounds `[0, 1] × [-inf, 5] × [0, 10]`.
    // - θ = `[-3, 7, NaN]`.
    //
    // Expect
    // ------
    // - Projected θ = `[0, 5, NaN]`.
    fn project_clamps_into_box() {
        // Arrange
        let bounds =
            Bounds::new(vec![0.0, f64::NEG_INFINITY, 0.0], vec![1.0, 5.0, 10.0]).unwrap();
        let theta: Theta = array![-3.0, 7.0, f64::NAN];

        // Act
        let projected = bounds.project(&theta);

        // Assert
        assert_eq!(projected[0], 0.0);
        assert_eq!(projected[1], 5.0);
        assert!(projected[2].is_nan());
    }

    #[test]
    // Purpose
    // -------
    // Verify the internal transform maps interior points back onto themselves
    // for every kind of bound pair.
    //
    // Given
    // -----
    // - Bounds `[0, 10] × [2, inf] × [-inf, 3] × [-inf, inf]`.
    // - θ = `[7.5, 40, -12, 0.25]`.
    //
    // Expect
    // ------
    // - `to_external(to_internal(θ_j)) ≈ θ_j` for every coordinate.
    fn internal_transform_round_trips_interior_points() {
        // Arrange
        let bounds = Bounds::new(
            vec![0.0, 2.0, f64::NEG_INFINITY, f64::NEG_INFINITY],
            vec![10.0, f64::INFINITY, 3.0, f64::INFINITY],
        )
        .unwrap();
        let theta = [7.5, 40.0, -12.0, 0.25];

        // Act / Assert
        for (j, &value) in theta.iter().enumerate() {
            let q = bounds.to_internal(j, value);
            assert_abs_diff_eq!(bounds.to_external(j, q), value, epsilon = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure every internal coordinate maps into the box and that starts on a
    // bound are moved inside it.
    //
    // Given
    // -----
    // - Bounds `[0, 1] × [5, inf]`.
    // - Internal coordinates spanning several periods; θ on each lower bound.
    //
    // Expect
    // ------
    // - All external values inside the box.
    // - A start on a bound maps to a strictly interior value with a non-zero
    //   slope.
    fn internal_transform_stays_feasible_and_leaves_bounds() {
        // Arrange
        let bounds = Bounds::new(vec![0.0, 5.0], vec![1.0, f64::INFINITY]).unwrap();

        // Act / Assert
        for step in -100..=100 {
            let q = step as f64 * 0.37;
            let a = bounds.to_external(0, q);
            let b = bounds.to_external(1, q);
            assert!((0.0..=1.0).contains(&a));
            assert!(b >= 5.0);
        }
        for (j, lo) in [(0, 0.0), (1, 5.0)] {
            let q = bounds.to_internal(j, lo);
            assert!(bounds.to_external(j, q) > lo);
            assert!(bounds.external_slope(j, q).abs() > 0.0);
        }
    }

    #[test]
    // Purpose
    // -------
    // Check the analytic slope of the transform against a central difference.
    //
    // Given
    // -----
    // - Bounds `[-2, 6] × [1, inf] × [-inf, 0]`, q = 0.3.
    //
    // Expect
    // ------
    // - `external_slope` within 1e-6 of the central difference.
    fn external_slope_matches_central_difference() {
        // Arrange
        let bounds = Bounds::new(
            vec![-2.0, 1.0, f64::NEG_INFINITY],
            vec![6.0, f64::INFINITY, 0.0],
        )
        .unwrap();
        let (q, h) = (0.3, 1e-6);

        // Act / Assert
        for j in 0..3 {
            let fd = (bounds.to_external(j, q + h) - bounds.to_external(j, q - h)) / (2.0 * h);
            assert_abs_diff_eq!(bounds.external_slope(j, q), fd, epsilon = 1e-6);
        }
    }

    #[test]
    // Purpose
    // -------
    // Confirm only coordinates near a bound with an outward gradient are
    // reported as active.
    //
    // Given
    // -----
    // - Bounds `[0, 100]`.
    // - θ = 0.5 with gradient +1 (pushing below 0), θ = 99.9 with gradient −1,
    //   θ = 0.5 with gradient −1, and θ = 50 with gradient +1.
    //
    // Expect
    // ------
    // - `Some(0)`, `Some(100)`, `None`, `None`.
    fn active_bound_requires_proximity_and_outward_gradient() {
        // Arrange
        let bounds = Bounds::new(vec![0.0], vec![100.0]).unwrap();

        // Act / Assert
        assert_eq!(bounds.active_bound(0, 0.5, 1.0), Some(0.0));
        assert_eq!(bounds.active_bound(0, 99.9, -1.0), Some(100.0));
        assert_eq!(bounds.active_bound(0, 0.5, -1.0), None);
        assert_eq!(bounds.active_bound(0, 50.0, 1.0), None);
    }
}
