//! Percentiles with linear interpolation between closest ranks.
//!
//! For sorted, NaN-free values `v[0..n]` and percentile `q`, the rank is
//! `h = q/100 · (n − 1)` and the result `v[⌊h⌋] + (h − ⌊h⌋)·(v[⌊h⌋+1] − v[⌊h⌋])`.
//! NaN values are dropped first; an empty input has no percentile.

/// Sorted copy of the non-NaN values.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile `q ∈ [0, 100]` of already sorted, NaN-free values.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = q / 100.0 * last as f64;
    let lo = (rank.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let weight = rank - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    if weight == 0.0 { Some(a) } else { Some(a + weight * (b - a)) }
}

/// Percentile `q ∈ [0, 100]` of `values`, ignoring NaN.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    percentile_sorted(&sorted_finite(values), q)
}

/// Lower and upper percentiles from a single sort.
pub fn percentile_pair(values: &[f64], low: f64, up: f64) -> Option<(f64, f64)> {
    let sorted = sorted_finite(values);
    Some((percentile_sorted(&sorted, low)?, percentile_sorted(&sorted, up)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Linear interpolation between order statistics.
    // - NaN filtering and empty input.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check interpolation against hand-computed values.
    //
    // Given
    // -----
    // - Values [4, 1, 3, 2] (unsorted).
    //
    // Expect
    // ------
    // - p0 = 1, p25 = 1.75, p50 = 2.5, p100 = 4.
    fn percentile_interpolates_linearly() {
        // Arrange
        let values = [4.0, 1.0, 3.0, 2.0];

        // Act / Assert
        assert_relative_eq!(percentile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile(&values, 25.0).unwrap(), 1.75);
        assert_relative_eq!(percentile(&values, 50.0).unwrap(), 2.5);
        assert_relative_eq!(percentile(&values, 100.0).unwrap(), 4.0);
    }

    #[test]
    // Purpose
    // -------
    // Ensure NaN values are ignored and empty input yields `None`.
    //
    // Given
    // -----
    // - [NaN, 10, NaN, 20], [NaN] and [].
    //
    // Expect
    // ------
    // - p50 = 15; `None` for the all-NaN and empty inputs.
    fn percentile_ignores_nan_and_handles_empty() {
        // Act / Assert
        assert_relative_eq!(percentile(&[f64::NAN, 10.0, f64::NAN, 20.0], 50.0).unwrap(), 15.0);
        assert!(percentile(&[f64::NAN], 50.0).is_none());
        assert!(percentile_pair(&[], 5.0, 95.0).is_none());
    }
}
