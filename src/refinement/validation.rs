//! Input guards for the percentile refiner.
use crate::refinement::errors::{RefineError, RefineResult};

/// Check a percentile is finite and within `[0, 100]`.
pub fn verify_percentile(name: &'static str, value: f64) -> RefineResult<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(RefineError::InvalidPercentile { name, value });
    }
    Ok(())
}

/// Validate a `(low, up)` percentile pair: each in range, `low < up`.
pub fn verify_percentile_pair(low: f64, up: f64) -> RefineResult<()> {
    verify_percentile("lower", low)?;
    verify_percentile("upper", up)?;
    if low >= up {
        return Err(RefineError::PercentileOrder { low, up });
    }
    Ok(())
}

/// Map and mask must have identical shapes.
pub fn validate_shapes(map: &[usize], mask: &[usize]) -> RefineResult<()> {
    if map != mask {
        return Err(RefineError::ShapeMismatch { map: map.to_vec(), mask: mask.to_vec() });
    }
    Ok(())
}

/// Number of labels `L = floor(max(mask))`, ignoring NaN; 0 if no label ≥ 1.
///
/// # Errors
/// [`RefineError::InvalidLabel`] if the mask contains ±∞.
pub fn label_count<'a, I>(mask: I) -> RefineResult<usize>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut max = f64::NEG_INFINITY;
    for &value in mask {
        if value.is_infinite() {
            return Err(RefineError::InvalidLabel { value });
        }
        if value > max {
            max = value;
        }
    }
    if max >= 1.0 { Ok(max.floor() as usize) } else { Ok(0) }
}
