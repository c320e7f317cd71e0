//! Volume/mask shape handling.
//!
//! Validates a `[T, spatial...]` time-series volume against its mask and time
//! vector, and promotes 2-D inputs to a unit-depth 3-D grid so the engine only
//! ever handles `[T, X, Y, Z]` / `[X, Y, Z]` views. No data is copied.
use crate::relaxometry::errors::{RelaxError, RelaxResult};
use ndarray::{ArrayView3, ArrayView4, ArrayViewD, Axis, Ix3, Ix4};

/// Volume and mask as 4-D / 3-D views.
#[derive(Debug, Clone)]
pub struct PromotedPair<'v, 'm> {
    pub volume: ArrayView4<'v, f64>,
    pub mask: ArrayView3<'m, f64>,
    /// Whether the inputs were 2-D and gained a unit depth axis.
    pub promoted: bool,
}

/// Validate shapes and promote 2-D inputs to 3-D.
///
/// Checks, in order:
/// 1. `mask.ndim == volume.ndim − 1`.
/// 2. Spatial rank is 2 or 3.
/// 3. `volume.shape[0] == n_times`.
/// 4. Spatial shapes agree.
/// 5. Neither time nor spatial extent is empty.
///
/// # Errors
/// `MaskRankMismatch`, `UnsupportedRank`, `TimeAxisMismatch`,
/// `SpatialShapeMismatch` or `EmptyVolume`.
pub fn promote<'v, 'm>(
    volume: ArrayViewD<'v, f64>, mask: ArrayViewD<'m, f64>, n_times: usize,
) -> RelaxResult<PromotedPair<'v, 'm>> {
    if mask.ndim() + 1 != volume.ndim() {
        return Err(RelaxError::MaskRankMismatch {
            mask_ndim: mask.ndim(),
            volume_ndim: volume.ndim(),
        });
    }
    let spatial_ndim = mask.ndim();
    if spatial_ndim != 2 && spatial_ndim != 3 {
        return Err(RelaxError::UnsupportedRank { spatial_ndim });
    }
    if volume.shape()[0] != n_times {
        return Err(RelaxError::TimeAxisMismatch {
            volume_len: volume.shape()[0],
            times_len: n_times,
        });
    }
    if volume.shape()[1..] != *mask.shape() {
        return Err(RelaxError::SpatialShapeMismatch {
            mask: mask.shape().to_vec(),
            volume: volume.shape()[1..].to_vec(),
        });
    }
    if volume.is_empty() {
        return Err(RelaxError::EmptyVolume);
    }

    let promoted = spatial_ndim == 2;
    let volume = if promoted { volume.insert_axis(Axis(3)) } else { volume };
    let mask = if promoted { mask.insert_axis(Axis(2)) } else { mask };
    let volume = volume.into_dimensionality::<Ix4>().map_err(|_| RelaxError::UnsupportedRank {
        spatial_ndim,
    })?;
    let mask = mask
        .into_dimensionality::<Ix3>()
        .map_err(|_| RelaxError::UnsupportedRank { spatial_ndim })?;
    Ok(PromotedPair { volume, mask, promoted })
}
