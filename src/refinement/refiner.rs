//! Percentile map refiner — per-region outlier exclusion on a fitted map.
//!
//! Purpose
//! -------
//! Post-process a scalar parameter map with an integer-labeled region mask:
//! within each labeled region, values outside the `[P_low, P_up]` percentile
//! band are discarded.
//!
//! Key behaviors
//! -------------
//! - [`RefineMode::Sequential`] (default) folds over labels `1..=L` carrying a
//!   working mask. After label `i` the working mask holds the surviving map
//!   values (NaN elsewhere), and label `i + 1` selects voxels whose working
//!   value equals `i + 1`. Later labels therefore see the output of earlier
//!   ones.
//! - [`RefineMode::Independent`] filters each label against the original map
//!   and the original label membership.
//!
//! Invariants & assumptions
//! ------------------------
//! - `L = floor(max(region_mask))`, computed once from the input mask.
//! - Percentiles ignore NaN; a region with no values yields no bounds and
//!   contributes nothing.
//! - In sequential mode a surviving value of exactly 0 is indistinguishable
//!   from "excluded" and becomes NaN.
use crate::refinement::{
    errors::{RefineError, RefineResult},
    percentile::percentile_pair,
    validation::{label_count, validate_shapes, verify_percentile_pair},
};
use log::debug;
use ndarray::{ArrayD, ArrayViewD, Zip};
use std::str::FromStr;

/// How labels interact during refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefineMode {
    #[default]
    Sequential,
    Independent,
}

impl FromStr for RefineMode {
    type Err = RefineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(RefineMode::Sequential),
            "independent" => Ok(RefineMode::Independent),
            _ => Err(RefineError::UnknownMode { name: s.to_string() }),
        }
    }
}

/// PercentileRefiner — validated percentile band.
///
/// Fields
/// ------
/// - `low_pct`, `up_pct`: percentiles on the 0–100 scale with
///   `0 ≤ low_pct < up_pct ≤ 100`.
///
/// Default
/// -------
/// `(5, 95)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileRefiner {
    low_pct: f64,
    up_pct: f64,
}

impl PercentileRefiner {
    /// # Errors
    /// `InvalidPercentile` or `PercentileOrder`.
    pub fn new(low_pct: f64, up_pct: f64) -> RefineResult<Self> {
        verify_percentile_pair(low_pct, up_pct)?;
        Ok(Self { low_pct, up_pct })
    }

    pub fn low_pct(&self) -> f64 {
        self.low_pct
    }

    pub fn up_pct(&self) -> f64 {
        self.up_pct
    }

    /// Sequential refinement of `map` by `region_mask`.
    ///
    /// Returns the final working mask: surviving map values, NaN elsewhere.
    /// When the mask has no label ≥ 1 it is returned unchanged.
    ///
    /// # Errors
    /// `ShapeMismatch` or `InvalidLabel`.
    pub fn refine(
        &self, map: ArrayViewD<'_, f64>, region_mask: ArrayViewD<'_, f64>,
    ) -> RefineResult<ArrayD<f64>> {
        validate_shapes(map.shape(), region_mask.shape())?;
        let n_labels = label_count(region_mask.iter())?;

        let mut working = region_mask.to_owned();
        for label in 1..=n_labels {
            let target = label as f64;
            let region: Vec<f64> = Zip::from(&map)
                .and(&working)
                .fold(Vec::new(), |mut acc, &v, &w| {
                    if w == target {
                        acc.push(v);
                    }
                    acc
                });
            let mut candidate =
                Zip::from(&map).and(&working).map_collect(|&v, &w| if w == target { v } else { 0.0 });
            match percentile_pair(&region, self.low_pct, self.up_pct) {
                Some((lo, up)) => {
                    debug!("label {label}: {} voxels, band [{lo}, {up}]", region.len());
                    candidate.mapv_inplace(|c| if c < lo || c > up { 0.0 } else { c });
                }
                None => debug!("label {label}: empty region"),
            }
            working = candidate.mapv(|c| if c != 0.0 { c } else { f64::NAN });
        }
        Ok(working)
    }

    /// Per-label refinement against the original map and labels.
    ///
    /// Output holds `map` values for voxels inside their label's band and NaN
    /// everywhere else.
    ///
    /// # Errors
    /// `ShapeMismatch` or `InvalidLabel`.
    pub fn refine_independent(
        &self, map: ArrayViewD<'_, f64>, region_mask: ArrayViewD<'_, f64>,
    ) -> RefineResult<ArrayD<f64>> {
        validate_shapes(map.shape(), region_mask.shape())?;
        let n_labels = label_count(region_mask.iter())?;

        let mut out = ArrayD::from_elem(map.raw_dim(), f64::NAN);
        for label in 1..=n_labels {
            let target = label as f64;
            let region: Vec<f64> = Zip::from(&map)
                .and(&region_mask)
                .fold(Vec::new(), |mut acc, &v, &m| {
                    if m == target {
                        acc.push(v);
                    }
                    acc
                });
            let Some((lo, up)) = percentile_pair(&region, self.low_pct, self.up_pct) else {
                debug!("label {label}: empty region");
                continue;
            };
            Zip::from(&mut out).and(&map).and(&region_mask).for_each(|o, &v, &m| {
                if m == target && v >= lo && v <= up {
                    *o = v;
                }
            });
        }
        Ok(out)
    }

    pub fn refine_with_mode(
        &self, map: ArrayViewD<'_, f64>, region_mask: ArrayViewD<'_, f64>, mode: RefineMode,
    ) -> RefineResult<ArrayD<f64>> {
        match mode {
            RefineMode::Sequential => self.refine(map, region_mask),
            RefineMode::Independent => self.refine_independent(map, region_mask),
        }
    }
}

impl Default for PercentileRefiner {
    fn default() -> Self {
        Self { low_pct: 5.0, up_pct: 95.0 }
    }
}
