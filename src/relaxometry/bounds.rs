//! Parameter bounds tied to a signal model.
//!
//! [`ParamBounds`] is a thin wrapper around the optimizer's box constraints
//! that also guarantees one `(lower, upper)` pair per model parameter.
use crate::{
    optimization::least_squares::Bounds,
    relaxometry::{
        errors::{RelaxError, RelaxResult},
        models::SignalModel,
    },
};
use ndarray::Array1;

#[derive(Debug, Clone, PartialEq)]
pub struct ParamBounds {
    inner: Bounds,
}

impl ParamBounds {
    /// Validate `(lower, upper)` against `model`.
    ///
    /// # Errors
    /// - [`RelaxError::BoundsLengthMismatch`] if either side does not have
    ///   `model.n_params()` entries.
    /// - [`RelaxError::Optimizer`] wrapping `InvalidBounds` for NaN or
    ///   unordered pairs.
    pub fn for_model(model: &SignalModel, lower: Vec<f64>, upper: Vec<f64>) -> RelaxResult<Self> {
        let expected = model.n_params();
        for found in [lower.len(), upper.len()] {
            if found != expected {
                return Err(RelaxError::BoundsLengthMismatch { expected, found });
            }
        }
        Ok(Self { inner: Bounds::new(lower, upper)? })
    }

    pub fn lower(&self) -> &Array1<f64> {
        self.inner.lower()
    }

    pub fn upper(&self) -> &Array1<f64> {
        self.inner.upper()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Box constraints as consumed by the least-squares solver.
    pub fn as_box(&self) -> &Bounds {
        &self.inner
    }

    /// Clamp a seed vector into the bounds, lower side first.
    pub fn clamp(&self, seed: &mut Array1<f64>) {
        *seed = self.inner.project(seed);
    }
}
