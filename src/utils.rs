//! Python-boundary helpers: array extraction and fitter construction.
//!
//! Everything here is compiled only with the `python-bindings` feature.

#[cfg(feature = "python-bindings")]
use std::collections::HashMap;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArrayDyn,
};

#[cfg(feature = "python-bindings")]
use crate::{
    optimization::least_squares::LsqOptions,
    relaxometry::{
        bounds::ParamBounds, engine::VoxelFitter, models::SignalModel, options::FitOptions,
        solver::SolveOptions,
    },
};

/// Borrow a contiguous 1-D `float64` array, converting sequences if needed.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Borrow an N-D `float64` array; other dtypes and nested sequences go
/// through `numpy.ascontiguousarray(raw, "float64")`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_arrayd<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArrayDyn<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArrayDyn<f64>>() {
        return Ok(arr_ro);
    }
    py.import("numpy")?
        .call_method1("ascontiguousarray", (raw_data, "float64"))?
        .extract::<PyReadonlyArrayDyn<f64>>()
        .map_err(|_| PyTypeError::new_err("expected an array-like of float64"))
}

/// Build a [`VoxelFitter`] from Python keyword arguments.
#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn build_voxel_fitter(
    model: &str, constants: Option<HashMap<String, f64>>, bounds: Option<(Vec<f64>, Vec<f64>)>,
    normalize: bool, workers: usize, min_r2: f64, xtol: Option<f64>, max_iter: Option<usize>,
) -> PyResult<VoxelFitter> {
    let model = SignalModel::from_constants(model, &constants.unwrap_or_default())?;

    let bounds = match bounds {
        Some((lower, upper)) => Some(ParamBounds::for_model(&model, lower, upper)?),
        None => None,
    };

    let mut lsq = LsqOptions::default();
    if let Some(xtol) = xtol {
        lsq = lsq.with_xtol(xtol)?;
    }
    if let Some(max_iter) = max_iter {
        lsq = lsq.with_max_iter(max_iter)?;
    }

    let options = FitOptions::new(SolveOptions::new(lsq, None), normalize, workers, min_r2, None)?;
    Ok(VoxelFitter::new(model, bounds, options)?)
}
