//! relaxfit — voxel-wise relaxometry fitting with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the fitting engine and map refiner to Python via the `_relaxfit` extension
//! module. When the `python-bindings` feature is enabled, this module defines
//! the Python-facing classes, functions and submodules.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules: [`optimization`] (bounded
//!   least squares), [`relaxometry`] (signal models, per-voxel solver,
//!   volume engine, time-vector I/O) and [`refinement`] (percentile map
//!   refinement).
//! - Define `#[pyclass]` / `#[pyfunction]` wrappers and the `#[pymodule]`
//!   initializer for `_relaxfit`, with `fitting` and `refinement`
//!   submodules registered for dot-notation imports.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; this file performs only
//!   FFI glue, input conversion and error mapping.
//! - Rust error types convert to `ValueError` at the PyO3 boundary.
//!
//! Conventions
//! -----------
//! - Python arrays are converted to `float64`; status maps are returned as
//!   `uint8` codes (0 excluded, 1 failed, 2 rejected, 3 accepted).
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on the inner modules directly and can
//!   ignore the items guarded by `python-bindings`.

pub mod optimization;
pub mod refinement;
pub mod relaxometry;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::{collections::HashMap, path::PathBuf};

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray3, PyArray4, PyArrayDyn};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    refinement::{PercentileRefiner, RefineMode},
    relaxometry::{engine::VoxelFitter, io},
    utils::{build_voxel_fitter, extract_f64_array, extract_f64_arrayd},
};

/// VoxelFitter — Python-facing wrapper for the voxel fitting engine.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `VoxelFitter(model, constants=None, bounds=None, normalize=False,
/// workers=0, min_r2=-inf, xtol=None, max_iter=None)`:
/// - `model`: `str`
///   `"mono_exponential"` / `"t2"` / `"t2star"`, `"t1rho_rausch"`, or
///   `"t1rho"` / `"t1rho_aronen"`.
/// - `constants`: `dict[str, float] | None`
///   Acquisition constants (`TR`, `T1`, `alpha` in radians, `TE`, `T2star`).
/// - `bounds`: `tuple[list[float], list[float]] | None`
///   Per-parameter `(lower, upper)`.
/// - `normalize`, `workers`, `min_r2`, `xtol`, `max_iter`
///   Engine and optimizer options; see [`FitOptions`](crate::relaxometry::FitOptions).
///
/// Notes
/// -----
/// - `fit(volume, mask, x)` returns `(params, r2, status)` with shapes
///   `[k, X, Y, Z]`, `[X, Y, Z]`, `[X, Y, Z]`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "relaxfit.fitting", name = "VoxelFitter")]
pub struct PyVoxelFitter {
    inner: VoxelFitter,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyVoxelFitter {
    #[new]
    #[pyo3(
        signature = (
            model,
            constants = None,
            bounds = None,
            normalize = false,
            workers = 0,
            min_r2 = f64::NEG_INFINITY,
            xtol = None,
            max_iter = None,
        ),
        text_signature = "(model, /, constants=None, bounds=None, normalize=False, workers=0, \
                          min_r2=-inf, xtol=None, max_iter=None)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: &str, constants: Option<HashMap<String, f64>>,
        bounds: Option<(Vec<f64>, Vec<f64>)>, normalize: bool, workers: usize, min_r2: f64,
        xtol: Option<f64>, max_iter: Option<usize>,
    ) -> PyResult<Self> {
        let inner =
            build_voxel_fitter(model, constants, bounds, normalize, workers, min_r2, xtol, max_iter)?;
        Ok(PyVoxelFitter { inner })
    }

    /// Fit every masked voxel; returns `(params, r2, status)`.
    #[allow(clippy::type_complexity)]
    pub fn fit<'py>(
        &self, py: Python<'py>, volume: &Bound<'py, PyAny>, mask: &Bound<'py, PyAny>,
        x: &Bound<'py, PyAny>,
    ) -> PyResult<(Bound<'py, PyArray4<f64>>, Bound<'py, PyArray3<f64>>, Bound<'py, PyArray3<u8>>)>
    {
        let volume = extract_f64_arrayd(py, volume)?;
        let mask = extract_f64_arrayd(py, mask)?;
        let x = extract_f64_array(py, x)?;
        let x = x.as_array().to_vec();

        let (volume, mask) = (volume.as_array(), mask.as_array());
        let maps = py.allow_threads(|| self.inner.fit(volume, mask, &x))?;
        let status = maps.status.mapv(|s| s.code());
        Ok((maps.params.into_pyarray(py), maps.r2.into_pyarray(py), status.into_pyarray(py)))
    }

    /// Names of the fitted parameters, in map order.
    #[getter]
    pub fn param_names(&self) -> Vec<&'static str> {
        self.inner.model().param_names().to_vec()
    }
}

/// Percentile-refine `fit_map` by the labels in `mask`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(signature = (fit_map, mask, low = 5.0, up = 95.0, mode = "sequential"))]
pub fn refine_map<'py>(
    py: Python<'py>, fit_map: &Bound<'py, PyAny>, mask: &Bound<'py, PyAny>, low: f64, up: f64,
    mode: &str,
) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
    let fit_map = extract_f64_arrayd(py, fit_map)?;
    let mask = extract_f64_arrayd(py, mask)?;
    let mode: RefineMode = mode.parse()?;
    let refined =
        PercentileRefiner::new(low, up)?.refine_with_mode(fit_map.as_array(), mask.as_array(), mode)?;
    Ok(refined.into_pyarray(py))
}

#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "save_times")]
pub fn py_save_times(path: PathBuf, times: Vec<f64>) -> PyResult<()> {
    io::save_times(path, &times)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "load_times")]
pub fn py_load_times(py: Python<'_>, path: PathBuf) -> PyResult<Bound<'_, PyArray1<f64>>> {
    Ok(io::load_times(path)?.into_pyarray(py))
}

#[cfg(feature = "python-bindings")]
#[pymodule]
fn _relaxfit<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let fitting_mod = PyModule::new(_py, "fitting")?;
    let refinement_mod = PyModule::new(_py, "refinement")?;
    register_fitting(m, &fitting_mod)?;
    register_refinement(m, &refinement_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    let modules = _py.import("sys")?.getattr("modules")?;
    modules.set_item("relaxfit.fitting", fitting_mod)?;
    modules.set_item("relaxfit.refinement", refinement_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn register_fitting<'py>(relaxfit: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<PyVoxelFitter>()?;
    m.add_function(wrap_pyfunction!(py_save_times, m)?)?;
    m.add_function(wrap_pyfunction!(py_load_times, m)?)?;
    relaxfit.add_submodule(m)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn register_refinement<'py>(relaxfit: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(refine_map, m)?)?;
    relaxfit.add_submodule(m)?;
    Ok(())
}
