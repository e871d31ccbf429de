//! Python bindings for the taper and reconstruction kernels

use numpy::PyArray1;
use pyo3::prelude::*;

use crate::windows::{kernels, KernDirection, KernMethod};

/// Reconstruction kernel of one window
///
/// Args:
///     window_length: Samples per window
///     relative_filter_length: Kernel width parameter
///     direction: None, "forward" or "backward"
#[pyfunction]
#[pyo3(signature = (window_length, relative_filter_length=2.0, direction=None))]
pub fn build_kern<'py>(
    py: Python<'py>,
    window_length: usize,
    relative_filter_length: f64,
    direction: Option<&str>,
) -> PyResult<&'py PyArray1<f64>> {
    let direction = direction.map(str::parse::<KernDirection>).transpose()?;
    let kern = kernels::build_kern(window_length, relative_filter_length, direction);
    Ok(PyArray1::from_vec(py, kern))
}

/// Taper applied to window data before fitting
///
/// Args:
///     window_length: Samples per window
///     corner_sharpness: Steepness of the taper edges
///     kern_method: "kern" or "flat"
#[pyfunction]
#[pyo3(signature = (window_length, corner_sharpness=16.0, kern_method="kern"))]
pub fn calculate_lv_kern<'py>(
    py: Python<'py>,
    window_length: usize,
    corner_sharpness: f64,
    kern_method: &str,
) -> PyResult<&'py PyArray1<f64>> {
    let method: KernMethod = kern_method.parse()?;
    let kern = kernels::calculate_lv_kern(window_length, corner_sharpness, method);
    Ok(PyArray1::from_vec(py, kern))
}
