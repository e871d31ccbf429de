//! PyO3 bindings for Python integration

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::error::CostsError;

mod costs_bindings;
mod kernel_bindings;

impl From<CostsError> for PyErr {
    fn from(err: CostsError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}

/// Python module definition
#[pymodule]
fn costs(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<costs_bindings::PyCosts>()?;
    m.add_function(wrap_pyfunction!(kernel_bindings::build_kern, m)?)?;
    m.add_function(wrap_pyfunction!(kernel_bindings::calculate_lv_kern, m)?)?;
    Ok(())
}
