//! Dense linear algebra helpers bridging ndarray and nalgebra

use nalgebra::{DMatrix, SVD};
use ndarray::{Array1, Array2, ArrayView2};
use num_complex::Complex64;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct LinalgError(pub &'static str);

/// Thin SVD with singular values sorted in descending order
#[derive(Debug, Clone)]
pub struct ThinSvd {
    /// Left singular vectors, one per column (rows x min(rows, cols))
    pub u: Array2<f64>,

    /// Singular values, descending
    pub s: Array1<f64>,
}

pub(crate) fn to_dmatrix(a: ArrayView2<'_, f64>) -> DMatrix<f64> {
    let (nrows, ncols) = a.dim();
    DMatrix::from_fn(nrows, ncols, |i, j| a[[i, j]])
}

pub(crate) fn to_complex_dmatrix(a: ArrayView2<'_, f64>) -> DMatrix<Complex64> {
    let (nrows, ncols) = a.dim();
    DMatrix::from_fn(nrows, ncols, |i, j| Complex64::new(a[[i, j]], 0.0))
}

pub(crate) fn to_array2<T: nalgebra::Scalar>(m: &DMatrix<T>) -> Array2<T> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)].clone())
}

fn check_finite(a: ArrayView2<'_, f64>) -> Result<(), LinalgError> {
    if a.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(LinalgError("matrix contains non-finite values"))
    }
}

/// Descending order of a slice of singular values
fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    order
}

/// Compute the thin SVD of `a`, keeping only the left singular vectors
pub fn thin_svd(a: ArrayView2<'_, f64>) -> Result<ThinSvd, LinalgError> {
    check_finite(a)?;
    if a.is_empty() {
        return Err(LinalgError("cannot decompose an empty matrix"));
    }

    let svd = SVD::new(to_dmatrix(a), true, false);
    let u = svd.u.ok_or(LinalgError("left singular vectors were not computed"))?;

    let values: Vec<f64> = svd.singular_values.iter().copied().collect();
    let order = descending_order(&values);

    let s = Array1::from_iter(order.iter().map(|&i| values[i]));
    let u = Array2::from_shape_fn((u.nrows(), order.len()), |(i, j)| u[(i, order[j])]);

    Ok(ThinSvd { u, s })
}

/// Singular values of `a`, descending
pub fn singular_values(a: ArrayView2<'_, f64>) -> Result<Array1<f64>, LinalgError> {
    check_finite(a)?;
    if a.is_empty() {
        return Err(LinalgError("cannot decompose an empty matrix"));
    }
    let mut values: Vec<f64> = to_dmatrix(a).singular_values().iter().copied().collect();
    values.sort_by(|a, b| b.total_cmp(a));
    Ok(Array1::from(values))
}
