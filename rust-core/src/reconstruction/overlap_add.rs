//! Weighted overlap-add reconstruction of each frequency band
//!
//! Every window's band signal is rebuilt from its fitted modes, amplitudes and
//! eigenvalues, weighted by the window's reconstruction kernel and summed into
//! the global time axis. The sum of kernel weights at each time step is the
//! normalization.

use ndarray::{s, Array2, Array3, ArrayView2, Axis, Zip};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::decomposition::SpectralFits;
use crate::error::{CostsError, Result};
use crate::spectrum::FrequencyBands;
use crate::windows::kernels::{build_kern, direction_for_window};

/// Weighted contributions of one window, one slab per present band
struct WindowContribution {
    bands: Vec<(usize, Array2<f64>)>,
    kernel: Vec<f64>,
}

fn window_contribution(
    fits: &SpectralFits,
    bands: &FrequencyBands,
    present: &[usize],
    relative_filter_length: f64,
    include_means: bool,
    k: usize,
) -> WindowContribution {
    let n_slides = fits.n_slides();
    let window_length = fits.plan.window_length;
    let kernel = build_kern(window_length, relative_filter_length, direction_for_window(k, n_slides));

    let time = fits.time.row(k);
    let t_start = time.iter().copied().fold(f64::INFINITY, f64::min);
    let local_time = time.mapv(|t| t - t_start);

    let modes = fits.modes.slice(s![k, .., ..]);
    let mean = fits.window_means.row(k);
    let rank = fits.window_ranks[k];

    let contributions = present
        .iter()
        .map(|&band| {
            let slots: Vec<usize> = (0..rank).filter(|&j| bands.omega_classes[[k, j]] == band).collect();

            // Re(W diag(b) exp(omega t)) over the band's slots
            let mut signal = Array2::<f64>::zeros((fits.n_data_vars(), window_length));
            for &j in &slots {
                let amplitude = fits.amplitudes[[k, j]];
                let omega = fits.omega[[k, j]];
                let dynamics: Vec<Complex64> = local_time.iter().map(|&t| amplitude * (omega * t).exp()).collect();
                for (v, mode) in modes.column(j).iter().enumerate() {
                    for (n, d) in dynamics.iter().enumerate() {
                        signal[[v, n]] += (mode * d).re;
                    }
                }
            }

            if include_means && band == 0 {
                signal += &mean.insert_axis(Axis(1));
            }

            for mut row in signal.rows_mut() {
                Zip::from(&mut row).and(&kernel[..]).for_each(|x, &w| *x *= w);
            }
            (band, signal)
        })
        .collect();

    WindowContribution {
        bands: contributions,
        kernel,
    }
}

/// Reconstruct every frequency band over the full time axis
///
/// # Arguments
/// * `fits` - Window fit results
/// * `bands` - Band assignment of the fitted eigenvalues
/// * `relative_filter_length` - Width parameter of the reconstruction kernel
/// * `include_means` - Add each window's time-mean back to band 0
///
/// # Returns
/// Array of shape (n_components, n_data_vars, n_time_steps)
pub fn scale_reconstruction(
    fits: &SpectralFits,
    bands: &FrequencyBands,
    relative_filter_length: f64,
    include_means: bool,
) -> Result<Array3<f64>> {
    if bands.omega_classes.dim() != fits.omega.dim() {
        return Err(CostsError::config(format!(
            "band classification {:?} does not match the fitted eigenvalues {:?}",
            bands.omega_classes.dim(),
            fits.omega.dim()
        )));
    }

    let plan = fits.plan;
    let present = bands.present_bands(fits);

    let contributions: Vec<WindowContribution> = (0..plan.n_slides)
        .into_par_iter()
        .map(|k| window_contribution(fits, bands, &present, relative_filter_length, include_means, k))
        .collect();

    let mut reconstruction = Array3::<f64>::zeros((bands.n_components, fits.n_data_vars(), plan.n_time_steps));
    let mut weights = vec![0.0; plan.n_time_steps];

    for (k, contribution) in contributions.into_iter().enumerate() {
        let range = plan.window_indices(k);
        for (band, signal) in contribution.bands {
            let mut target = reconstruction.slice_mut(s![band, .., range.clone()]);
            target += &signal;
        }
        for (w, kern) in weights[range].iter_mut().zip(&contribution.kernel) {
            *w += kern;
        }
    }

    if let Some(step) = weights.iter().position(|&w| w <= 0.0 || !w.is_finite()) {
        return Err(CostsError::NumericalEdgeCase(format!(
            "time step {step} has no reconstruction weight"
        )));
    }

    for mut lane in reconstruction.lanes_mut(Axis(2)) {
        Zip::from(&mut lane).and(&weights[..]).for_each(|x, &w| *x /= w);
    }

    Ok(reconstruction)
}

/// Sum of all bands
pub fn global_reconstruction(bands: &Array3<f64>) -> Array2<f64> {
    bands.sum_axis(Axis(0))
}

/// Lowest band and the sum of every higher band
pub fn scale_separation(bands: &Array3<f64>) -> (Array2<f64>, Array2<f64>) {
    let (_, n_data_vars, n_time_steps) = bands.dim();
    if bands.len_of(Axis(0)) == 0 {
        return (
            Array2::zeros((n_data_vars, n_time_steps)),
            Array2::zeros((n_data_vars, n_time_steps)),
        );
    }
    let low = bands.index_axis(Axis(0), 0).to_owned();
    let high = bands.slice(s![1.., .., ..]).sum_axis(Axis(0));
    (low, high)
}

/// Frobenius norm of `estimate - truth` relative to that of `truth`
pub fn relative_error(estimate: ArrayView2<'_, f64>, truth: ArrayView2<'_, f64>) -> Result<f64> {
    if estimate.dim() != truth.dim() {
        return Err(CostsError::config(format!(
            "estimate {:?} and truth {:?} differ in shape",
            estimate.dim(),
            truth.dim()
        )));
    }
    let difference = Zip::from(&estimate)
        .and(&truth)
        .fold(0.0, |acc, &e, &t| acc + (e - t) * (e - t));
    let norm = truth.iter().map(|t| t * t).sum::<f64>();
    Ok((difference / norm).sqrt())
}
