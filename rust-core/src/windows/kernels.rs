//! Taper kernels applied before fitting and reconstruction kernels used for
//! the overlap-add
//!
//! The fit taper ("kern") pulls both edges of a window towards zero with a pair
//! of hyperbolic tangents, which suppresses spurious real growth of the fitted
//! eigenvalues. The reconstruction kernel is a Gaussian centred on the window
//! that de-weights the poorly fit window edges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CostsError, Result};

/// Default corner sharpness of the tanh taper
pub const DEFAULT_CORNER_SHARPNESS: f64 = 16.0;

/// Default relative filter length of the reconstruction kernel
pub const DEFAULT_RELATIVE_FILTER_LENGTH: f64 = 2.0;

/// How a window's data is tapered before it is handed to the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KernMethod {
    /// tanh rounding of both window edges towards zero.
    /// Higher corner sharpness = sharper corners.
    #[default]
    Kern,

    /// No tapering (all ones)
    Flat,
}

impl KernMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            KernMethod::Kern => "kern",
            KernMethod::Flat => "flat",
        }
    }
}

impl fmt::Display for KernMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernMethod {
    type Err = CostsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kern" => Ok(KernMethod::Kern),
            "flat" => Ok(KernMethod::Flat),
            other => Err(CostsError::config(format!(
                "unrecognized kern method `{other}`, valid options are `flat` and `kern`"
            ))),
        }
    }
}

/// Edge handling of the reconstruction kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernDirection {
    /// No taper at the trailing end (last window)
    Forward,

    /// No taper at the leading end (first window)
    Backward,
}

impl FromStr for KernDirection {
    type Err = CostsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "forward" => Ok(KernDirection::Forward),
            "backward" => Ok(KernDirection::Backward),
            other => Err(CostsError::config(format!(
                "unrecognized kernel direction `{other}`, valid options are `forward` and `backward`"
            ))),
        }
    }
}

/// Generate the fit taper for a window
///
/// # Arguments
/// * `window_length` - Number of samples (L)
/// * `corner_sharpness` - Steepness of the tanh edges
/// * `method` - Kern or Flat
///
/// # Returns
/// Weights w[n] for n = 0..L-1
pub fn calculate_lv_kern(window_length: usize, corner_sharpness: f64, method: KernMethod) -> Vec<f64> {
    match method {
        KernMethod::Kern => {
            // w[n] = tanh(c*n/L) - tanh(c*(n-L+1)/L) - 1
            let l = window_length as f64;
            (0..window_length)
                .map(|n| {
                    let n = n as f64;
                    (corner_sharpness * n / l).tanh()
                        - (corner_sharpness * (n - l + 1.0) / l).tanh()
                        - 1.0
                })
                .collect()
        }
        KernMethod::Flat => vec![1.0; window_length],
    }
}

/// Build the reconstruction kernel for one window
///
/// Gaussian with standard deviation `L / relative_filter_length` centred on
/// the window midpoint. `Forward` forces `[L/2..]` to one, `Backward` forces
/// `[..L/2]` to one.
///
/// # Arguments
/// * `window_length` - Number of samples (L)
/// * `relative_filter_length` - Larger values weight the window centre more strongly
/// * `direction` - Edge special case, `None` for interior windows
pub fn build_kern(
    window_length: usize,
    relative_filter_length: f64,
    direction: Option<KernDirection>,
) -> Vec<f64> {
    let sd = window_length as f64 / relative_filter_length;
    let center = (window_length as f64 - 1.0) / 2.0;

    let mut kern: Vec<f64> = (0..window_length)
        .map(|n| {
            let n_shifted = n as f64 - center;
            (-(n_shifted * n_shifted) / (sd * sd)).exp()
        })
        .collect();

    let half = window_length / 2;
    match direction {
        Some(KernDirection::Forward) => kern[half..].fill(1.0),
        Some(KernDirection::Backward) => kern[..half].fill(1.0),
        None => {}
    }

    kern
}

/// Reconstruction kernel direction for window `k` of `n_slides`
pub fn direction_for_window(k: usize, n_slides: usize) -> Option<KernDirection> {
    if k == 0 {
        Some(KernDirection::Backward)
    } else if k + 1 == n_slides {
        Some(KernDirection::Forward)
    } else {
        None
    }
}
