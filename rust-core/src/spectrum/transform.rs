//! Transforms of the eigenvalue frequencies used for band clustering
//!
//! All transforms act on the imaginary part of omega only.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{CostsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OmegaTransform {
    /// |Im(omega)|
    #[default]
    Absolute,

    /// Im(omega)^2
    SquareFrequencies,

    /// log10(|Im(omega)|), non-finite values imputed with the smallest finite one
    Log10,

    /// 1 / |Im(omega)|
    Period,
}

impl OmegaTransform {
    pub fn as_str(&self) -> &'static str {
        match self {
            OmegaTransform::Absolute => "absolute",
            OmegaTransform::SquareFrequencies => "square_frequencies",
            OmegaTransform::Log10 => "log10",
            OmegaTransform::Period => "period",
        }
    }

    /// Apply the transform to a flat array of eigenvalues
    pub fn apply(&self, omega: ArrayView1<'_, Complex64>) -> Result<Array1<f64>> {
        match self {
            OmegaTransform::Absolute => Ok(omega.mapv(|w| w.im.abs())),
            // Literal square of the imaginary part, not |omega|^2
            OmegaTransform::SquareFrequencies => Ok(omega.mapv(|w| w.im * w.im)),
            OmegaTransform::Log10 => {
                let mut transformed = omega.mapv(|w| w.im.abs().log10());
                let imputer = transformed
                    .iter()
                    .copied()
                    .filter(|v| v.is_finite())
                    .min_by(f64::total_cmp)
                    .ok_or_else(|| {
                        CostsError::NumericalEdgeCase(
                            "log10 transform produced no finite values to impute with".to_string(),
                        )
                    })?;
                transformed.mapv_inplace(|v| if v.is_finite() { v } else { imputer });
                Ok(transformed)
            }
            OmegaTransform::Period => Ok(omega.mapv(|w| 1.0 / w.im.abs())),
        }
    }
}

impl fmt::Display for OmegaTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OmegaTransform {
    type Err = CostsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "absolute" => Ok(OmegaTransform::Absolute),
            "square_frequencies" => Ok(OmegaTransform::SquareFrequencies),
            "log10" => Ok(OmegaTransform::Log10),
            "period" => Ok(OmegaTransform::Period),
            other => Err(CostsError::config(format!("transform method `{other}` not supported"))),
        }
    }
}
