//! Decomposition configuration

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::init::SeedCarry;
use crate::error::{CostsError, Result};
use crate::persistence::ConfigValue;
use crate::windows::kernels::{KernMethod, DEFAULT_CORNER_SHARPNESS, DEFAULT_RELATIVE_FILTER_LENGTH};

/// SVD truncation rule
///
/// Stored with the integer / float encoding `0` (optimal), `r` (fixed),
/// `0 < f < 1` (energy) and `-1` (full).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SvdRank {
    /// Optimal hard threshold on the singular values
    #[default]
    Optimal,

    /// Fixed number of singular values
    Fixed(usize),

    /// Smallest rank capturing this fraction of the cumulative energy
    Energy(f64),

    /// No truncation
    Full,
}

impl SvdRank {
    /// Decode the numeric encoding
    pub fn from_value(value: f64) -> Result<Self> {
        if value == 0.0 {
            Ok(SvdRank::Optimal)
        } else if value == -1.0 {
            Ok(SvdRank::Full)
        } else if value > 0.0 && value < 1.0 {
            Ok(SvdRank::Energy(value))
        } else if value >= 1.0 && value.fract() == 0.0 && value <= usize::MAX as f64 {
            Ok(SvdRank::Fixed(value as usize))
        } else {
            Err(CostsError::config(format!("invalid svd_rank {value}")))
        }
    }

    pub fn to_config_value(&self) -> ConfigValue {
        match self {
            SvdRank::Optimal => ConfigValue::Int(0),
            SvdRank::Fixed(r) => ConfigValue::Int(*r as i64),
            SvdRank::Energy(f) => ConfigValue::Float(*f),
            SvdRank::Full => ConfigValue::Int(-1),
        }
    }

    pub fn from_config_value(value: &ConfigValue) -> Result<Self> {
        match value {
            ConfigValue::Int(v) => Self::from_value(*v as f64),
            ConfigValue::Float(v) => Self::from_value(*v),
            other => Err(CostsError::config(format!("invalid svd_rank {other:?}"))),
        }
    }
}

/// Configuration of the sliding window decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostsConfig {
    /// Rank of every window fit
    pub svd_rank: SvdRank,

    /// Project every window onto one basis computed from the full data
    pub global_svd: bool,

    /// Round local ranks up to an even number so eigenvalues can pair up
    pub force_even_eigs: bool,

    /// Upper bound on local ranks
    pub max_rank: Option<usize>,

    /// Seed the first window with `init_alpha` or with `cluster_centroids`
    pub initialize_artificially: bool,

    /// User supplied eigenvalue seed
    pub init_alpha: Option<Array1<Complex64>>,

    /// Band centroids from a previous decomposition, used to derive a seed
    pub cluster_centroids: Option<Array1<f64>>,

    /// What the seed becomes after each window
    pub seed_carry: SeedCarry,

    pub kern_method: KernMethod,

    /// Steepness of the tanh taper edges
    pub corner_sharpness: f64,

    /// Width of the reconstruction kernel relative to the window
    pub relative_filter_length: f64,

    /// Floor T/L before tiling the windows
    pub integer_windows: bool,

    /// Number of frequency bands, needed only for cluster seeded initialization
    pub n_components: Option<usize>,
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self {
            svd_rank: SvdRank::Optimal,
            global_svd: true,
            force_even_eigs: true,
            max_rank: None,
            initialize_artificially: false,
            init_alpha: None,
            cluster_centroids: None,
            seed_carry: SeedCarry::HoldInitial,
            kern_method: KernMethod::Kern,
            corner_sharpness: DEFAULT_CORNER_SHARPNESS,
            relative_filter_length: DEFAULT_RELATIVE_FILTER_LENGTH,
            integer_windows: false,
            n_components: None,
        }
    }
}

impl CostsConfig {
    /// Check values that are invalid regardless of the data
    pub fn validate(&self) -> Result<()> {
        if !(self.relative_filter_length.is_finite() && self.relative_filter_length > 0.0) {
            return Err(CostsError::config(format!(
                "relative_filter_length must be positive, got {}",
                self.relative_filter_length
            )));
        }
        if !(self.corner_sharpness.is_finite() && self.corner_sharpness > 0.0) {
            return Err(CostsError::config(format!(
                "corner_sharpness must be positive, got {}",
                self.corner_sharpness
            )));
        }
        if self.max_rank == Some(0) {
            return Err(CostsError::config("max_rank must be positive"));
        }
        if self.n_components == Some(0) {
            return Err(CostsError::config("n_components must be positive"));
        }
        if let SvdRank::Energy(f) = self.svd_rank {
            if !(f > 0.0 && f < 1.0) {
                return Err(CostsError::config(format!("energy fraction must be in (0, 1), got {f}")));
            }
        }
        Ok(())
    }
}
