//! Eigenvalue seed handed to the solver for each window

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::CostsConfig;
use crate::error::{CostsError, Result};

/// What the seed becomes after a window has been fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeedCarry {
    /// Every window starts from the initial seed
    #[default]
    HoldInitial,

    /// The next window starts from the eigenvalues just fitted
    CarryLast,

    /// No seed; every window searches from scratch
    ResetEachWindow,
}

impl SeedCarry {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedCarry::HoldInitial => "hold_initial",
            SeedCarry::CarryLast => "carry_last",
            SeedCarry::ResetEachWindow => "reset_each_window",
        }
    }
}

impl fmt::Display for SeedCarry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeedCarry {
    type Err = CostsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hold_initial" => Ok(SeedCarry::HoldInitial),
            "carry_last" => Ok(SeedCarry::CarryLast),
            "reset_each_window" => Ok(SeedCarry::ResetEachWindow),
            other => Err(CostsError::config(format!(
                "unrecognized seed carry `{other}`, valid options are `hold_initial`, `carry_last` and `reset_each_window`"
            ))),
        }
    }
}

/// Where the initial seed came from
#[derive(Debug, Clone, PartialEq)]
pub enum SeedSource {
    Unset,
    UserProvided(Array1<Complex64>),
    ClusterSeeded(Array1<Complex64>),
}

/// Seed derived from band centroids of an earlier decomposition
///
/// Each centroid contributes `rank / n_components` copies of `sqrt(c)i`, and the
/// signs alternate along the whole vector so the seed holds conjugate pairs.
pub fn seed_from_centroids(centroids: &Array1<f64>, rank: usize, n_components: usize) -> Result<Array1<Complex64>> {
    if n_components == 0 || centroids.len() != n_components {
        return Err(CostsError::config(format!(
            "expected {n_components} cluster centroids, got {}",
            centroids.len()
        )));
    }
    if rank % n_components != 0 {
        return Err(CostsError::config(format!(
            "rank {rank} is not a multiple of the number of bands ({n_components})"
        )));
    }
    if centroids.iter().any(|&c| !(c >= 0.0 && c.is_finite())) {
        return Err(CostsError::config("cluster centroids must be finite and non-negative"));
    }

    let repeats = rank / n_components;
    Ok(centroids
        .iter()
        .flat_map(|&c| std::iter::repeat(Complex64::new(0.0, c.sqrt())).take(repeats))
        .enumerate()
        .map(|(i, w)| if i % 2 == 0 { w } else { -w })
        .collect())
}

/// Seed state across the window loop
#[derive(Debug, Clone)]
pub struct InitializationPolicy {
    source: SeedSource,
    carry: SeedCarry,
    current: Option<Array1<Complex64>>,
}

impl InitializationPolicy {
    /// Build the initial seed
    ///
    /// # Arguments
    /// * `config` - Decomposition configuration
    /// * `rank` - Rank slots per window, used to size a cluster derived seed
    pub fn from_config(config: &CostsConfig, rank: usize) -> Result<Self> {
        let source = if !config.initialize_artificially {
            SeedSource::Unset
        } else {
            match (&config.init_alpha, &config.cluster_centroids) {
                (Some(_), Some(_)) => {
                    return Err(CostsError::config(
                        "only one of init_alpha and cluster_centroids can be provided",
                    ))
                }
                (Some(alpha), None) => SeedSource::UserProvided(alpha.clone()),
                (None, Some(centroids)) => {
                    let n_components = config.n_components.unwrap_or(centroids.len());
                    SeedSource::ClusterSeeded(seed_from_centroids(centroids, rank, n_components)?)
                }
                (None, None) => SeedSource::Unset,
            }
        };

        Ok(Self::new(source, config.seed_carry))
    }

    pub fn new(source: SeedSource, carry: SeedCarry) -> Self {
        let current = match &source {
            SeedSource::Unset => None,
            SeedSource::UserProvided(seed) | SeedSource::ClusterSeeded(seed) => Some(seed.clone()),
        };
        Self { source, carry, current }
    }

    pub fn source(&self) -> &SeedSource {
        &self.source
    }

    pub fn carry(&self) -> SeedCarry {
        self.carry
    }

    /// Seed for the first window
    pub fn initial_seed(&self) -> Option<&Array1<Complex64>> {
        match &self.source {
            SeedSource::Unset => None,
            SeedSource::UserProvided(seed) | SeedSource::ClusterSeeded(seed) => Some(seed),
        }
    }

    /// Seed for the next window to be fit
    pub fn current_seed(&self) -> Option<&Array1<Complex64>> {
        self.current.as_ref()
    }

    /// Update the seed after a window fit
    pub fn advance(&mut self, fitted: &Array1<Complex64>) {
        self.current = match self.carry {
            SeedCarry::HoldInitial => self.initial_seed().cloned(),
            SeedCarry::CarryLast => Some(fitted.clone()),
            SeedCarry::ResetEachWindow => None,
        };
        debug!(carry = %self.carry, seeded = self.current.is_some(), "advanced eigenvalue seed");
    }
}
