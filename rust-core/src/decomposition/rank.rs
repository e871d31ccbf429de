//! SVD rank truncation and the per-window rank policy

use std::sync::Arc;

use ndarray::{s, Array2, ArrayView2};
use tracing::warn;

use super::config::{CostsConfig, SvdRank};
use crate::error::{CostsError, Result};
use crate::solver::linalg::{singular_values, thin_svd};

/// Optimal hard threshold coefficient for an unknown noise level
///
/// `beta` is the aspect ratio (short side / long side) of the matrix.
fn optimal_threshold_coefficient(beta: f64) -> f64 {
    0.56 * beta.powi(3) - 0.95 * beta.powi(2) + 1.82 * beta + 1.43
}

fn median(sorted_desc: &[f64]) -> f64 {
    let n = sorted_desc.len();
    if n % 2 == 1 {
        sorted_desc[n / 2]
    } else {
        0.5 * (sorted_desc[n / 2 - 1] + sorted_desc[n / 2])
    }
}

fn rank_from_singular_values(s: &[f64], shape: (usize, usize), svd_rank: SvdRank) -> usize {
    let available = s.len();
    let rank = match svd_rank {
        SvdRank::Optimal => {
            let (short, long) = if shape.0 < shape.1 { shape } else { (shape.1, shape.0) };
            let tau = median(s) * optimal_threshold_coefficient(short as f64 / long as f64);
            s.iter().filter(|&&v| v > tau).count()
        }
        SvdRank::Energy(fraction) => {
            let total: f64 = s.iter().map(|v| v * v).sum();
            if total > 0.0 {
                // First index whose cumulative energy reaches the fraction, plus one
                let mut cumulative = 0.0;
                let below = s
                    .iter()
                    .take_while(|&&v| {
                        cumulative += v * v;
                        cumulative / total < fraction
                    })
                    .count();
                (below + 1).min(available)
            } else {
                0
            }
        }
        SvdRank::Fixed(r) => r.min(available),
        SvdRank::Full => available,
    };

    if rank == 0 {
        warn!("svd rank truncation would discard all singular values; rank set to 1");
        return 1;
    }
    rank
}

/// Rank selected by `svd_rank` for `data`
///
/// # Arguments
/// * `data` - Snapshot matrix (n_data_vars x n_snapshots)
/// * `svd_rank` - Truncation rule
///
/// # Returns
/// A rank in `1..=min(n_data_vars, n_snapshots)`
pub fn compute_rank(data: ArrayView2<'_, f64>, svd_rank: SvdRank) -> Result<usize> {
    let s = singular_values(data).map_err(|e| CostsError::NumericalEdgeCase(e.to_string()))?;
    let s = s.to_vec();
    Ok(rank_from_singular_values(&s, data.dim(), svd_rank))
}

/// Leading left singular vectors of `data`, truncated by `svd_rank`
pub fn compute_svd(data: ArrayView2<'_, f64>, svd_rank: SvdRank) -> Result<Array2<f64>> {
    let svd = thin_svd(data).map_err(|e| CostsError::NumericalEdgeCase(e.to_string()))?;
    let s = svd.s.to_vec();
    let rank = rank_from_singular_values(&s, data.dim(), svd_rank);
    Ok(svd.u.slice(s![.., ..rank]).to_owned())
}

/// How many modes each window gets and how wide the result arrays are
#[derive(Debug, Clone)]
pub enum RankPolicy {
    /// One basis from the full data, shared by every window
    GlobalBasis { rank: usize, basis: Arc<Array2<f64>> },

    /// The same explicit rank for every window
    FixedLocal { rank: usize, force_even: bool, capacity: usize },

    /// Each window truncates its own singular values
    AdaptiveLocal {
        svd_rank: SvdRank,
        force_even: bool,
        max_rank: Option<usize>,
        capacity: usize,
    },
}

impl RankPolicy {
    /// Select the policy for `data` from the configuration
    pub fn from_config(config: &CostsConfig, data: ArrayView2<'_, f64>) -> Result<Self> {
        let n_data_vars = data.nrows();

        if config.global_svd {
            let basis = compute_svd(data, config.svd_rank)?;
            let rank = basis.ncols();
            return Ok(RankPolicy::GlobalBasis {
                rank,
                basis: Arc::new(basis),
            });
        }

        match config.svd_rank {
            SvdRank::Fixed(rank) => {
                if config.force_even_eigs && rank % 2 == 1 {
                    return Err(CostsError::config(format!(
                        "svd_rank {rank} is odd, but force_even_eigs is set"
                    )));
                }
                if rank > n_data_vars {
                    return Err(CostsError::config(format!(
                        "svd_rank {rank} is larger than the data spatial dimension ({n_data_vars})"
                    )));
                }
                Ok(RankPolicy::FixedLocal {
                    rank,
                    force_even: config.force_even_eigs,
                    capacity: compute_rank(data, config.svd_rank)?,
                })
            }
            svd_rank => Ok(RankPolicy::AdaptiveLocal {
                svd_rank,
                force_even: config.force_even_eigs,
                max_rank: config.max_rank,
                capacity: config.max_rank.unwrap_or(n_data_vars).min(n_data_vars),
            }),
        }
    }

    /// Pre-allocated number of rank slots per window
    pub fn capacity(&self) -> usize {
        match self {
            RankPolicy::GlobalBasis { rank, .. } => *rank,
            RankPolicy::FixedLocal { capacity, .. } => *capacity,
            RankPolicy::AdaptiveLocal { capacity, .. } => *capacity,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, RankPolicy::GlobalBasis { .. })
    }

    /// Shared projection basis, global mode only
    pub fn basis(&self) -> Option<&Arc<Array2<f64>>> {
        match self {
            RankPolicy::GlobalBasis { basis, .. } => Some(basis),
            _ => None,
        }
    }

    /// Rank for one prepared window
    ///
    /// Even forcing and `max_rank` are applied in that order, then the result
    /// is clamped to the capacity and to what the window can support.
    pub fn window_rank(&self, window: ArrayView2<'_, f64>) -> Result<usize> {
        let (svd_rank, force_even, max_rank) = match self {
            RankPolicy::GlobalBasis { rank, .. } => return Ok(*rank),
            RankPolicy::FixedLocal { rank, force_even, .. } => (SvdRank::Fixed(*rank), *force_even, None),
            RankPolicy::AdaptiveLocal {
                svd_rank,
                force_even,
                max_rank,
                ..
            } => (*svd_rank, *force_even, *max_rank),
        };

        let mut rank = compute_rank(window, svd_rank)?;
        if force_even && rank % 2 == 1 {
            rank += 1;
        }
        if let Some(max_rank) = max_rank {
            rank = rank.min(max_rank);
        }

        let supported = window.nrows().min(window.ncols());
        Ok(rank.min(self.capacity()).min(supported).max(1))
    }
}
