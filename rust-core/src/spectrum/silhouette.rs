//! Cluster separation scoring for the band count sweep

use std::collections::BTreeSet;

use ndarray::{ArrayView1, ArrayView2};

use crate::error::{CostsError, Result};

/// Scores how well `labels` separate `points`, in [-1, 1], higher is better
pub trait SilhouetteScorer {
    fn score(&self, points: ArrayView2<'_, f64>, labels: ArrayView1<'_, usize>) -> Result<f64>;
}

/// Mean silhouette coefficient with Euclidean distances
///
/// For each point, `a` is the mean distance to the rest of its cluster and
/// `b` the smallest mean distance to another cluster; `s = (b - a) / max(a, b)`.
/// Points in singleton clusters score 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanSilhouette;

impl SilhouetteScorer for EuclideanSilhouette {
    fn score(&self, points: ArrayView2<'_, f64>, labels: ArrayView1<'_, usize>) -> Result<f64> {
        let n = points.nrows();
        if labels.len() != n {
            return Err(CostsError::config(format!(
                "{} labels for {n} points",
                labels.len()
            )));
        }

        let distinct: BTreeSet<usize> = labels.iter().copied().collect();
        if distinct.len() < 2 || distinct.len() >= n {
            return Err(CostsError::NumericalEdgeCase(format!(
                "silhouette score needs 2..{n} distinct labels, got {}",
                distinct.len()
            )));
        }

        let k = distinct.iter().max().map_or(0, |&m| m + 1);
        let mut cluster_sizes = vec![0usize; k];
        for &l in labels.iter() {
            cluster_sizes[l] += 1;
        }

        let mut total = 0.0;
        let mut distance_sums = vec![0.0; k];
        for i in 0..n {
            distance_sums.iter_mut().for_each(|d| *d = 0.0);
            let p1 = points.row(i);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let p2 = points.row(j);
                let dist = p1
                    .iter()
                    .zip(p2.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                distance_sums[labels[j]] += dist;
            }

            let label_i = labels[i];
            if cluster_sizes[label_i] < 2 {
                continue;
            }
            let a = distance_sums[label_i] / (cluster_sizes[label_i] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != label_i && cluster_sizes[c] > 0)
                .map(|c| distance_sums[c] / cluster_sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);

            let max_ab = a.max(b);
            if max_ab > 0.0 {
                total += (b - a) / max_ab;
            }
        }

        Ok(total / n as f64)
    }
}
