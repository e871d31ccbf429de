//! Optimized DMD solver for a single window
//!
//! # Algorithm
//! 1. Project the window onto a spatial basis (given, or the window's own SVD)
//! 2. Initial eigenvalues from exact DMD of the projected snapshots,
//!    `omega = ln(lambda) / dt`, unless a seed of matching length is supplied
//! 3. Levenberg-Marquardt refinement of omega on the variable projection
//!    residual `|| X^T - Phi(omega) Phi(omega)^+ X^T ||`, where
//!    `Phi[i, j] = exp(omega_j * t_i)`
//! 4. Mode-amplitude products from the least squares solve; modes are
//!    normalized to unit length and the amplitudes carry the scale

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;
use thiserror::Error;
use tracing::{debug, warn};

use super::linalg::{thin_svd, to_array2, to_complex_dmatrix, to_dmatrix, LinalgError};
use super::{SolverConfig, SolverFit, SpectralSolver};
use crate::error::CostsError;
use crate::persistence::ConfigValue;

/// Damping attempts per Levenberg-Marquardt iteration
const MAX_DAMPING_ATTEMPTS: usize = 10;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Rank {rank} is not within 1..={available}")]
    InvalidRank { rank: usize, available: usize },

    #[error("Window needs at least two snapshots, got {0}")]
    TooFewSnapshots(usize),

    #[error("Time has {time} samples but the data has {data} snapshots")]
    TimeMismatch { time: usize, data: usize },

    #[error("Projection basis has {basis} rows but the data has {data} variables")]
    BasisMismatch { basis: usize, data: usize },

    #[error("Non-finite values in {0}")]
    NonFinite(&'static str),

    #[error("Did not converge after {iterations} iterations (relative residual {residual:.3e})")]
    NonConvergence { iterations: usize, residual: f64 },

    #[error("Linear algebra failure: {0}")]
    Linalg(#[from] LinalgError),
}

/// Ordering applied to the fitted eigenvalues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EigSort {
    #[default]
    Imag,
    Real,
    Abs,
    /// Keep the order the fit produced
    Auto,
}

impl EigSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            EigSort::Imag => "imag",
            EigSort::Real => "real",
            EigSort::Abs => "abs",
            EigSort::Auto => "auto",
        }
    }
}

impl FromStr for EigSort {
    type Err = CostsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imag" => Ok(EigSort::Imag),
            "real" => Ok(EigSort::Real),
            "abs" => Ok(EigSort::Abs),
            "auto" => Ok(EigSort::Auto),
            other => Err(CostsError::config(format!("unrecognized eig_sort `{other}`"))),
        }
    }
}

/// Constraint enforced on the eigenvalues after every accepted step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EigConstraint {
    /// Real part clipped to <= 0
    Stable,
    /// Real part forced to 0
    Imag,
    /// Eigenvalues come in complex conjugate pairs
    ConjugatePairs,
}

impl EigConstraint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EigConstraint::Stable => "stable",
            EigConstraint::Imag => "imag",
            EigConstraint::ConjugatePairs => "conjugate_pairs",
        }
    }
}

impl FromStr for EigConstraint {
    type Err = CostsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(EigConstraint::Stable),
            "imag" => Ok(EigConstraint::Imag),
            "conjugate_pairs" => Ok(EigConstraint::ConjugatePairs),
            other => Err(CostsError::config(format!("unrecognized eigenvalue constraint `{other}`"))),
        }
    }
}

/// User supplied eigenvalue transform, applied after the built-in constraints
#[derive(Clone)]
pub struct NamedEigTransform {
    pub name: String,
    pub func: fn(Complex64) -> Complex64,
}

impl fmt::Debug for NamedEigTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedEigTransform").field("name", &self.name).finish()
    }
}

/// Optimized DMD options
#[derive(Debug, Clone)]
pub struct OptDmdOptions {
    pub eig_sort: EigSort,

    /// Fit the projected snapshots instead of the full data
    pub use_proj: bool,

    pub eig_constraints: BTreeSet<EigConstraint>,

    pub eig_transform: Option<NamedEigTransform>,

    /// Maximum Levenberg-Marquardt iterations
    pub max_iter: usize,

    /// Relative residual improvement below which the fit is converged
    pub tolerance: f64,

    /// Treat hitting `max_iter` as a failure instead of a warning
    pub require_convergence: bool,
}

impl Default for OptDmdOptions {
    fn default() -> Self {
        Self {
            eig_sort: EigSort::Imag,
            use_proj: false,
            eig_constraints: BTreeSet::new(),
            eig_transform: None,
            max_iter: 30,
            tolerance: 1e-6,
            require_convergence: false,
        }
    }
}

/// Variable projection state for one set of eigenvalues
struct Projection {
    /// Mode-amplitude products (rank x n_targets)
    coefficients: DMatrix<Complex64>,

    /// Real and imaginary parts of the residual, interleaved
    residual: DVector<f64>,

    norm_sq: f64,
}

/// Optimized DMD solver
#[derive(Debug, Clone, Default)]
pub struct OptDmd {
    options: OptDmdOptions,
}

impl OptDmd {
    pub fn new(options: OptDmdOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &OptDmdOptions {
        &self.options
    }

    fn apply_constraints(&self, omega: &mut [Complex64]) {
        let constraints = &self.options.eig_constraints;

        if constraints.contains(&EigConstraint::Stable) {
            for w in omega.iter_mut() {
                w.re = w.re.min(0.0);
            }
        }
        if constraints.contains(&EigConstraint::Imag) {
            for w in omega.iter_mut() {
                w.re = 0.0;
            }
        }
        if constraints.contains(&EigConstraint::ConjugatePairs) {
            // Pair the most negative imaginary part with the most positive
            let n = omega.len();
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| omega[a].im.total_cmp(&omega[b].im));
            for i in 0..n / 2 {
                let (lo, hi) = (order[i], order[n - 1 - i]);
                let mean = (omega[hi] + omega[lo].conj()) * 0.5;
                omega[hi] = mean;
                omega[lo] = mean.conj();
            }
            if n % 2 == 1 {
                omega[order[n / 2]].im = 0.0;
            }
        }
        if let Some(transform) = &self.options.eig_transform {
            for w in omega.iter_mut() {
                *w = (transform.func)(*w);
            }
        }
    }

    /// Exact DMD eigenvalues of the projected snapshots, as continuous-time rates
    fn exact_dmd_eigenvalues(
        projected: &Array2<f64>,
        time: ArrayView1<'_, f64>,
    ) -> Result<Vec<Complex64>, SolverError> {
        let n_snapshots = time.len();
        let dt = (time[n_snapshots - 1] - time[0]) / (n_snapshots - 1) as f64;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolverError::NonFinite("time step"));
        }

        let y = to_dmatrix(projected.view());
        let y1 = y.columns(0, n_snapshots - 1).into_owned();
        let y2 = y.columns(1, n_snapshots - 1).into_owned();

        let eps = 1e-12 * y1.norm();
        let y1_pinv = y1.pseudo_inverse(eps).map_err(LinalgError)?;
        let a_tilde = y2 * y1_pinv;

        let omega = a_tilde
            .complex_eigenvalues()
            .iter()
            .map(|lambda| {
                let w = lambda.ln() / dt;
                // A zero eigenvalue has no continuous-time counterpart; start it
                // as a fast decay instead
                if w.is_finite() {
                    w
                } else {
                    Complex64::new(-1.0 / dt, 0.0)
                }
            })
            .collect();

        Ok(omega)
    }

    /// Solve for the mode-amplitude products at fixed omega
    fn project(omega: &[Complex64], time: ArrayView1<'_, f64>, target: &DMatrix<Complex64>) -> Option<Projection> {
        let n_snapshots = time.len();
        let phi = DMatrix::from_fn(n_snapshots, omega.len(), |i, j| (omega[j] * time[i]).exp());
        if !phi.iter().all(|v| v.is_finite()) {
            return None;
        }

        let svd = phi.clone().svd(true, true);
        let largest = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
        let eps = largest * n_snapshots.max(omega.len()) as f64 * f64::EPSILON;
        let coefficients = svd.solve(target, eps).ok()?;

        let residual_matrix = target - &phi * &coefficients;
        let residual = DVector::from_iterator(
            2 * residual_matrix.len(),
            residual_matrix.iter().flat_map(|v| [v.re, v.im]),
        );
        let norm_sq = residual.norm_squared();
        if !norm_sq.is_finite() {
            return None;
        }

        Some(Projection {
            coefficients,
            residual,
            norm_sq,
        })
    }

    fn to_params(omega: &[Complex64]) -> Vec<f64> {
        omega.iter().flat_map(|w| [w.re, w.im]).collect()
    }

    fn from_params(params: &[f64]) -> Vec<Complex64> {
        params.chunks(2).map(|p| Complex64::new(p[0], p[1])).collect()
    }

    /// Levenberg-Marquardt refinement of omega
    fn refine(
        &self,
        mut omega: Vec<Complex64>,
        time: ArrayView1<'_, f64>,
        target: &DMatrix<Complex64>,
    ) -> Result<(Vec<Complex64>, Projection), SolverError> {
        let target_norm_sq = target.iter().map(|v| v.norm_sqr()).sum::<f64>().max(f64::MIN_POSITIVE);
        let mut current = Self::project(&omega, time, target).ok_or(SolverError::NonFinite("initial eigenvalues"))?;

        let mut damping = 1e-3;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.options.max_iter {
            iterations += 1;

            // Forward difference Jacobian of the residual w.r.t. (Re, Im) of omega
            let params = Self::to_params(&omega);
            let mut jacobian = DMatrix::<f64>::zeros(current.residual.len(), params.len());
            for j in 0..params.len() {
                let h = 1e-7 * params[j].abs().max(1.0);
                let mut shifted = params.clone();
                shifted[j] += h;
                let perturbed = Self::project(&Self::from_params(&shifted), time, target)
                    .ok_or(SolverError::NonFinite("jacobian"))?;
                let column = (&perturbed.residual - &current.residual) / h;
                jacobian.set_column(j, &column);
            }

            let jtj = jacobian.transpose() * &jacobian;
            let gradient = jacobian.transpose() * &current.residual;

            let mut accepted = None;
            for _ in 0..MAX_DAMPING_ATTEMPTS {
                let mut lhs = jtj.clone();
                for i in 0..params.len() {
                    lhs[(i, i)] += damping * jtj[(i, i)].max(1e-12);
                }

                if let Some(step) = lhs.lu().solve(&(-&gradient)) {
                    let trial_params: Vec<f64> = params.iter().zip(step.iter()).map(|(p, d)| p + d).collect();
                    let mut trial_omega = Self::from_params(&trial_params);
                    self.apply_constraints(&mut trial_omega);

                    if let Some(trial) = Self::project(&trial_omega, time, target) {
                        if trial.norm_sq < current.norm_sq {
                            damping = (damping / 3.0).max(1e-12);
                            accepted = Some((trial_omega, trial));
                            break;
                        }
                    }
                }
                damping *= 4.0;
            }

            match accepted {
                Some((trial_omega, trial)) => {
                    let improvement = (current.norm_sq - trial.norm_sq) / current.norm_sq;
                    omega = trial_omega;
                    current = trial;
                    if improvement < self.options.tolerance {
                        converged = true;
                        break;
                    }
                }
                None => {
                    // No descent direction left: stationary point
                    converged = true;
                    break;
                }
            }
        }

        let relative_residual = (current.norm_sq / target_norm_sq).sqrt();
        if !converged {
            if self.options.require_convergence {
                return Err(SolverError::NonConvergence {
                    iterations,
                    residual: relative_residual,
                });
            }
            warn!(iterations, relative_residual, "optimized DMD hit its iteration limit");
        } else {
            debug!(iterations, relative_residual, "optimized DMD converged");
        }

        Ok((omega, current))
    }

    fn sort_order(&self, omega: &[Complex64]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..omega.len()).collect();
        match self.options.eig_sort {
            EigSort::Imag => order.sort_by(|&a, &b| omega[a].im.total_cmp(&omega[b].im)),
            EigSort::Real => order.sort_by(|&a, &b| omega[a].re.total_cmp(&omega[b].re)),
            EigSort::Abs => order.sort_by(|&a, &b| omega[a].norm().total_cmp(&omega[b].norm())),
            EigSort::Auto => {}
        }
        order
    }
}

impl SpectralSolver for OptDmd {
    type Error = SolverError;

    fn fit(
        &self,
        config: &SolverConfig,
        data: ArrayView2<'_, f64>,
        time: ArrayView1<'_, f64>,
    ) -> Result<SolverFit, SolverError> {
        let (n_vars, n_snapshots) = data.dim();
        if n_snapshots < 2 {
            return Err(SolverError::TooFewSnapshots(n_snapshots));
        }
        if time.len() != n_snapshots {
            return Err(SolverError::TimeMismatch {
                time: time.len(),
                data: n_snapshots,
            });
        }
        if !data.iter().chain(time.iter()).all(|v| v.is_finite()) {
            return Err(SolverError::NonFinite("window data"));
        }

        let rank = config.rank;
        let basis: Array2<f64> = match &config.projection_basis {
            Some(basis) => {
                if basis.nrows() != n_vars {
                    return Err(SolverError::BasisMismatch {
                        basis: basis.nrows(),
                        data: n_vars,
                    });
                }
                if rank == 0 || rank > basis.ncols() {
                    return Err(SolverError::InvalidRank {
                        rank,
                        available: basis.ncols(),
                    });
                }
                basis.slice(s![.., ..rank]).to_owned()
            }
            None => {
                let svd = thin_svd(data)?;
                if rank == 0 || rank > svd.u.ncols() {
                    return Err(SolverError::InvalidRank {
                        rank,
                        available: svd.u.ncols(),
                    });
                }
                svd.u.slice(s![.., ..rank]).to_owned()
            }
        };
        let projected = basis.t().dot(&data);

        let seed = config
            .initial_eigenvalue_seed
            .as_ref()
            .filter(|seed| seed.len() == rank && seed.iter().all(|w| w.is_finite()));
        let mut omega = match seed {
            Some(seed) => seed.to_vec(),
            None => {
                if let Some(ignored) = &config.initial_eigenvalue_seed {
                    warn!(
                        rank,
                        seed_len = ignored.len(),
                        "ignoring unusable eigenvalue seed; starting from exact DMD eigenvalues"
                    );
                }
                Self::exact_dmd_eigenvalues(&projected, time)?
            }
        };
        self.apply_constraints(&mut omega);

        // Least squares targets are the snapshots transposed: time x variables
        let target = if self.options.use_proj {
            to_complex_dmatrix(projected.view()).transpose()
        } else {
            to_complex_dmatrix(data).transpose()
        };
        let (omega, projection) = self.refine(omega, time, &target)?;

        // Columns of the transposed coefficients are mode * amplitude
        let coefficients = to_array2(&projection.coefficients.transpose());
        let scaled_modes = if self.options.use_proj {
            basis.mapv(|v| Complex64::new(v, 0.0)).dot(&coefficients)
        } else {
            coefficients
        };

        let order = self.sort_order(&omega);
        let mut modes = Array2::<Complex64>::zeros((n_vars, rank));
        let mut eigenvalues = Array1::<Complex64>::zeros(rank);
        let mut amplitudes = Array1::<Complex64>::zeros(rank);

        for (slot, &j) in order.iter().enumerate() {
            let column = scaled_modes.column(j);
            let norm = column.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
            eigenvalues[slot] = omega[j];
            amplitudes[slot] = Complex64::new(norm, 0.0);
            if norm > 0.0 {
                modes.column_mut(slot).assign(&column.mapv(|v| v / norm));
            }
        }

        Ok(SolverFit {
            modes,
            eigenvalues,
            amplitudes,
        })
    }

    fn describe(&self) -> BTreeMap<String, ConfigValue> {
        let options = &self.options;
        let mut described = BTreeMap::new();
        described.insert("eig_sort".to_string(), ConfigValue::Text(options.eig_sort.as_str().to_string()));
        described.insert("use_proj".to_string(), ConfigValue::Bool(options.use_proj));
        described.insert(
            "eig_constraints".to_string(),
            ConfigValue::Set(options.eig_constraints.iter().map(|c| c.as_str().to_string()).collect()),
        );
        described.insert(
            "eig_transform".to_string(),
            match &options.eig_transform {
                Some(transform) => ConfigValue::Callable(transform.name.clone()),
                None => ConfigValue::Absent,
            },
        );
        described.insert("max_iter".to_string(), ConfigValue::Int(options.max_iter as i64));
        described.insert("tolerance".to_string(), ConfigValue::Float(options.tolerance));
        described.insert(
            "require_convergence".to_string(),
            ConfigValue::Bool(options.require_convergence),
        );
        described
    }
}
