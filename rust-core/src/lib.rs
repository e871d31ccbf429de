//! COSTS - Coherent Spatiotemporal Scale Separation
//!
//! Sliding-window spectral decomposition of multivariate time series with
//! frequency band classification and overlap-add band reconstruction.
//! Optional Python bindings behind the `python` feature.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod costs;
pub mod decomposition;
pub mod error;
pub mod persistence;
pub mod reconstruction;
pub mod solver;
pub mod spectrum;
pub mod windows;

#[cfg(feature = "python")]
mod python_bindings;

pub use costs::Costs;
pub use decomposition::{CostsConfig, SeedCarry, SpectralFits, SvdRank};
pub use error::{CostsError, Result};
pub use persistence::CostsDataset;
pub use solver::{OptDmd, OptDmdOptions, SolverConfig, SolverFit, SpectralSolver};
pub use spectrum::{EuclideanSilhouette, FrequencyBands, KMeans, OmegaTransform};
pub use windows::{KernDirection, KernMethod, WindowPlan};
