//! Frequency band classification of fitted eigenvalues

pub mod bands;
pub mod clustering;
pub mod silhouette;
pub mod transform;

pub use bands::{
    canonicalize, cluster_hyperparameter_sweep, cluster_omega, default_sweep_range, FrequencyBands, SweepReport,
};
pub use clustering::{ClusterModel, ClusteringMethod, KMeans};
pub use silhouette::{EuclideanSilhouette, SilhouetteScorer};
pub use transform::OmegaTransform;
