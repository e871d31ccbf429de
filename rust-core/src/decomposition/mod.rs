//! Sliding window decomposition: rank sizing, seeding and the fit loop

pub mod config;
pub mod fits;
pub mod init;
pub mod orchestrator;
pub mod rank;

pub use config::{CostsConfig, SvdRank};
pub use fits::SpectralFits;
pub use init::{seed_from_centroids, InitializationPolicy, SeedCarry, SeedSource};
pub use orchestrator::{PreparedWindow, WindowFitOrchestrator};
pub use rank::{compute_rank, compute_svd, RankPolicy};
