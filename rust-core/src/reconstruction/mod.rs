//! Reconstruction of frequency bands from window fits

pub mod overlap_add;

pub use overlap_add::{global_reconstruction, relative_error, scale_reconstruction, scale_separation};
