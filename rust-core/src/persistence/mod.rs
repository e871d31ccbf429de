//! Labeled dataset form of a fitted decomposition

pub mod dataset;
pub mod encoding;

pub use dataset::{CostsDataset, SOLVER_OPTIONS_PREFIX};
pub use encoding::{sanitize_map, unsanitize_map, AttrValue, ConfigValue, ABSENT_SENTINEL, CALLABLE_PREFIX};
