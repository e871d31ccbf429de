//! Window geometry and window weighting kernels

pub mod kernels;
pub mod planner;

pub use kernels::{build_kern, calculate_lv_kern, KernDirection, KernMethod};
pub use planner::WindowPlan;
