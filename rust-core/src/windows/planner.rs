//! Sliding window geometry over the time axis

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{CostsError, Result};

/// Window geometry for one decomposition level
///
/// Computed once at fit start and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPlan {
    /// Total number of time steps (T)
    pub n_time_steps: usize,

    /// Window length in time steps (L)
    pub window_length: usize,

    /// Distance between successive window starts (S)
    pub step_size: usize,

    /// Number of windows, including the trailing one when the step does not tile T
    pub n_slides: usize,

    /// True when the last window is pinned to the final L samples
    pub non_integer_n_slide: bool,
}

impl WindowPlan {
    /// Plan the windows for a series of `n_time_steps` samples
    ///
    /// # Arguments
    /// * `n_time_steps` - Series length (T)
    /// * `window_length` - Window length (L)
    /// * `step_size` - Step between windows (S)
    /// * `integer_windows` - Floor T/L before tiling
    pub fn new(
        n_time_steps: usize,
        window_length: usize,
        step_size: usize,
        integer_windows: bool,
    ) -> Result<Self> {
        if window_length == 0 {
            return Err(CostsError::config("window length must be positive"));
        }
        if step_size == 0 {
            return Err(CostsError::config("step size must be positive"));
        }
        if step_size > window_length {
            return Err(CostsError::config(format!(
                "step size ({step_size}) is larger than the window length ({window_length}), leaving samples outside every window"
            )));
        }
        if window_length > n_time_steps {
            return Err(CostsError::config(format!(
                "window length ({window_length}) is larger than the time dimension ({n_time_steps})"
            )));
        }

        // n_steps = L * n_split, which is T unless the split is floored
        let n_steps = if integer_windows {
            window_length * (n_time_steps / window_length)
        } else {
            n_time_steps
        };

        let mut n_slides = (n_steps - window_length) / step_size + 1;

        // A step that does not tile the data leaves a remainder, which gets
        // one extra window pinned to the end of the series
        let covered = step_size * (n_slides - 1) + window_length;
        let non_integer_n_slide = n_time_steps > covered;
        if non_integer_n_slide {
            n_slides += 1;
        }

        Ok(Self {
            n_time_steps,
            window_length,
            step_size,
            n_slides,
            non_integer_n_slide,
        })
    }

    /// Sample indices of window `k`
    ///
    /// The flagged last window always covers the final `window_length` samples.
    pub fn window_indices(&self, k: usize) -> Range<usize> {
        if self.non_integer_n_slide && k + 1 == self.n_slides {
            return self.n_time_steps - self.window_length..self.n_time_steps;
        }
        let start = self.step_size * k;
        start..start + self.window_length
    }

    /// Iterate over all window index ranges in order
    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.n_slides).map(move |k| self.window_indices(k))
    }
}
