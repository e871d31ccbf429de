#![allow(dead_code)]

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const SLOW: f64 = 0.05;
pub const FAST: f64 = 0.5;

/// Two travelling waves on four variables plus uniform noise
///
/// # Returns
/// (data, slow component, time)
pub fn two_scale_series(n_time_steps: usize, noise: f64, seed: u64) -> (Array2<f64>, Array2<f64>, Array1<f64>) {
    let time = Array1::from_iter((0..n_time_steps).map(|i| i as f64));

    let slow = Array2::from_shape_fn((4, n_time_steps), |(v, i)| {
        let t = time[i];
        match v {
            0 => (SLOW * t).sin(),
            1 => (SLOW * t).cos(),
            2 => 0.5 * (SLOW * t).sin(),
            _ => 0.0,
        }
    });
    let fast = Array2::from_shape_fn((4, n_time_steps), |(v, i)| {
        let t = time[i];
        match v {
            0 => 0.0,
            1 => 0.3 * (FAST * t).sin(),
            2 => (FAST * t).cos(),
            _ => (FAST * t).sin(),
        }
    });

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = &slow + &fast + Array2::from_shape_fn((4, n_time_steps), |_| rng.gen_range(-noise..=noise));
    (data, slow, time)
}
