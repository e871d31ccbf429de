//! Sliding window fit loop
//!
//! Every window is sliced, re-based to local time, mean-removed and tapered
//! before it is handed to the solver together with a freshly built
//! `SolverConfig`. Results land in fixed-capacity slots of `SpectralFits`.

use std::ops::ControlFlow;

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, info};

use super::config::CostsConfig;
use super::fits::SpectralFits;
use super::init::{InitializationPolicy, SeedCarry};
use super::rank::RankPolicy;
use crate::error::{CostsError, Result};
use crate::solver::{SolverConfig, SolverFit, SpectralSolver};
use crate::windows::{calculate_lv_kern, WindowPlan};

/// Windows between progress messages
const PROGRESS_INTERVAL: usize = 50;

/// One window ready for the solver
#[derive(Debug, Clone)]
pub struct PreparedWindow {
    /// Mean-removed, tapered data (n_data_vars x window_length)
    pub data: Array2<f64>,

    /// Time re-based to start at zero
    pub local_time: Array1<f64>,

    /// Absolute time of each sample
    pub time: Array1<f64>,

    /// Removed time-mean (n_data_vars)
    pub mean: Array1<f64>,
}

/// Drives the solver over every window of a series
pub struct WindowFitOrchestrator<'a> {
    data: ArrayView2<'a, f64>,
    time: ArrayView1<'a, f64>,
    plan: WindowPlan,
    rank_policy: RankPolicy,
    init: InitializationPolicy,
    taper: Array1<f64>,
}

impl<'a> WindowFitOrchestrator<'a> {
    /// Plan the windows and size the results
    ///
    /// # Arguments
    /// * `config` - Decomposition configuration
    /// * `data` - Snapshots (n_data_vars x n_time_steps)
    /// * `time` - Sample times (n_time_steps)
    /// * `window_length` - Samples per window
    /// * `step_size` - Samples between window starts
    pub fn new(
        config: &CostsConfig,
        data: ArrayView2<'a, f64>,
        time: ArrayView1<'a, f64>,
        window_length: usize,
        step_size: usize,
    ) -> Result<Self> {
        config.validate()?;

        let (n_data_vars, n_time_steps) = data.dim();
        if time.len() != n_time_steps {
            return Err(CostsError::config(format!(
                "data has {n_time_steps} time steps but time has {} entries",
                time.len()
            )));
        }
        if n_data_vars == 0 {
            return Err(CostsError::config("data has no variables"));
        }

        let plan = WindowPlan::new(n_time_steps, window_length, step_size, config.integer_windows)?;
        let rank_policy = RankPolicy::from_config(config, data)?;
        let init = InitializationPolicy::from_config(config, rank_policy.capacity())?;
        let taper = Array1::from(calculate_lv_kern(
            window_length,
            config.corner_sharpness,
            config.kern_method,
        ));

        Ok(Self {
            data,
            time,
            plan,
            rank_policy,
            init,
            taper,
        })
    }

    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    pub fn rank_policy(&self) -> &RankPolicy {
        &self.rank_policy
    }

    pub fn initialization(&self) -> &InitializationPolicy {
        &self.init
    }

    /// Slice and condition window `k`
    pub fn prepare_window(&self, k: usize) -> Result<PreparedWindow> {
        let range = self.plan.window_indices(k);
        let window = self.data.slice(s![.., range.clone()]);
        let time = self.time.slice(s![range]).to_owned();

        let t_start = time[0];
        let local_time = time.mapv(|t| t - t_start);

        let mean = window
            .mean_axis(Axis(1))
            .ok_or_else(|| CostsError::config("window is empty"))?;
        let mut data = &window - &mean.view().insert_axis(Axis(1));
        data *= &self.taper;

        Ok(PreparedWindow {
            data,
            local_time,
            time,
            mean,
        })
    }

    fn fit_window<S: SpectralSolver>(
        &self,
        solver: &S,
        k: usize,
        window: &PreparedWindow,
        seed: Option<&Array1<Complex64>>,
    ) -> Result<SolverFit> {
        let rank = self.rank_policy.window_rank(window.data.view())?;
        let config = SolverConfig {
            rank,
            projection_basis: self.rank_policy.basis().cloned(),
            initial_eigenvalue_seed: seed.cloned(),
        };
        debug!(window = k, rank, seeded = seed.is_some(), "fitting window");

        solver
            .fit(&config, window.data.view(), window.local_time.view())
            .map_err(|e| CostsError::Solver {
                window: k,
                source: Box::new(e),
            })
    }

    fn announce(&self) {
        info!(
            n_slides = self.plan.n_slides,
            window_length = self.plan.window_length,
            step_size = self.plan.step_size,
            non_integer_n_slide = self.plan.non_integer_n_slide,
            capacity = self.rank_policy.capacity(),
            global_svd = self.rank_policy.is_global(),
            "fitting sliding windows"
        );
    }

    /// Fit every window in order
    pub fn run<S: SpectralSolver>(self, solver: &S) -> Result<SpectralFits> {
        self.run_with_progress(solver, |_, _| ControlFlow::Continue(()))
    }

    /// Fit every window in order, consulting `observer(k, n_slides)` before each one
    ///
    /// Returning `ControlFlow::Break` stops the fit with `CostsError::Cancelled`;
    /// no partial result is returned.
    pub fn run_with_progress<S, F>(mut self, solver: &S, mut observer: F) -> Result<SpectralFits>
    where
        S: SpectralSolver,
        F: FnMut(usize, usize) -> ControlFlow<()>,
    {
        self.announce();
        let n_slides = self.plan.n_slides;
        let mut fits = SpectralFits::zeros(self.plan, self.data.nrows(), self.rank_policy.capacity());

        for k in 0..n_slides {
            if observer(k, n_slides).is_break() {
                return Err(CostsError::Cancelled { window: k });
            }
            if k % PROGRESS_INTERVAL == 0 {
                info!("{k} of {n_slides}");
            }

            let window = self.prepare_window(k)?;
            let fit = self.fit_window(solver, k, &window, self.init.current_seed())?;
            fits.write_window(k, &fit, window.mean.view(), window.time.view())?;
            self.init.advance(&fit.eigenvalues);
        }

        Ok(fits)
    }

    /// Fit all windows concurrently
    ///
    /// Only valid with a global basis and `SeedCarry::HoldInitial`, where no
    /// window's configuration depends on another window's result.
    pub fn run_parallel<S>(self, solver: &S) -> Result<SpectralFits>
    where
        S: SpectralSolver + Sync,
    {
        if !self.rank_policy.is_global() || self.init.carry() != SeedCarry::HoldInitial {
            return Err(CostsError::config(
                "parallel fitting requires global_svd with the hold_initial seed carry",
            ));
        }
        self.announce();

        let seed = self.init.initial_seed();
        let results = (0..self.plan.n_slides)
            .into_par_iter()
            .map(|k| {
                let window = self.prepare_window(k)?;
                let fit = self.fit_window(solver, k, &window, seed)?;
                Ok((window, fit))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut fits = SpectralFits::zeros(self.plan, self.data.nrows(), self.rank_policy.capacity());
        for (k, (window, fit)) in results.iter().enumerate() {
            fits.write_window(k, fit, window.mean.view(), window.time.view())?;
        }
        Ok(fits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::config::SvdRank;
    use crate::windows::KernMethod;
    use std::sync::Mutex;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("mock solver failed")]
    struct MockError;

    /// Returns eigenvalues encoding the call number and records its inputs
    #[derive(Default)]
    struct MockSolver {
        /// One-based call that fails
        fail_on_call: Option<usize>,
        seeds: Mutex<Vec<Option<Array1<Complex64>>>>,
        windows: Mutex<Vec<Array2<f64>>>,
        ranks: Mutex<Vec<usize>>,
    }

    impl SpectralSolver for MockSolver {
        type Error = MockError;

        fn fit(
            &self,
            config: &SolverConfig,
            data: ArrayView2<'_, f64>,
            time: ArrayView1<'_, f64>,
        ) -> std::result::Result<SolverFit, MockError> {
            assert_eq!(time[0], 0.0);
            self.seeds.lock().unwrap().push(config.initial_eigenvalue_seed.clone());
            self.windows.lock().unwrap().push(data.to_owned());
            let n_calls = {
                let mut ranks = self.ranks.lock().unwrap();
                ranks.push(config.rank);
                ranks.len()
            };
            if self.fail_on_call == Some(n_calls) {
                return Err(MockError);
            }

            Ok(SolverFit {
                modes: Array2::from_elem((data.nrows(), config.rank), Complex64::new(1.0, 0.0)),
                eigenvalues: Array1::from_elem(config.rank, Complex64::new(0.0, n_calls as f64)),
                amplitudes: Array1::from_elem(config.rank, Complex64::new(1.0, 0.0)),
            })
        }
    }

    fn series(n_vars: usize, n_time_steps: usize) -> (Array2<f64>, Array1<f64>) {
        let time = Array1::from_iter((0..n_time_steps).map(|i| 0.5 * i as f64 + 3.0));
        let data = Array2::from_shape_fn((n_vars, n_time_steps), |(i, k)| {
            let t = time[k];
            (i as f64 + 1.0) * (0.3 * t).sin() + (0.7 * t).cos() * (n_vars - i) as f64 + i as f64
        });
        (data, time)
    }

    fn flat_config(svd_rank: SvdRank, global_svd: bool) -> CostsConfig {
        CostsConfig {
            svd_rank,
            global_svd,
            kern_method: KernMethod::Flat,
            ..CostsConfig::default()
        }
    }

    #[test]
    fn test_sequential_fit_fills_slots() {
        let (data, time) = series(4, 60);
        let config = flat_config(SvdRank::Fixed(2), true);
        let orchestrator = WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10).unwrap();
        assert_eq!(orchestrator.plan().n_slides, 5);

        let solver = MockSolver::default();
        let fits = orchestrator.run(&solver).unwrap();

        assert_eq!(fits.window_ranks, vec![2; 5]);
        assert_eq!(fits.modes.dim(), (5, 4, 2));

        // Absolute time is stored, local time is handed to the solver
        assert_eq!(fits.time[[1, 0]], time[10]);
        assert_eq!(fits.time[[4, 19]], time[59]);

        // Stored means are the window means of the raw data
        let expected_mean = data.slice(s![.., 10..30]).mean_axis(Axis(1)).unwrap();
        for (a, b) in fits.window_means.row(1).iter().zip(expected_mean.iter()) {
            assert!((a - b).abs() < 1e-12);
        }

        // The solver sees mean-removed data
        for window in solver.windows.lock().unwrap().iter() {
            for row in window.rows() {
                assert!(row.sum().abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_taper_applied() {
        let (data, time) = series(4, 60);
        let config = CostsConfig {
            svd_rank: SvdRank::Fixed(2),
            ..CostsConfig::default()
        };
        let orchestrator = WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10).unwrap();
        let window = orchestrator.prepare_window(2).unwrap();

        // tanh taper pulls both edges to zero
        assert!(window.data.column(0).iter().all(|v| v.abs() < 1e-5));
        assert!(window.data.column(19).iter().all(|v| v.abs() < 1e-5));
        assert_eq!(window.local_time[0], 0.0);
        assert_eq!(window.time[0], time[20]);
    }

    #[test]
    fn test_solver_failure_reports_window() {
        let (data, time) = series(4, 60);
        let config = flat_config(SvdRank::Fixed(2), true);
        let orchestrator = WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10).unwrap();

        let solver = MockSolver {
            fail_on_call: Some(4),
            ..MockSolver::default()
        };
        match orchestrator.run(&solver) {
            Err(CostsError::Solver { window, source }) => {
                assert_eq!(window, 3);
                assert!(source.downcast_ref::<MockError>().is_some());
            }
            other => panic!("expected a solver failure, got {other:?}"),
        }
    }

    #[test]
    fn test_cancellation_between_windows() {
        let (data, time) = series(4, 60);
        let config = flat_config(SvdRank::Fixed(2), true);
        let orchestrator = WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10).unwrap();

        let solver = MockSolver::default();
        let mut seen = Vec::new();
        let result = orchestrator.run_with_progress(&solver, |k, n| {
            seen.push((k, n));
            if k == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert!(matches!(result, Err(CostsError::Cancelled { window: 2 })));
        assert_eq!(seen, vec![(0, 5), (1, 5), (2, 5)]);
        assert_eq!(solver.ranks.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_carry_last_feeds_next_window() {
        let (data, time) = series(4, 60);
        let config = CostsConfig {
            seed_carry: SeedCarry::CarryLast,
            ..flat_config(SvdRank::Fixed(2), false)
        };
        let orchestrator = WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10).unwrap();
        let solver = MockSolver::default();
        let fits = orchestrator.run(&solver).unwrap();

        let seeds = solver.seeds.lock().unwrap();
        assert!(seeds[0].is_none());
        for k in 1..seeds.len() {
            let seed = seeds[k].as_ref().unwrap();
            assert_eq!(seed.view(), fits.window_omega(k - 1));
        }
    }

    #[test]
    fn test_time_mismatch() {
        let (data, _) = series(4, 60);
        let time = Array1::zeros(59);
        let config = CostsConfig::default();
        assert!(matches!(
            WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10),
            Err(CostsError::Configuration(_))
        ));
    }

    #[test]
    fn test_parallel_requires_global_hold() {
        let (data, time) = series(4, 60);
        let config = flat_config(SvdRank::Fixed(2), false);
        let orchestrator = WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10).unwrap();
        assert!(matches!(
            orchestrator.run_parallel(&MockSolver::default()),
            Err(CostsError::Configuration(_))
        ));
    }

    #[test]
    fn test_parallel_matches_sequential_layout() {
        let (data, time) = series(4, 60);
        let config = flat_config(SvdRank::Fixed(2), true);

        let parallel = WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10)
            .unwrap()
            .run_parallel(&MockSolver::default())
            .unwrap();
        let sequential = WindowFitOrchestrator::new(&config, data.view(), time.view(), 20, 10)
            .unwrap()
            .run(&MockSolver::default())
            .unwrap();

        assert_eq!(parallel.window_means, sequential.window_means);
        assert_eq!(parallel.time, sequential.time);
        assert_eq!(parallel.window_ranks, sequential.window_ranks);
    }
}
