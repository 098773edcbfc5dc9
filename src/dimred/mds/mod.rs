//! # Radius-Annealed Multidimensional Scaling
//!
//! Iterative MDS that embeds N points from R^D into R^d (d ≤ D) while preserving their
//! pairwise distances. Instead of an eigendecomposition it relaxes the embedding point by
//! point:
//!
//! 1. a [`PointFilter`] picks the points that move this iteration,
//! 2. each picked point tries axis-aligned moves of length `radius` and keeps those that
//!    lower its share of the stress (see [`Relaxation`]),
//! 3. the [`ErrorMetric`] is evaluated on the updated embedding,
//! 4. a [`RadiusUpdate`] strategy shrinks the radius when the error stops improving.
//!
//! Early on the radius is a sizeable fraction of the data spread and points make coarse,
//! global jumps; as it anneals the corrections become fine and local. A run ends when the
//! error drops below the threshold, the radius falls below its floor, the iteration cap is
//! hit, or a cancellation flag is raised. Non-convergence is reported through
//! [`Termination`], never as an error: the last embedding is always returned.
//!
//! ```ignore
//! let result = MdsBuilder::new(10, StochasticFilter::new(0.1, 0.8)?, AdaRadiusHalving::default())
//!     .keep_history(true)
//!     .random_seed(7)
//!     .build()?
//!     .fit(points.view())?;
//! if let Some(history) = &result.history {
//!     plot(history.errors(), history.radii());
//! }
//! ```

mod error;
mod history;
mod metric;
mod point_filter;
mod radius;
mod relax;

pub use error::MdsError;
pub use history::{History, IterationRecord};
pub use metric::{raw_stress, ErrorMetric};
pub use point_filter::{FullBatch, PointFilter, RoundRobin, StochasticFilter};
pub use radius::{AdaRadiusHalving, GeometricDecay, RadiusUpdate};
pub use relax::Relaxation;

use crate::dimred::pca::{NalgebraSVD, PCABuilder};
use crate::distance::DistanceMatrix;
use crate::utils::check_finite;
use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relax::Relaxer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Starting embedding of every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Initialization {
    /// Uniform in `[-h, h]^d` with `h` half the largest original distance. Single random
    /// starts can stall in a local minimum; pair with `n_init > 1`.
    Random,
    /// Leading principal component scores of the centered points. Exact when the points
    /// already lie in a `d`-dimensional affine subspace.
    #[default]
    Pca,
    /// Caller-supplied embedding of shape (N, d).
    Precomputed(Array2<f64>),
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    MaxIterationsReached,
    RadiusExhausted,
    Cancelled,
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        matches!(self, Termination::Converged)
    }
}

#[derive(Debug, Clone)]
pub struct FitResult {
    /// Final embedding (samples × target dims).
    pub embedding: Array2<f64>,
    /// Error of `embedding`.
    pub error: f64,
    /// Completed iterations of the returned run.
    pub iterations: usize,
    pub termination: Termination,
    /// Per-iteration log of the returned run, present when history was requested.
    pub history: Option<History>,
}

/// Fits an embedding of `points` (samples × features) with default engine settings.
pub fn fit<F, U>(
    points: ArrayView2<f64>,
    target_dim: usize,
    point_filter: F,
    radius_update: U,
    keep_history: bool,
) -> anyhow::Result<FitResult>
where
    F: PointFilter,
    U: RadiusUpdate,
{
    MdsBuilder::new(target_dim, point_filter, radius_update)
        .keep_history(keep_history)
        .build()?
        .fit(points)
}

/// Builder for configuring and creating [`Mds`] instances.
///
/// Default values:
/// - `max_iterations`: 1000
/// - `error_threshold`: 1e-4
/// - `min_radius`: 1e-9
/// - `relaxation`: pattern search over every candidate move
/// - `initialization`: PCA
/// - `metric`: normalized stress
/// - `random_seed`: 42
/// - `n_init`: 1
/// - `keep_history`: false
pub struct MdsBuilder<F: PointFilter, U: RadiusUpdate> {
    target_dim: usize,
    point_filter: F,
    radius_update: U,
    max_iterations: usize,
    error_threshold: f64,
    min_radius: f64,
    relaxation: Relaxation,
    initialization: Initialization,
    metric: ErrorMetric,
    random_seed: u64,
    n_init: usize,
    keep_history: bool,
    snapshot_every: Option<usize>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl<F: PointFilter, U: RadiusUpdate> MdsBuilder<F, U> {
    pub fn new(target_dim: usize, point_filter: F, radius_update: U) -> Self {
        MdsBuilder {
            target_dim,
            point_filter,
            radius_update,
            max_iterations: 1000,
            error_threshold: 1e-4,
            min_radius: 1e-9,
            relaxation: Relaxation::default(),
            initialization: Initialization::default(),
            metric: ErrorMetric::default(),
            random_seed: 42,
            n_init: 1,
            keep_history: false,
            snapshot_every: None,
            cancel_flag: None,
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// A run converges once its error drops below this value.
    pub fn error_threshold(mut self, error_threshold: f64) -> Self {
        self.error_threshold = error_threshold;
        self
    }

    /// A run stops with [`Termination::RadiusExhausted`] once the radius falls below this.
    pub fn min_radius(mut self, min_radius: f64) -> Self {
        self.min_radius = min_radius;
        self
    }

    pub fn relaxation(mut self, relaxation: Relaxation) -> Self {
        self.relaxation = relaxation;
        self
    }

    pub fn initialization(mut self, initialization: Initialization) -> Self {
        self.initialization = initialization;
        self
    }

    pub fn metric(mut self, metric: ErrorMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Number of independent runs; the one with the lowest final error is returned.
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn keep_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    /// Copies the embedding into the history every `every` iterations. Only takes effect
    /// together with `keep_history(true)`.
    pub fn snapshot_every(mut self, every: usize) -> Self {
        self.snapshot_every = Some(every);
        self
    }

    /// Flag polled between iterations; setting it ends the run with
    /// [`Termination::Cancelled`].
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn build(self) -> Result<Mds<F, U>, MdsError> {
        if self.target_dim == 0 {
            return Err(MdsError::InvalidParameter {
                name: "target_dim",
                expected: ">= 1",
                value: 0.0,
            });
        }
        if self.max_iterations == 0 {
            return Err(MdsError::InvalidParameter {
                name: "max_iterations",
                expected: ">= 1",
                value: 0.0,
            });
        }
        if !self.error_threshold.is_finite() || self.error_threshold < 0.0 {
            return Err(MdsError::InvalidParameter {
                name: "error_threshold",
                expected: "finite and >= 0",
                value: self.error_threshold,
            });
        }
        if !self.min_radius.is_finite() || self.min_radius <= 0.0 {
            return Err(MdsError::InvalidParameter {
                name: "min_radius",
                expected: "finite and > 0",
                value: self.min_radius,
            });
        }
        if self.n_init == 0 {
            return Err(MdsError::InvalidParameter {
                name: "n_init",
                expected: ">= 1",
                value: 0.0,
            });
        }
        if self.snapshot_every == Some(0) {
            return Err(MdsError::InvalidParameter {
                name: "snapshot_every",
                expected: ">= 1",
                value: 0.0,
            });
        }
        self.relaxation.validate()?;

        Ok(Mds {
            target_dim: self.target_dim,
            point_filter: self.point_filter,
            radius_update: self.radius_update,
            max_iterations: self.max_iterations,
            error_threshold: self.error_threshold,
            min_radius: self.min_radius,
            relaxation: self.relaxation,
            initialization: self.initialization,
            metric: self.metric,
            random_seed: self.random_seed,
            n_init: self.n_init,
            keep_history: self.keep_history,
            snapshot_every: self.snapshot_every,
            cancel_flag: self.cancel_flag,
        })
    }
}

/// Configured MDS engine. Create one with [`MdsBuilder`].
pub struct Mds<F: PointFilter, U: RadiusUpdate> {
    target_dim: usize,
    point_filter: F,
    radius_update: U,
    max_iterations: usize,
    error_threshold: f64,
    min_radius: f64,
    relaxation: Relaxation,
    initialization: Initialization,
    metric: ErrorMetric,
    random_seed: u64,
    n_init: usize,
    keep_history: bool,
    snapshot_every: Option<usize>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl<F: PointFilter, U: RadiusUpdate> Mds<F, U> {
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    pub fn point_filter(&self) -> &F {
        &self.point_filter
    }

    pub fn radius_update(&self) -> &U {
        &self.radius_update
    }

    /// Embeds `points` (samples × features) into `target_dim` dimensions.
    ///
    /// # Returns
    /// - `Ok(FitResult)`: the best run, whether or not it converged
    /// - `Err`: invalid input or configuration (an [`MdsError`] underneath), or a failed
    ///   PCA initialization
    pub fn fit(&mut self, points: ArrayView2<f64>) -> anyhow::Result<FitResult> {
        self.validate_input(points)?;

        let original = DistanceMatrix::from_points(points);
        let mut seeds = ChaCha8Rng::seed_from_u64(self.random_seed);
        let mut best: Option<FitResult> = None;

        for run in 0..self.n_init {
            let seed = seeds.next_u64();
            let result = self.run(points, &original, seed)?;
            info!(
                "run {}/{} finished: {:?} after {} iterations, error {:.6e}",
                run + 1,
                self.n_init,
                result.termination,
                result.iterations,
                result.error
            );
            if best.as_ref().is_none_or(|b| result.error < b.error) {
                best = Some(result);
            }
        }

        let best = best.ok_or_else(|| anyhow!("no MDS run was executed"))?;
        if self.n_init > 1 {
            info!("keeping run with error {:.6e}", best.error);
        }
        Ok(best)
    }

    fn validate_input(&self, points: ArrayView2<f64>) -> Result<(), MdsError> {
        let (n_samples, n_features) = points.dim();
        if n_samples == 0 {
            return Err(MdsError::EmptyInput);
        }
        if self.target_dim == 0 || self.target_dim > n_features {
            return Err(MdsError::InvalidTargetDim {
                target: self.target_dim,
                original: n_features,
            });
        }
        check_finite(points)?;

        if let Initialization::Precomputed(init) = &self.initialization {
            if init.dim() != (n_samples, self.target_dim) {
                return Err(MdsError::InitShapeMismatch {
                    expected: (n_samples, self.target_dim),
                    got: init.dim(),
                });
            }
            check_finite(init.view())?;
        }
        Ok(())
    }

    fn run(
        &mut self,
        points: ArrayView2<f64>,
        original: &DistanceMatrix,
        seed: u64,
    ) -> anyhow::Result<FitResult> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n_samples = points.nrows();

        let embedding = self.initial_embedding(points, original, &mut rng)?;
        let mut radius = self.radius_update.initial(original);
        if !radius.is_finite() || radius <= 0.0 {
            return Err(MdsError::InvalidRadius(radius).into());
        }

        let mut relaxer = Relaxer::new(original, embedding, self.relaxation);
        let mut history = History::new();
        let mut error = self.metric.compute_from_distances(&relaxer.current, original);
        debug!("initial error {:.6e}, radius {:.6e}", error, radius);

        let termination = if error < self.error_threshold {
            Termination::Converged
        } else {
            loop {
                let iteration = history.len() + 1;

                let selected = self.point_filter.select(iteration, n_samples, &mut rng);
                let mut accepted_moves = 0;
                for &i in &selected {
                    accepted_moves += relaxer.relax_point(i, radius, &mut rng);
                }

                relaxer.refresh();
                error = self.metric.compute_from_distances(&relaxer.current, original);
                radius = self.radius_update.adapt(&history, error);

                history.record(IterationRecord {
                    iteration,
                    error,
                    radius,
                    selected: selected.len(),
                    accepted_moves,
                });
                debug!(
                    "iteration {}: error {:.6e}, radius {:.6e}, {} points, {} moves",
                    iteration,
                    error,
                    radius,
                    selected.len(),
                    accepted_moves
                );

                if self.keep_history {
                    if let Some(every) = self.snapshot_every {
                        if iteration % every == 0 {
                            history.snapshot(iteration, &relaxer.embedding);
                        }
                    }
                }

                if error < self.error_threshold {
                    break Termination::Converged;
                }
                if !radius.is_finite() || radius < self.min_radius {
                    break Termination::RadiusExhausted;
                }
                if iteration >= self.max_iterations {
                    break Termination::MaxIterationsReached;
                }
                if self.is_cancelled() {
                    break Termination::Cancelled;
                }
            }
        };

        Ok(FitResult {
            embedding: relaxer.embedding,
            error,
            iterations: history.len(),
            termination,
            history: self.keep_history.then_some(history),
        })
    }

    fn initial_embedding(
        &self,
        points: ArrayView2<f64>,
        original: &DistanceMatrix,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Array2<f64>> {
        match &self.initialization {
            Initialization::Random => Ok(self.random_embedding(points.nrows(), original, rng)),
            Initialization::Pca => {
                if original.max() == 0.0 {
                    return Ok(Array2::zeros((points.nrows(), self.target_dim)));
                }
                let mut pca = PCABuilder::new(NalgebraSVD)
                    .n_components(self.target_dim)
                    .build();
                let embedding = pca
                    .fit_transform(points)
                    .context("PCA initialization of the embedding failed")?;
                if embedding.iter().all(|v| v.is_finite()) {
                    Ok(embedding)
                } else {
                    warn!("PCA produced non-finite scores, starting from a random embedding");
                    Ok(self.random_embedding(points.nrows(), original, rng))
                }
            }
            Initialization::Precomputed(init) => Ok(init.clone()),
        }
    }

    fn random_embedding(
        &self,
        n_samples: usize,
        original: &DistanceMatrix,
        rng: &mut dyn RngCore,
    ) -> Array2<f64> {
        let spread = original.max();
        let half = if spread > 0.0 { 0.5 * spread } else { 1.0 };
        Array2::from_shape_fn((n_samples, self.target_dim), |_| {
            rng.random_range(-half..=half)
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn unit_square() -> Array2<f64> {
        array![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    fn random_points(n: usize, dim: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Array2::from_shape_fn((n, dim), |_| rng.random_range(-1.0..1.0))
    }

    /// `n` points at random positions along a random line in R^dim.
    fn line_points(n: usize, dim: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let direction: Vec<f64> = (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect();
        let norm = direction.iter().map(|v| v * v).sum::<f64>().sqrt();
        let offset: Vec<f64> = (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect();

        let mut points = Array2::zeros((n, dim));
        for i in 0..n {
            let t: f64 = rng.random_range(0.0..5.0);
            for k in 0..dim {
                points[[i, k]] = offset[k] + t * direction[k] / norm;
            }
        }
        points
    }

    fn full_batch() -> StochasticFilter {
        StochasticFilter::new(1.0, 1.0).unwrap()
    }

    fn assert_distances_preserved(points: &Array2<f64>, embedding: &Array2<f64>, epsilon: f64) {
        let original = DistanceMatrix::from_points(points.view());
        let embedded = DistanceMatrix::from_points(embedding.view());
        for i in 0..original.len() {
            for j in 0..original.len() {
                assert_relative_eq!(embedded.get(i, j), original.get(i, j), epsilon = epsilon);
            }
        }
    }

    #[test]
    fn test_unit_square_converges() {
        init_logger();
        let points = unit_square();

        for seed in 0..10 {
            let result = MdsBuilder::new(2, full_batch(), AdaRadiusHalving::default())
                .error_threshold(1e-3)
                .max_iterations(200)
                .n_init(1)
                .random_seed(seed)
                .keep_history(true)
                .build()
                .unwrap()
                .fit(points.view())
                .unwrap();

            assert_eq!(result.termination, Termination::Converged, "seed {seed}");
            assert!(result.error < 1e-3, "seed {seed}: error {}", result.error);
            assert!(result.iterations <= 200);
            assert_eq!(result.history.unwrap().len(), result.iterations);
            assert_eq!(result.embedding.shape(), &[4, 2]);
            assert_distances_preserved(&points, &result.embedding, 1e-2);
        }
    }

    #[test]
    fn test_line_in_ten_dimensions() {
        init_logger();
        let points = line_points(20, 10, 11);

        for seed in 0..10 {
            let result = fit_line(&points, seed);
            assert!(result.termination.is_converged(), "seed {seed}: {:?}", result.termination);
            assert!(result.error < 1e-3, "seed {seed}: error {}", result.error);
            assert_eq!(result.embedding.shape(), &[20, 1]);
            assert_distances_preserved(&points, &result.embedding, 1e-2);
        }
    }

    fn fit_line(points: &Array2<f64>, seed: u64) -> FitResult {
        MdsBuilder::new(1, FullBatch, AdaRadiusHalving::default())
            .error_threshold(1e-3)
            .max_iterations(200)
            .n_init(1)
            .random_seed(seed)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap()
    }

    #[test]
    fn test_default_fit_converges_on_exact_layouts() {
        let square = fit(unit_square().view(), 2, FullBatch, AdaRadiusHalving::default(), false).unwrap();
        assert!(square.termination.is_converged());

        let line = line_points(20, 10, 3);
        let result = fit(line.view(), 1, FullBatch, AdaRadiusHalving::default(), false).unwrap();
        assert!(result.termination.is_converged());
        assert!(result.error < 1e-4);
    }

    #[test]
    fn test_random_restarts_escape_local_minima() {
        let points = unit_square();
        let result = MdsBuilder::new(2, full_batch(), AdaRadiusHalving::default())
            .initialization(Initialization::Random)
            .error_threshold(1e-3)
            .max_iterations(200)
            .n_init(8)
            .keep_history(true)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        assert_eq!(result.termination, Termination::Converged);
        let history = result.history.unwrap();
        assert!(!history.is_empty());
        assert!(history.len() <= 200);
        assert_distances_preserved(&points, &result.embedding, 1e-2);
    }

    #[test]
    fn test_unit_square_pca_seed_is_exact() {
        let points = unit_square();
        let result = MdsBuilder::new(2, full_batch(), AdaRadiusHalving::default())
            .initialization(Initialization::Pca)
            .keep_history(true)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        assert_eq!(result.termination, Termination::Converged);
        assert_eq!(result.iterations, 0);
        assert!(result.history.unwrap().is_empty());
        assert!(result.error < 1e-9);
    }

    #[test]
    fn test_coincident_points_complete() {
        let points = array![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 2.0]];
        let result = MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .max_iterations(100)
            .keep_history(true)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        assert!(result.embedding.iter().all(|v| v.is_finite()));
        assert!(result.error.is_finite() && result.error >= 0.0);
        let history = result.history.unwrap();
        assert!(history.errors().iter().all(|e| e.is_finite() && *e >= 0.0));
    }

    #[test]
    fn test_all_points_coincide() {
        let points = array![[3.0, 1.0], [3.0, 1.0], [3.0, 1.0]];
        let result = fit(points.view(), 1, FullBatch, AdaRadiusHalving::default(), true).unwrap();

        assert_eq!(result.termination, Termination::Converged);
        assert_eq!(result.error, 0.0);
        assert!(result.embedding.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_full_ratio_selects_every_point() {
        let points = random_points(15, 4, 1);
        let result = MdsBuilder::new(2, full_batch(), AdaRadiusHalving::default())
            .max_iterations(20)
            .error_threshold(0.0)
            .keep_history(true)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        let history = result.history.unwrap();
        assert!(!history.is_empty());
        assert!(history.records().iter().all(|r| r.selected == 15));
    }

    #[test]
    fn test_history_is_consistent() {
        let points = random_points(30, 6, 2);
        let result = MdsBuilder::new(2, StochasticFilter::new(0.1, 0.8).unwrap(), AdaRadiusHalving::default())
            .max_iterations(60)
            .error_threshold(0.0)
            .keep_history(true)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        let history = result.history.unwrap();
        let errors = history.errors();
        let radii = history.radii();
        assert_eq!(errors.len(), result.iterations);
        assert_eq!(radii.len(), result.iterations);
        assert!(errors.iter().all(|&e| e >= 0.0));
        assert!(radii.iter().all(|&r| r > 0.0));
        assert!(radii.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(errors.last().copied(), Some(result.error));
        for (i, record) in history.records().iter().enumerate() {
            assert_eq!(record.iteration, i + 1);
            assert!(record.selected >= 3 && record.selected <= 24);
        }
    }

    #[test]
    fn test_pattern_search_error_never_increases() {
        let points = random_points(25, 5, 3);
        let result = MdsBuilder::new(3, StochasticFilter::default(), AdaRadiusHalving::default())
            .max_iterations(80)
            .error_threshold(0.0)
            .keep_history(true)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        let errors = result.history.unwrap().errors();
        assert!(errors.windows(2).all(|w| w[1] <= w[0] + 1e-12));
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let points = random_points(30, 5, 4);
        let run = || {
            MdsBuilder::new(2, StochasticFilter::new(0.2, 0.6).unwrap(), AdaRadiusHalving::default())
                .max_iterations(40)
                .random_seed(99)
                .keep_history(true)
                .build()
                .unwrap()
                .fit(points.view())
                .unwrap()
        };

        let first = run();
        let second = run();
        assert_eq!(first.embedding, second.embedding);
        assert_eq!(first.history, second.history);
        assert_eq!(first.termination, second.termination);
    }

    #[test]
    fn test_reusing_engine_is_reproducible() {
        let points = random_points(20, 4, 5);
        let mut mds = MdsBuilder::new(2, StochasticFilter::default(), AdaRadiusHalving::default())
            .max_iterations(30)
            .keep_history(true)
            .build()
            .unwrap();

        let first = mds.fit(points.view()).unwrap();
        let second = mds.fit(points.view()).unwrap();
        assert_eq!(first.embedding, second.embedding);
        assert_eq!(first.history, second.history);
    }

    #[test]
    fn test_best_move_is_deterministic() {
        let points = random_points(20, 4, 6);
        let relaxation = Relaxation::BestMove {
            move_probability: 0.75,
        };
        let run = || {
            MdsBuilder::new(2, StochasticFilter::default(), AdaRadiusHalving::default())
                .relaxation(relaxation)
                .max_iterations(40)
                .error_threshold(0.0)
                .keep_history(true)
                .build()
                .unwrap()
                .fit(points.view())
                .unwrap()
        };

        let first = run();
        let second = run();
        assert_eq!(first.embedding, second.embedding);
        let errors = first.history.unwrap().errors();
        assert!(errors.windows(2).all(|w| w[1] <= w[0] + 1e-12));
    }

    #[test]
    fn test_max_iterations_reached() {
        let points = random_points(12, 5, 7);
        let result = MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .max_iterations(5)
            .error_threshold(0.0)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        assert_eq!(result.termination, Termination::MaxIterationsReached);
        assert_eq!(result.iterations, 5);
        assert!(result.history.is_none());
    }

    #[test]
    fn test_radius_exhausted_still_returns_embedding() {
        let points = random_points(10, 4, 8);
        let radius = AdaRadiusHalving::default().with_initial_radius(1e-8).unwrap();
        let result = MdsBuilder::new(2, FullBatch, radius)
            .min_radius(1e-6)
            .error_threshold(0.0)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        assert_eq!(result.termination, Termination::RadiusExhausted);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.embedding.shape(), &[10, 2]);
    }

    #[test]
    fn test_cancellation_between_iterations() {
        let points = random_points(20, 5, 9);
        let flag = Arc::new(AtomicBool::new(true));
        let result = MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .error_threshold(0.0)
            .cancel_flag(flag)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        assert_eq!(result.termination, Termination::Cancelled);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_snapshots() {
        let points = random_points(10, 5, 10);
        let result = MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .max_iterations(6)
            .error_threshold(0.0)
            .keep_history(true)
            .snapshot_every(2)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        let history = result.history.unwrap();
        let iterations: Vec<usize> = history.snapshots().iter().map(|(i, _)| *i).collect();
        assert_eq!(iterations, vec![2, 4, 6]);
        assert_eq!(history.snapshots()[2].1, result.embedding);
    }

    #[test]
    fn test_more_restarts_never_hurt() {
        let points = random_points(15, 4, 12);
        let fit_with = |n_init| {
            MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
                .initialization(Initialization::Random)
                .max_iterations(50)
                .n_init(n_init)
                .random_seed(3)
                .build()
                .unwrap()
                .fit(points.view())
                .unwrap()
        };

        assert!(fit_with(4).error <= fit_with(1).error);
    }

    #[test]
    fn test_precomputed_initialization() {
        let points = unit_square();
        let start = array![[0.1, 0.0], [0.9, 0.1], [1.0, 0.9], [0.0, 1.1]];
        let result = MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .initialization(Initialization::Precomputed(start.clone()))
            .max_iterations(1)
            .error_threshold(0.0)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        let original = DistanceMatrix::from_points(points.view());
        let start_error = ErrorMetric::NormalizedStress.compute(start.view(), &original);
        assert!(result.error <= start_error);
    }

    #[test]
    fn test_mean_squared_metric() {
        let points = random_points(10, 3, 13);
        let result = MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .metric(ErrorMetric::MeanSquared)
            .max_iterations(30)
            .error_threshold(0.0)
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap();

        let original = DistanceMatrix::from_points(points.view());
        assert_relative_eq!(
            result.error,
            ErrorMetric::MeanSquared.compute(result.embedding.view(), &original),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_configuration_errors() {
        let points = unit_square();

        let err = fit(points.view(), 3, FullBatch, AdaRadiusHalving::default(), false).unwrap_err();
        assert_eq!(
            err.downcast_ref::<MdsError>(),
            Some(&MdsError::InvalidTargetDim { target: 3, original: 2 })
        );

        let empty = Array2::<f64>::zeros((0, 3));
        let err = fit(empty.view(), 1, FullBatch, AdaRadiusHalving::default(), false).unwrap_err();
        assert_eq!(err.downcast_ref::<MdsError>(), Some(&MdsError::EmptyInput));

        let broken = array![[0.0, 1.0], [f64::INFINITY, 0.0]];
        let err = fit(broken.view(), 1, FullBatch, AdaRadiusHalving::default(), false).unwrap_err();
        assert_eq!(
            err.downcast_ref::<MdsError>(),
            Some(&MdsError::NonFinite { row: 1, col: 0 })
        );

        let err = MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .initialization(Initialization::Precomputed(Array2::zeros((3, 2))))
            .build()
            .unwrap()
            .fit(points.view())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MdsError>(),
            Some(MdsError::InitShapeMismatch { .. })
        ));

        assert!(MdsBuilder::new(0, FullBatch, AdaRadiusHalving::default()).build().is_err());
        assert!(MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .min_radius(0.0)
            .build()
            .is_err());
        assert!(MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .n_init(0)
            .build()
            .is_err());
        assert!(MdsBuilder::new(2, FullBatch, AdaRadiusHalving::default())
            .snapshot_every(0)
            .build()
            .is_err());
        assert!(StochasticFilter::new(0.8, 0.1).is_err());
    }

    #[test]
    fn test_boxed_strategies() {
        let points = random_points(8, 3, 14);
        let filter: Box<dyn PointFilter> = Box::new(RoundRobin::new(0.5).unwrap());
        let radius: Box<dyn RadiusUpdate> = Box::new(GeometricDecay::new(0.9).unwrap());
        let result = fit(points.view(), 2, filter, radius, true).unwrap();

        let history = result.history.unwrap();
        assert!(history.records().iter().all(|r| r.selected == 4));
    }
}
