//! Strategies deciding which points move in a given iteration.

use crate::dimred::mds::MdsError;
use rand::seq::index;
use rand::{Rng, RngCore};

/// Slack for `ratio * n` products that land a rounding error away from an integer.
const RATIO_EPS: f64 = 1e-9;

/// Selects the points updated during one iteration.
///
/// Implementations must return distinct indices in `0..num_points`, at least one of them
/// whenever `num_points > 0`. The order of the returned indices is the order in which the
/// engine relaxes them.
pub trait PointFilter {
    fn select(&self, iteration: usize, num_points: usize, rng: &mut dyn RngCore) -> Vec<usize>;
}

impl<P: PointFilter + ?Sized> PointFilter for Box<P> {
    fn select(&self, iteration: usize, num_points: usize, rng: &mut dyn RngCore) -> Vec<usize> {
        (**self).select(iteration, num_points, rng)
    }
}

/// Samples a random fraction of the points every iteration.
///
/// The fraction is drawn uniformly from `[min_points_per_turn, max_points_per_turn]`
/// and the points are drawn uniformly without replacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticFilter {
    min_points_per_turn: f64,
    max_points_per_turn: f64,
}

impl StochasticFilter {
    pub fn new(min_points_per_turn: f64, max_points_per_turn: f64) -> Result<Self, MdsError> {
        let in_range = |r: f64| r.is_finite() && r > 0.0 && r <= 1.0;
        if !in_range(min_points_per_turn)
            || !in_range(max_points_per_turn)
            || min_points_per_turn > max_points_per_turn
        {
            return Err(MdsError::InvalidPointRatio {
                min: min_points_per_turn,
                max: max_points_per_turn,
            });
        }
        Ok(StochasticFilter {
            min_points_per_turn,
            max_points_per_turn,
        })
    }

    pub fn min_points_per_turn(&self) -> f64 {
        self.min_points_per_turn
    }

    pub fn max_points_per_turn(&self) -> f64 {
        self.max_points_per_turn
    }

    /// Inclusive bounds on the selection size for `num_points` points.
    pub fn bounds(&self, num_points: usize) -> (usize, usize) {
        let n = num_points as f64;
        let lo = ((self.min_points_per_turn * n - RATIO_EPS).ceil() as usize)
            .max(1)
            .min(num_points);
        let hi = ((self.max_points_per_turn * n + RATIO_EPS).floor() as usize)
            .min(num_points)
            .max(lo);
        (lo, hi)
    }
}

impl Default for StochasticFilter {
    fn default() -> Self {
        StochasticFilter {
            min_points_per_turn: 0.1,
            max_points_per_turn: 0.8,
        }
    }
}

impl PointFilter for StochasticFilter {
    fn select(&self, _iteration: usize, num_points: usize, rng: &mut dyn RngCore) -> Vec<usize> {
        if num_points == 0 {
            return Vec::new();
        }

        let ratio = if self.min_points_per_turn < self.max_points_per_turn {
            rng.random_range(self.min_points_per_turn..=self.max_points_per_turn)
        } else {
            self.min_points_per_turn
        };

        let (lo, hi) = self.bounds(num_points);
        let amount = ((ratio * num_points as f64).round() as usize).clamp(lo, hi);

        index::sample(rng, num_points, amount).into_vec()
    }
}

/// Every point, in index order, every iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullBatch;

impl PointFilter for FullBatch {
    fn select(&self, _iteration: usize, num_points: usize, _rng: &mut dyn RngCore) -> Vec<usize> {
        (0..num_points).collect()
    }
}

/// A contiguous window of points that walks around the index range.
///
/// Deterministic: iteration `t` (1-based) starts where iteration `t - 1` stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundRobin {
    batch_fraction: f64,
}

impl RoundRobin {
    pub fn new(batch_fraction: f64) -> Result<Self, MdsError> {
        if !batch_fraction.is_finite() || batch_fraction <= 0.0 || batch_fraction > 1.0 {
            return Err(MdsError::InvalidParameter {
                name: "batch_fraction",
                expected: "in (0, 1]",
                value: batch_fraction,
            });
        }
        Ok(RoundRobin { batch_fraction })
    }

    pub fn batch_size(&self, num_points: usize) -> usize {
        ((self.batch_fraction * num_points as f64).round() as usize).clamp(1, num_points.max(1))
    }
}

impl PointFilter for RoundRobin {
    fn select(&self, iteration: usize, num_points: usize, _rng: &mut dyn RngCore) -> Vec<usize> {
        if num_points == 0 {
            return Vec::new();
        }
        let batch = self.batch_size(num_points);
        let start = (iteration.saturating_sub(1) * batch) % num_points;
        (0..batch).map(|offset| (start + offset) % num_points).collect()
    }
}
