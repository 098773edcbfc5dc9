//! Per-point relaxation moves.
//!
//! A point is relaxed by trying axis-aligned moves of length `radius` in the target space:
//! `+radius` along every coordinate, then `-radius` along every coordinate. The error of a
//! candidate only involves the pairs containing the moved point, and the new distances are
//! derived from the current ones in O(N) per candidate:
//!
//! ```text
//! δ'² = δ² - diff² + (diff + step)²,    diff = x[i, k] - x[l, k]
//! ```

use crate::dimred::mds::MdsError;
use crate::distance::DistanceMatrix;
use crate::utils::ZeroVec;
use ndarray::{Array2, ArrayView2};
use rand::{Rng, RngCore};
use rayon::prelude::*;

/// How candidate moves of a point are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relaxation {
    /// Tries candidates in order and applies each one that lowers the point's error
    /// immediately (Hooke–Jeeves style exploratory moves).
    PatternSearch { move_probability: f64 },
    /// Evaluates all candidates in parallel and applies only the best one, if it lowers the
    /// point's error. Ties go to the earlier candidate.
    BestMove { move_probability: f64 },
}

impl Default for Relaxation {
    fn default() -> Self {
        Relaxation::PatternSearch {
            move_probability: 1.0,
        }
    }
}

impl Relaxation {
    /// Probability with which each candidate move is considered at all.
    pub fn move_probability(&self) -> f64 {
        match *self {
            Relaxation::PatternSearch { move_probability }
            | Relaxation::BestMove { move_probability } => move_probability,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), MdsError> {
        let p = self.move_probability();
        if !p.is_finite() || p <= 0.0 || p > 1.0 {
            return Err(MdsError::InvalidParameter {
                name: "move_probability",
                expected: "in (0, 1]",
                value: p,
            });
        }
        Ok(())
    }
}

/// Mutable state of one run: the embedding and its pairwise distances.
///
/// `current` is kept in sync with `embedding` by every accepted move.
pub(crate) struct Relaxer<'a> {
    original: &'a DistanceMatrix,
    pub(crate) embedding: Array2<f64>,
    pub(crate) current: DistanceMatrix,
    relaxation: Relaxation,
    buffer: Vec<f64>,
}

impl<'a> Relaxer<'a> {
    pub(crate) fn new(
        original: &'a DistanceMatrix,
        embedding: Array2<f64>,
        relaxation: Relaxation,
    ) -> Self {
        let current = DistanceMatrix::from_points(embedding.view());
        Relaxer {
            original,
            embedding,
            current,
            relaxation,
            buffer: Vec::new(),
        }
    }

    /// Recomputes the embedded distances from scratch, dropping accumulated rounding drift.
    pub(crate) fn refresh(&mut self) {
        self.current = DistanceMatrix::from_points(self.embedding.view());
    }

    /// Relaxes point `i` with moves of length `radius`. Returns the number of moves applied.
    pub(crate) fn relax_point(&mut self, i: usize, radius: f64, rng: &mut dyn RngCore) -> usize {
        let dims = self.embedding.ncols();
        let candidates = self.draw_candidates(dims, rng);
        if candidates.is_empty() {
            return 0;
        }

        let mut point_error = row_error(i, &self.current, self.original);

        match self.relaxation {
            Relaxation::PatternSearch { .. } => {
                let mut accepted = 0;
                for &candidate in &candidates {
                    let (k, step) = decode(candidate, dims, radius);
                    self.buffer.zero_len(self.original.len());
                    let error = trial_error(
                        i,
                        k,
                        step,
                        self.embedding.view(),
                        &self.current,
                        self.original,
                        Some(&mut self.buffer),
                    );
                    if error.is_finite() && error < point_error {
                        self.apply(i, k, step);
                        point_error = error;
                        accepted += 1;
                    }
                }
                accepted
            }
            Relaxation::BestMove { .. } => {
                let embedding = self.embedding.view();
                let current = &self.current;
                let original = self.original;

                let best = candidates
                    .par_iter()
                    .map(|&candidate| {
                        let (k, step) = decode(candidate, dims, radius);
                        let error = trial_error(i, k, step, embedding, current, original, None);
                        (candidate, error)
                    })
                    .filter(|(_, error)| error.is_finite())
                    .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

                match best {
                    Some((candidate, error)) if error < point_error => {
                        let (k, step) = decode(candidate, dims, radius);
                        self.buffer.zero_len(self.original.len());
                        trial_error(
                            i,
                            k,
                            step,
                            self.embedding.view(),
                            &self.current,
                            self.original,
                            Some(&mut self.buffer),
                        );
                        self.apply(i, k, step);
                        1
                    }
                    _ => 0,
                }
            }
        }
    }

    /// Indices into the `2 * dims` candidate moves that take part in this relaxation.
    fn draw_candidates(&self, dims: usize, rng: &mut dyn RngCore) -> Vec<usize> {
        let p = self.relaxation.move_probability();
        if p >= 1.0 {
            return (0..2 * dims).collect();
        }
        (0..2 * dims).filter(|_| rng.random::<f64>() < p).collect()
    }

    /// Moves point `i` along axis `k`. `buffer` must hold the distances computed for that
    /// exact move.
    fn apply(&mut self, i: usize, k: usize, step: f64) {
        self.embedding[[i, k]] += step;
        self.current.replace_row(i, &self.buffer);
    }
}

/// Axis and signed step of candidate `candidate` out of `2 * dims`.
fn decode(candidate: usize, dims: usize, radius: f64) -> (usize, f64) {
    let step = if candidate < dims { radius } else { -radius };
    (candidate % dims, step)
}

/// Sum of squared discrepancies over all pairs containing point `i`.
pub(crate) fn row_error(i: usize, current: &DistanceMatrix, original: &DistanceMatrix) -> f64 {
    original
        .row(i)
        .iter()
        .zip(current.row(i).iter())
        .enumerate()
        .filter(|(l, _)| *l != i)
        .map(|(_, (&d, &delta))| (d - delta) * (d - delta))
        .sum()
}

/// Row error of point `i` after moving it by `step` along axis `k`.
///
/// Negative squared distances caused by cancellation are clamped to zero. When `out` is
/// given it receives the new distances from `i` to every point.
fn trial_error(
    i: usize,
    k: usize,
    step: f64,
    embedding: ArrayView2<f64>,
    current: &DistanceMatrix,
    original: &DistanceMatrix,
    mut out: Option<&mut Vec<f64>>,
) -> f64 {
    let xi = embedding[[i, k]];
    let mut error = 0.0;
    for l in 0..original.len() {
        if l == i {
            continue;
        }
        let d_prev = current.get(i, l);
        let diff = xi - embedding[[l, k]];
        let moved = diff + step;
        let squared = d_prev * d_prev - diff * diff + moved * moved;
        let d = squared.max(0.0).sqrt();
        if let Some(buffer) = out.as_deref_mut() {
            buffer[l] = d;
        }
        let residual = original.get(i, l) - d;
        error += residual * residual;
    }
    error
}
