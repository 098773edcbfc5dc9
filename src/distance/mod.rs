//! # Pairwise Distances
//!
//! Euclidean distance helpers and a dense, symmetric distance matrix. The matrix of the
//! original points is computed once per fit and acts as the optimization target; the
//! matrix of the embedding is rebuilt after every iteration.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use num_traits::Float;
use rayon::prelude::*;

/// Above this many points the matrix rows are filled in parallel.
const PARALLEL_THRESHOLD: usize = 256;

pub fn squared_euclidean<T>(a: ArrayView1<T>, b: ArrayView1<T>) -> T
where
    T: Float,
{
    let mut squared_dist = T::zero();
    for i in 0..a.len() {
        let diff = a[i] - b[i];
        squared_dist = squared_dist + diff * diff;
    }
    squared_dist
}

pub fn euclidean<T>(a: ArrayView1<T>, b: ArrayView1<T>) -> T
where
    T: Float,
{
    squared_euclidean(a, b).sqrt()
}

/// Dense N×N matrix of Euclidean distances between the rows of a point set.
///
/// The matrix is symmetric with a zero diagonal. Entries are computed with the same
/// summation order in both triangles, so `get(i, j) == get(j, i)` holds exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Array2<f64>,
}

impl DistanceMatrix {
    /// Computes all pairwise distances between the rows of `points` (samples × features).
    pub fn from_points(points: ArrayView2<f64>) -> Self {
        let n = points.nrows();
        let mut data = Array2::zeros((n, n));

        if n > PARALLEL_THRESHOLD {
            data.axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(i, mut row)| {
                    let point = points.row(i);
                    for j in 0..n {
                        if i != j {
                            row[j] = euclidean(point, points.row(j));
                        }
                    }
                });
        } else {
            for i in 0..n {
                for j in (i + 1)..n {
                    let d = euclidean(points.row(i), points.row(j));
                    data[[i, j]] = d;
                    data[[j, i]] = d;
                }
            }
        }

        DistanceMatrix { data }
    }

    /// Number of points the matrix was built from.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Largest pairwise distance, or zero for fewer than two points.
    pub fn max(&self) -> f64 {
        self.data.iter().fold(0.0, |acc, &d| acc.max(d))
    }

    /// Sum of squared distances over unordered pairs.
    pub fn sum_squares(&self) -> f64 {
        let n = self.len();
        let mut sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += self.data[[i, j]] * self.data[[i, j]];
            }
        }
        sum
    }

    /// Replaces the distances from point `i` to every other point, keeping the matrix
    /// symmetric. `distances[i]` is ignored.
    pub(crate) fn replace_row(&mut self, i: usize, distances: &[f64]) {
        for (l, &d) in distances.iter().enumerate() {
            if l != i {
                self.data[[i, l]] = d;
                self.data[[l, i]] = d;
            }
        }
    }
}
