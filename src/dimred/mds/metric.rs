use crate::distance::DistanceMatrix;
use ndarray::ArrayView2;

/// Aggregate discrepancy between embedded and original pairwise distances.
///
/// Both variants sum `(embedded - original)²` over unordered pairs and differ only in
/// how that sum is scaled, so any move that lowers one lowers the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMetric {
    /// Kruskal stress-1: `sqrt(Σ (δ - d)² / Σ d²)`. Scale-invariant; zero when every
    /// original distance is zero.
    #[default]
    NormalizedStress,
    /// Mean of `(δ - d)²` over all unordered pairs.
    MeanSquared,
}

impl ErrorMetric {
    /// Error of `embedding` (samples × target dims) against the original distances.
    pub fn compute(&self, embedding: ArrayView2<f64>, original: &DistanceMatrix) -> f64 {
        let current = DistanceMatrix::from_points(embedding);
        self.compute_from_distances(&current, original)
    }

    pub fn compute_from_distances(&self, current: &DistanceMatrix, original: &DistanceMatrix) -> f64 {
        let n = original.len();
        let raw = raw_stress(current, original);

        match self {
            ErrorMetric::NormalizedStress => {
                let normalizer = original.sum_squares();
                if normalizer > 0.0 {
                    (raw / normalizer).sqrt()
                } else {
                    0.0
                }
            }
            ErrorMetric::MeanSquared => {
                let pairs = n * n.saturating_sub(1) / 2;
                if pairs > 0 {
                    raw / pairs as f64
                } else {
                    0.0
                }
            }
        }
    }
}

/// Unscaled sum of squared distance discrepancies over unordered pairs.
pub fn raw_stress(current: &DistanceMatrix, original: &DistanceMatrix) -> f64 {
    let n = original.len();
    let mut sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let diff = current.get(i, j) - original.get(i, j);
            sum += diff * diff;
        }
    }
    sum
}
