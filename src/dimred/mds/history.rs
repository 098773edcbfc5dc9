use ndarray::Array2;

/// One completed iteration of a fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Error of the embedding after the iteration's updates.
    pub error: f64,
    /// Radius returned by the radius strategy after seeing `error`.
    pub radius: f64,
    /// Number of points the point filter selected.
    pub selected: usize,
    /// Number of candidate moves that were applied.
    pub accepted_moves: usize,
}

/// Append-only log of a fit.
///
/// Only the engine appends; callers get it back read-only through
/// [`FitResult::history`](super::FitResult).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    records: Vec<IterationRecord>,
    snapshots: Vec<(usize, Array2<f64>)>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed iterations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    /// Error of iteration `index` (0-based), if it was completed.
    pub fn error(&self, index: usize) -> Option<f64> {
        self.records.get(index).map(|r| r.error)
    }

    /// Errors of all completed iterations, parallel to [`History::radii`].
    pub fn errors(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.error).collect()
    }

    pub fn radii(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.radius).collect()
    }

    /// Embedding copies taken during the fit, keyed by iteration number.
    pub fn snapshots(&self) -> &[(usize, Array2<f64>)] {
        &self.snapshots
    }

    pub(crate) fn record(&mut self, record: IterationRecord) {
        debug_assert_eq!(record.iteration, self.records.len() + 1);
        self.records.push(record);
    }

    pub(crate) fn snapshot(&mut self, iteration: usize, embedding: &Array2<f64>) {
        self.snapshots.push((iteration, embedding.clone()));
    }
}
