use ndarray::ArrayView2;

use crate::dimred::mds::MdsError;

pub trait ZeroVec {
    fn zero_len(&mut self, len: usize);
}

impl<T: Default + Clone> ZeroVec for Vec<T> {
    fn zero_len(&mut self, len: usize) {
        self.clear();
        self.reserve(len);
        self.extend(std::iter::repeat_n(T::default(), len));
    }
}

/// Fails on the first NaN or infinite entry, reporting its position.
pub fn check_finite(points: ArrayView2<f64>) -> Result<(), MdsError> {
    for ((row, col), value) in points.indexed_iter() {
        if !value.is_finite() {
            return Err(MdsError::NonFinite { row, col });
        }
    }
    Ok(())
}
