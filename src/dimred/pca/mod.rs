//! # Principal Component Analysis
//!
//! Dense PCA used to seed MDS embeddings with a linear projection of the data. The SVD
//! backend is pluggable through [`SVDImplementation`]; [`NalgebraSVD`] is the default.

use anyhow::{anyhow, Context};
use log::warn;
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use nshare::{IntoNalgebra, IntoNdarray1, IntoNdarray2};
use rayon::prelude::*;
use std::sync::Arc;

// Trait for SVD implementations
pub trait SVDImplementation: Send + Sync {
    /// Returns the singular values (descending) and the matching right singular vectors
    /// as rows of `vt`.
    fn compute(&self, matrix: ArrayView2<f64>) -> anyhow::Result<(Array1<f64>, Array2<f64>)>;
}

/// Thin SVD through nalgebra.
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraSVD;

impl SVDImplementation for NalgebraSVD {
    fn compute(&self, matrix: ArrayView2<f64>) -> anyhow::Result<(Array1<f64>, Array2<f64>)> {
        let na_matrix = matrix.to_owned().into_nalgebra();
        let svd = na_matrix.svd(false, true);
        let vt = svd
            .v_t
            .ok_or_else(|| anyhow!("SVD did not produce right singular vectors"))?;

        let s = svd.singular_values.into_ndarray1().into_owned();
        let vt = vt.into_ndarray2().into_owned();

        // order components by decreasing singular value
        let mut order: Vec<usize> = (0..s.len()).collect();
        order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));
        let s_sorted = Array1::from_iter(order.iter().map(|&i| s[i]));
        let vt_sorted = vt.select(Axis(0), &order);

        Ok((s_sorted, vt_sorted))
    }
}

pub struct PCABuilder<S: SVDImplementation> {
    n_components: Option<usize>,
    center: bool,
    svd_implementation: Arc<S>,
}

impl<S: SVDImplementation> PCABuilder<S> {
    pub fn new(svd_implementation: S) -> Self {
        PCABuilder {
            n_components: None,
            center: true,
            svd_implementation: Arc::new(svd_implementation),
        }
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn build(self) -> Pca<S> {
        Pca {
            n_components: self.n_components,
            center: self.center,
            svd_implementation: self.svd_implementation,
            components: None,
            mean: None,
            explained_variance_ratio: None,
        }
    }
}

pub struct Pca<S: SVDImplementation> {
    n_components: Option<usize>,
    center: bool,
    svd_implementation: Arc<S>,
    components: Option<Array2<f64>>,
    mean: Option<Array1<f64>>,
    explained_variance_ratio: Option<Array1<f64>>,
}

impl<S: SVDImplementation> Pca<S> {
    pub fn fit(&mut self, x: ArrayView2<f64>) -> anyhow::Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(anyhow!("PCA requires a non-empty matrix, got {n_samples}x{n_features}"));
        }
        let n_components = self.n_components.unwrap_or(n_features);
        if n_components > n_features {
            return Err(anyhow!(
                "cannot extract {n_components} components from {n_features} features"
            ));
        }

        let mean = if self.center {
            Some(
                x.mean_axis(Axis(0))
                    .ok_or_else(|| anyhow!("failed to compute column means"))?,
            )
        } else {
            None
        };

        let x_preprocessed = self.preprocess(x, &mean);

        let (s, vt) = self
            .svd_implementation
            .compute(x_preprocessed.view())
            .context("PCA decomposition failed")?;

        // fewer samples than features leaves fewer singular vectors than requested
        let available = vt.nrows().min(n_components);
        let mut components = Array2::zeros((n_components, n_features));
        components
            .slice_mut(s![..available, ..])
            .assign(&vt.slice(s![..available, ..]));
        if available < n_components {
            warn!(
                "only {} of {} principal components available, padding with zeros",
                available, n_components
            );
        }

        let variance = s.mapv(|v| v * v);
        let total_variance = variance.sum();
        let mut ratio = Array1::zeros(n_components);
        if total_variance > 0.0 {
            for i in 0..available {
                ratio[i] = variance[i] / total_variance;
            }
        }

        self.components = Some(components);
        self.mean = mean;
        self.explained_variance_ratio = Some(ratio);

        Ok(())
    }

    fn preprocess(&self, x: ArrayView2<f64>, mean: &Option<Array1<f64>>) -> Array2<f64> {
        let mut x_preprocessed = x.to_owned();

        if let Some(m) = mean {
            x_preprocessed
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .for_each(|mut row| {
                    row -= m;
                });
        }

        x_preprocessed
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        if let Some(components) = &self.components {
            let x_preprocessed = self.preprocess(x, &self.mean);
            Ok(x_preprocessed.view().dot(&components.view().t()))
        } else {
            Err(anyhow!("PCA has not been fitted yet"))
        }
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn components(&self) -> Option<&Array2<f64>> {
        self.components.as_ref()
    }

    pub fn explained_variance_ratio(&self) -> Option<&Array1<f64>> {
        self.explained_variance_ratio.as_ref()
    }
}
