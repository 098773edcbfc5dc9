//! # Dimensionality Reduction
//!
//! Algorithms that map points from a high-dimensional space into a lower-dimensional one
//! while keeping their geometry as intact as possible.
//!
//! ## Available
//! - **MDS** ([`mds`]): iterative multidimensional scaling driven by a shrinking search radius
//! - **PCA** ([`pca`]): linear projection onto the leading principal axes, also used to seed
//!   MDS embeddings
//!
//! ## Algorithm Selection Guide
//! - Use **PCA** when the data is close to a linear subspace or a fast projection is enough
//! - Use **MDS** when pairwise distances have to be preserved, including non-linear layouts

pub mod mds;
pub mod pca;
