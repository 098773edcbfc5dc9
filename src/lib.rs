pub mod dimred;
pub mod distance;
mod utils;

pub use dimred::mds::{
    fit, AdaRadiusHalving, ErrorMetric, FitResult, FullBatch, GeometricDecay, History,
    Initialization, IterationRecord, Mds, MdsBuilder, MdsError, PointFilter, RadiusUpdate,
    Relaxation, RoundRobin, StochasticFilter, Termination,
};
pub use distance::DistanceMatrix;
