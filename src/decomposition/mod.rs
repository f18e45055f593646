//! # Matrix Decomposition (`decomposition`)
//!
//! Principal component analysis over [`DataFrame`](crate::frame::DataFrame)s,
//! with helpers to inspect loadings and build analysis figures.

use crate::frame::FrameError;

// --- Submodules ---
pub mod eigen;
pub mod pca;
pub mod plots;

// --- Re-exports ---
pub use pca::PcaTransformer;
pub use plots::Plot3dOptions;

// --- Error Handling ---
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PcaError {
    #[error("PCA model is not fitted yet; call fit() first")]
    NotFitted,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("Eigen-decomposition did not converge after {0} sweeps")]
    NoConvergence(usize),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}
