//! tabprep - Tabular preprocessing: power transforms and class balancing
//!
//! This crate provides preprocessing steps applied before model training:
//! - Per-feature power transforms (Box-Cox, Yeo-Johnson) with
//!   maximum-likelihood lambda estimation
//! - Class-imbalance balancers (random oversampling, random undersampling,
//!   SMOTE synthetic interpolation)
//!
//! # Modules
//!
//! - [`transform`] - Box-Cox and Yeo-Johnson feature transformers
//! - [`balance`] - Oversampling, undersampling and SMOTE balancers
//! - [`neighbors`] - Exact nearest-neighbor index backing SMOTE
//! - [`optimize`] - Brent scalar minimizer backing lambda estimation
//! - [`error`] - Error types

pub mod error;

pub mod balance;
pub mod neighbors;
pub mod optimize;
pub mod transform;

pub use error::{Result, TabprepError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::balance::{
        validate_class_ratio, ClassSummary, OversamplingBalancer, SmoteBalancer,
        UndersamplingBalancer,
    };
    pub use crate::error::{Result, TabprepError};
    pub use crate::neighbors::NearestNeighbors;
    pub use crate::optimize::minimize_scalar;
    pub use crate::transform::{BoxCoxTransformer, YeoJohnsonTransformer};
}
