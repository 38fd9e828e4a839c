//! Feature transformation module
//!
//! Per-feature power transforms that reshape skewed distributions toward a
//! Gaussian bell:
//! - Box-Cox (strictly positive inputs, shift-corrected)
//! - Yeo-Johnson (signed inputs)
//!
//! Lambdas are estimated per feature by maximum likelihood and stored in a
//! per-column map; estimation is embarrassingly parallel across features.

mod power;

pub use power::{BoxCoxTransformer, YeoJohnsonTransformer};
