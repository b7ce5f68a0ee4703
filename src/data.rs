//! Synthetic data sources used for validation and tests.

pub mod sample;

pub use sample::*;
