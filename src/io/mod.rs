//! Input/output helpers.
//!
//! - algorithm JSON read/write (`algorithm`)

pub mod algorithm;

pub use algorithm::*;
