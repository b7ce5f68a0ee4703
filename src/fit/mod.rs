//! Line-shape fitting.
//!
//! Responsibilities:
//!
//! - normalize the signal around the peak of interest (`normalize`)
//! - fit one peak in a window with Levenberg–Marquardt (`fitter`)
//! - orchestrate single and Stokes/anti-Stokes fits (`engine`)

pub mod engine;
pub mod fitter;
pub mod normalize;

pub use engine::*;
pub use fitter::*;
pub use normalize::*;
