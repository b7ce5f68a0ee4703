//! Numerical building blocks: linear least squares, quadratic fits and
//! Levenberg–Marquardt.

pub mod lm;
pub mod ols;
pub mod poly;

pub use lm::*;
pub use ols::*;
pub use poly::*;
