//! Frequency-axis calibration.
//!
//! - assign marked peaks to diffraction orders (`order`)
//! - solve for the quadratic pixel→frequency map (`calibrator`)
//! - recenter an axis on a marked peak (`center`)

pub mod calibrator;
pub mod center;
pub mod order;

pub use calibrator::*;
pub use center::*;
pub use order::*;
