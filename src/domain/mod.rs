//! Domain types used throughout the analysis.
//!
//! This module defines:
//!
//! - the spectrum and its marked peaks (`Spectrum`, `Point`, `Window`)
//! - model and option enums (`ModelKind`, `CenterCombination`, `CenterType`)
//! - fit outputs (`PeakFit`, `FitResult`)

pub mod types;

pub use types::*;
