//! `bls-treat` library crate.
//!
//! Treatment of Brillouin light scattering spectra:
//!
//! - resampling, peak localization and instrument-response extraction (`signal`)
//! - line-shape models and the peak fit engine (`models`, `fit`)
//! - pixel to frequency calibration of VIPA spectra (`calibrate`)
//! - recorded, replayable analysis sessions (`session`, `io`, `app`)

pub mod app;
pub mod calibrate;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod session;
pub mod signal;
