//! Top-level orchestration.
//!
//! This module ties the building blocks together for callers that do not
//! drive a session by hand:
//! - load an algorithm file and the environment configuration
//! - replay the algorithm on one or many spectra (`pipeline`)

use std::path::Path;

use crate::config::AnalysisConfig;
use crate::domain::Spectrum;
use crate::error::TreatResult;

pub mod pipeline;

pub use pipeline::*;

/// Replay the algorithm stored at `path` on every spectrum, with the
/// configuration taken from the environment.
pub fn treat_with_algorithm_file(path: &Path, spectra: &[Spectrum]) -> TreatResult<Vec<TreatResult<TreatedSpectrum>>> {
    let algorithm = crate::io::read_algorithm_json(path)?;
    let config = AnalysisConfig::from_env()?;
    log::info!(
        "treating {} spectra with '{}' v{} ({} steps)",
        spectra.len(),
        algorithm.name,
        algorithm.version,
        algorithm.len()
    );
    Ok(replay_batch(&algorithm, spectra, &config))
}
