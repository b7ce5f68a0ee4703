//! Read/write algorithm JSON files.
//!
//! The schema is defined by `session::Algorithm`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{TreatError, TreatResult};
use crate::session::Algorithm;

/// Write an algorithm JSON file. Without `save_parameters`, step parameters
/// are written as their defaults.
pub fn write_algorithm_json(path: &Path, algorithm: &Algorithm, save_parameters: bool) -> TreatResult<()> {
    let json = algorithm.to_json_string(save_parameters)?;
    let mut file = File::create(path)
        .map_err(|e| TreatError::io(format!("Failed to create algorithm JSON '{}': {e}", path.display())))?;
    file.write_all(json.as_bytes())
        .map_err(|e| TreatError::io(format!("Failed to write algorithm JSON: {e}")))?;
    log::debug!("wrote algorithm '{}' to {}", algorithm.name, path.display());
    Ok(())
}

/// Read an algorithm JSON file.
pub fn read_algorithm_json(path: &Path) -> TreatResult<Algorithm> {
    let file = File::open(path)
        .map_err(|e| TreatError::io(format!("Failed to open algorithm JSON '{}': {e}", path.display())))?;
    let algorithm: Algorithm = serde_json::from_reader(file)
        .map_err(|e| TreatError::configuration(format!("Invalid algorithm JSON: {e}")))?;
    Ok(algorithm)
}
