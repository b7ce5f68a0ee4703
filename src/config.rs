//! Analysis defaults and their environment overrides.
//!
//! `AnalysisConfig::from_env()` reads a `.env` file when present, then:
//!
//! - `BLS_FIT_MAX_ITER`: Levenberg–Marquardt iteration cap
//! - `BLS_FIT_FTOL`, `BLS_FIT_XTOL`: solver stopping tolerances
//! - `BLS_NORMALIZE_POINTS`: half-width (in samples) of the offset and
//!   amplitude windows used when normalizing before a fit

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TreatError, TreatResult};
use crate::math::LmOptions;

const ENV_MAX_ITER: &str = "BLS_FIT_MAX_ITER";
const ENV_FTOL: &str = "BLS_FIT_FTOL";
const ENV_XTOL: &str = "BLS_FIT_XTOL";
const ENV_NORMALIZE_POINTS: &str = "BLS_NORMALIZE_POINTS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub solver: LmOptions,
    /// Samples on each side of the global minimum averaged as the offset.
    pub offset_points: usize,
    /// Samples on each side of the peak searched for the normalization amplitude.
    pub peak_points: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            solver: LmOptions::default(),
            offset_points: 10,
            peak_points: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> TreatResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TreatResult<Self> {
        let mut config = Self::default();
        if let Some(v) = parse(&lookup, ENV_MAX_ITER)? {
            if v == 0 {
                return Err(TreatError::configuration(format!("{ENV_MAX_ITER} must be > 0.")));
            }
            config.solver.max_iter = v;
        }
        if let Some(v) = parse_tolerance(&lookup, ENV_FTOL)? {
            config.solver.ftol = v;
        }
        if let Some(v) = parse_tolerance(&lookup, ENV_XTOL)? {
            config.solver.xtol = v;
        }
        if let Some(v) = parse::<usize>(&lookup, ENV_NORMALIZE_POINTS)? {
            config.offset_points = v;
            config.peak_points = v;
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> TreatResult<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| TreatError::configuration(format!("Invalid value for {key}: '{raw}'")))
}

fn parse_tolerance(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> TreatResult<Option<f64>> {
    match parse::<f64>(lookup, key)? {
        Some(v) if !(v.is_finite() && v >= 0.0) => Err(TreatError::configuration(format!(
            "{key} must be a finite non-negative number."
        ))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_keys_keep_defaults() {
        let config = AnalysisConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.solver.max_iter, 500);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AnalysisConfig::from_lookup(lookup(&[
            ("BLS_FIT_MAX_ITER", "50"),
            ("BLS_FIT_FTOL", "1e-9"),
            ("BLS_NORMALIZE_POINTS", " 4 "),
        ]))
        .unwrap();
        assert_eq!(config.solver.max_iter, 50);
        assert_eq!(config.solver.ftol, 1e-9);
        assert_eq!(config.solver.xtol, 1e-12);
        assert_eq!(config.offset_points, 4);
        assert_eq!(config.peak_points, 4);
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        for pairs in [
            [("BLS_FIT_MAX_ITER", "many")],
            [("BLS_FIT_MAX_ITER", "0")],
            [("BLS_FIT_XTOL", "-1")],
            [("BLS_NORMALIZE_POINTS", "2.5")],
        ] {
            let err = AnalysisConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, TreatError::Configuration(_)), "{pairs:?}");
        }
    }
}
