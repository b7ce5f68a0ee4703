//! Replay of a recorded algorithm on fresh spectra.
//!
//! Each spectrum gets its own session; spectra are treated in parallel and
//! share nothing but the algorithm and the configuration.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::domain::{FitResult, Point, Spectrum, Window};
use crate::error::TreatResult;
use crate::session::{Algorithm, Session};

/// State of a spectrum after every step of an algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatedSpectrum {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub points: Vec<Point>,
    pub windows: Vec<Window>,
    pub fit: Option<FitResult>,
    pub treat_steps: Vec<String>,
}

impl From<Session> for TreatedSpectrum {
    fn from(session: Session) -> Self {
        let fit = session.last_fit().cloned();
        let treat_steps = session.treat_steps().to_vec();
        let state = session.state().clone();
        Self {
            x: state.x,
            y: state.y,
            points: state.points,
            windows: state.windows,
            fit,
            treat_steps,
        }
    }
}

/// Run every step of `algorithm` on `spectrum` and return the session.
pub fn replay(algorithm: &Algorithm, spectrum: Spectrum, config: &AnalysisConfig) -> TreatResult<Session> {
    let mut session = Session::with_config(spectrum, config.clone());
    session.open_algorithm(algorithm.clone());
    if !algorithm.is_empty() {
        session.run_algorithm(None)?;
    }
    Ok(session)
}

/// Replay `algorithm` on each spectrum in parallel. Results keep the input order.
pub fn replay_batch(
    algorithm: &Algorithm,
    spectra: &[Spectrum],
    config: &AnalysisConfig,
) -> Vec<TreatResult<TreatedSpectrum>> {
    spectra
        .par_iter()
        .enumerate()
        .map(|(i, spectrum)| {
            replay(algorithm, spectrum.clone(), config)
                .map(TreatedSpectrum::from)
                .inspect_err(|e| log::warn!("spectrum {i}: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{DoubletSpec, synthetic_doublet};
    use crate::fit::FitParameters;
    use crate::session::Operation;

    fn fit_algorithm() -> Algorithm {
        let params = FitParameters {
            center_frequency: 5.0,
            linewidth: 0.5,
            window_peak_find: 1.0,
            window_peak_fit: 4.0,
            ..FitParameters::default()
        };
        let mut alg = Algorithm::new("fit", "1.0", "lab", "");
        alg.functions.push(Operation::FitModel(params).to_step().unwrap());
        alg
    }

    #[test]
    fn batch_replay_fits_each_spectrum() {
        let alg = fit_algorithm();
        let spectra: Vec<Spectrum> = [1.0, 2.0, 3.0]
            .iter()
            .map(|amplitude| {
                let spec = DoubletSpec {
                    amplitude: *amplitude,
                    ..DoubletSpec::default()
                };
                synthetic_doublet(&spec, 7).unwrap()
            })
            .collect();

        let out = replay_batch(&alg, &spectra, &AnalysisConfig::default());
        assert_eq!(out.len(), 3);
        for treated in out {
            let fit = treated.unwrap().fit.unwrap();
            assert!((fit.center().0 - 5.0).abs() < 1e-2);
            assert!((fit.linewidth().0 - 0.5).abs() < 1e-2);
        }
    }

    #[test]
    fn a_failing_spectrum_does_not_stop_the_batch() {
        let alg = fit_algorithm();
        let good = synthetic_doublet(&DoubletSpec::default(), 1).unwrap();
        let short = Spectrum::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let out = replay_batch(&alg, &[good, short], &AnalysisConfig::default());
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
    }

    #[test]
    fn empty_algorithm_returns_the_input() {
        let spectrum = Spectrum::from_y(vec![1.0, 3.0, 2.0]).unwrap();
        let session = replay(&Algorithm::default(), spectrum.clone(), &AnalysisConfig::default()).unwrap();
        assert_eq!(session.x(), spectrum.x.as_slice());
        assert_eq!(session.y(), spectrum.y.as_slice());
    }
}
