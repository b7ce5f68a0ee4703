//! Line-shape fit of a calibrated spectrum.
//!
//! The engine walks one spectrum through:
//!
//! ```text
//! Idle -> Windowed -> Fitted -> Done
//!    \________\_________\-----> Failed
//! ```
//!
//! 1. resample when the axis is not evenly spaced
//! 2. extract the instrument response (optional)
//! 3. refine the peak position(s) in `window_peak_find`
//! 4. normalize (optional)
//! 5. fit each peak in `window_peak_fit`
//! 6. for symmetric fits, merge the Stokes and anti-Stokes results
//!
//! Every stage appends a sentence to `treat_steps` so callers can report what
//! was done to the data.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::domain::{CenterCombination, FitResult, ModelKind, PeakFit};
use crate::error::{TreatError, TreatResult};
use crate::fit::fitter::{PeakFitInput, fit_peak};
use crate::fit::normalize::normalize;
use crate::signal::{ResponseSource, extract_response, is_uniform, localize_peak, nearest_index, resample};

/// Parameters of `fit_model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitParameters {
    /// Expected shift; the sign is ignored for symmetric fits.
    pub center_frequency: f64,
    /// Initial guess for the linewidth.
    pub linewidth: f64,
    pub normalize: bool,
    pub model: ModelKind,
    /// Fit the Stokes and anti-Stokes peaks and merge them.
    pub symmetric: bool,
    /// Full width of the window used to refine the peak position.
    pub window_peak_find: f64,
    /// Full width of the window used by the fit.
    pub window_peak_fit: f64,
    /// Use the elastic variant of `model`.
    pub correct_elastic: bool,
    pub response: Option<ResponseSource>,
    pub center_combination: CenterCombination,
}

impl Default for FitParameters {
    fn default() -> Self {
        Self {
            center_frequency: 0.0,
            linewidth: 0.0,
            normalize: true,
            model: ModelKind::Lorentzian,
            symmetric: true,
            window_peak_find: 1.0,
            window_peak_fit: 3.0,
            correct_elastic: false,
            response: None,
            center_combination: CenterCombination::HalfDistance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitStage {
    #[default]
    Idle,
    /// Peaks localized and fit windows chosen.
    Windowed,
    /// Solver finished for every peak.
    Fitted,
    Done,
    Failed,
}

/// Runs fits and keeps a log of the treatment applied to the data.
#[derive(Debug, Clone, Default)]
pub struct FitEngine {
    stage: FitStage,
    treat_steps: Vec<String>,
}

#[derive(Clone, Copy)]
enum Peaks {
    Single(f64),
    Pair { stokes: f64, anti_stokes: f64 },
}

impl FitEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> FitStage {
        self.stage
    }

    /// Treatment applied during the last run, in order.
    pub fn treat_steps(&self) -> &[String] {
        &self.treat_steps
    }

    pub fn run(&mut self, x: &[f64], y: &[f64], params: &FitParameters, config: &AnalysisConfig) -> TreatResult<FitResult> {
        self.stage = FitStage::Idle;
        self.treat_steps.clear();
        let out = self.run_stages(x, y, params, config);
        match &out {
            Ok(_) => self.stage = FitStage::Done,
            Err(e) => {
                log::debug!("fit failed in stage {:?}: {e}", self.stage);
                self.stage = FitStage::Failed;
            }
        }
        out
    }

    fn run_stages(&mut self, x: &[f64], y: &[f64], params: &FitParameters, config: &AnalysisConfig) -> TreatResult<FitResult> {
        if x.len() != y.len() {
            return Err(TreatError::configuration(format!(
                "x and y must have the same length (got {} and {})",
                x.len(),
                y.len()
            )));
        }

        let (x, mut y) = if is_uniform(x) {
            (x.to_vec(), y.to_vec())
        } else {
            self.treat_steps
                .push("Resample the signal to a constant frequency step".to_string());
            resample(x, y, None)?
        };

        let response = extract_response(&x, &y, params.response.as_ref())?;
        self.treat_steps.push(match &params.response {
            None => "No convolution by the impulse response in the fitting function".to_string(),
            Some(ResponseSource::Window { .. }) => {
                "Add convolution by the impulse response based on windowing on the signal".to_string()
            }
            Some(ResponseSource::External { .. }) => {
                "Add convolution by the impulse response based on the given reference".to_string()
            }
        });

        let peaks = if params.symmetric {
            let c = params.center_frequency.abs();
            let stokes = localize_peak(&x, &y, -c, params.window_peak_find)?;
            let anti_stokes = localize_peak(&x, &y, c, params.window_peak_find)?;
            self.treat_steps.push(format!(
                "Windowing of Stokes and anti-Stokes peaks around {stokes:.2}GHz and {anti_stokes:.2}GHz respectively"
            ));
            Peaks::Pair { stokes, anti_stokes }
        } else {
            let c = localize_peak(&x, &y, params.center_frequency, params.window_peak_find)?;
            self.treat_steps
                .push(format!("Windowing of a single peak around {c:.2}GHz"));
            Peaks::Single(c)
        };
        self.stage = FitStage::Windowed;

        if params.normalize {
            let reference = match peaks {
                Peaks::Single(c) => c,
                Peaks::Pair { stokes, .. } => stokes,
            };
            let ascending = x.windows(2).all(|w| w[0] <= w[1]);
            let pos = nearest_index(&x, reference, ascending);
            y = normalize(&y, pos, config.offset_points, config.peak_points)?;
            self.treat_steps
                .push("Normalizing the data based on the given peak's amplitude".to_string());
        }

        let model = if params.correct_elastic {
            params.model.with_elastic()
        } else {
            params.model
        };
        self.treat_steps.push(if model.is_elastic() {
            format!("Fitting with a {} model taking into account the elastic peak", model.display_name())
        } else {
            format!("Fitting with a {} model", model.display_name())
        });

        let input = PeakFitInput {
            x: &x,
            y: &y,
            model,
            linewidth: params.linewidth,
            window: params.window_peak_fit,
            response: response.as_deref(),
            solver: &config.solver,
        };

        let result = match peaks {
            Peaks::Single(c) => {
                let fit = fit_peak(&input, c)?;
                self.stage = FitStage::Fitted;
                FitResult {
                    model,
                    popt: fit.popt,
                    std: fit.std,
                    stokes: None,
                    anti_stokes: None,
                    center_combination: None,
                }
            }
            Peaks::Pair { stokes, anti_stokes } => {
                let fit_s = fit_peak(&input, stokes)?;
                let fit_as = fit_peak(&input, anti_stokes)?;
                self.stage = FitStage::Fitted;
                self.treat_steps.push(
                    "Combining the Stokes and anti-Stokes fits, uncertainties added in quadrature".to_string(),
                );
                combine(model, fit_s, fit_as, params.center_combination)
            }
        };

        log::debug!(
            "fitted {} (center={:.5}, linewidth={:.5})",
            model.display_name(),
            result.center().0,
            result.linewidth().0
        );
        Ok(result)
    }
}

/// Average two peak fits elementwise; the center follows `rule`.
pub fn combine(model: ModelKind, stokes: PeakFit, anti_stokes: PeakFit, rule: CenterCombination) -> FitResult {
    let mut popt: Vec<f64> = stokes
        .popt
        .iter()
        .zip(&anti_stokes.popt)
        .map(|(s, a)| 0.5 * (s + a))
        .collect();
    let std: Vec<f64> = stokes
        .std
        .iter()
        .zip(&anti_stokes.std)
        .map(|(s, a)| s.hypot(*a))
        .collect();
    let ic = popt.len() - 2;
    popt[ic] = match rule {
        CenterCombination::HalfDistance => 0.5 * (anti_stokes.popt[ic] - stokes.popt[ic]),
        CenterCombination::Mean => 0.5 * (stokes.popt[ic] + anti_stokes.popt[ic]),
    };
    FitResult {
        model,
        popt,
        std,
        stokes: Some(stokes),
        anti_stokes: Some(anti_stokes),
        center_combination: Some(rule),
    }
}
