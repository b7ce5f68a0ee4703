//! Fit of a single peak.
//!
//! Given a calibrated axis, the (possibly normalized) signal and a refined
//! center, we:
//! - window the samples with `|ν - center| < window / 2`
//! - check the window against the parameter count and the response length
//! - run Levenberg–Marquardt from `ModelKind::initial_guess`

use crate::domain::{ModelKind, PeakFit};
use crate::error::{TreatError, TreatResult};
use crate::math::{LmOptions, levenberg_marquardt};
use crate::models::evaluate;

/// Inputs shared by every peak of one fit.
#[derive(Debug, Clone, Copy)]
pub struct PeakFitInput<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub model: ModelKind,
    pub linewidth: f64,
    pub window: f64,
    pub response: Option<&'a [f64]>,
    pub solver: &'a LmOptions,
}

/// Samples of `(x, y)` with `|x - center| < width / 2`.
pub fn fit_window(x: &[f64], y: &[f64], center: f64, width: f64) -> (Vec<f64>, Vec<f64>) {
    let half = width / 2.0;
    x.iter()
        .zip(y)
        .filter(|(xi, _)| (**xi - center).abs() < half)
        .map(|(xi, yi)| (*xi, *yi))
        .unzip()
}

pub fn fit_peak(input: &PeakFitInput<'_>, center: f64) -> TreatResult<PeakFit> {
    let (wx, wy) = fit_window(input.x, input.y, center, input.window);
    let n_params = input.model.param_len();

    if let Some(r) = input.response {
        if r.len() > wx.len() {
            return Err(TreatError::incompatible_response(format!(
                "the response ({} samples) is larger than the fit window ({} samples); \
                 increase the fit window or shrink the response window",
                r.len(),
                wx.len()
            )));
        }
    }
    if wx.len() <= n_params {
        return Err(TreatError::insufficient_window(format!(
            "{} samples around {center:.4} cannot constrain the {} parameters of a {} model",
            wx.len(),
            n_params,
            input.model.display_name()
        )));
    }

    let p0 = input.model.initial_guess(center, input.linewidth);
    let model = input.model;
    let response = input.response;
    let report = levenberg_marquardt(|p| evaluate(model, &wx, p, response), &wy, &p0, input.solver)?;

    Ok(PeakFit {
        std: report.std(),
        popt: report.params,
        sse: report.sse,
        n_points: wx.len(),
        iterations: report.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lorentzian;
    use crate::signal::linspace;

    #[test]
    fn recovers_a_noiseless_lorentzian() {
        let x = linspace(0.0, 10.0, 201);
        let y = lorentzian(&x, &[0.2, 3.0, 5.3, 0.8]);
        let solver = LmOptions::default();
        let input = PeakFitInput {
            x: &x,
            y: &y,
            model: ModelKind::Lorentzian,
            linewidth: 1.0,
            window: 4.0,
            response: None,
            solver: &solver,
        };
        let fit = fit_peak(&input, 5.2).unwrap();
        assert!((fit.popt[2] - 5.3).abs() < 5.3e-3);
        assert!((fit.popt[3] - 0.8).abs() < 0.8e-3);
        assert!(fit.n_points >= 79);
    }

    #[test]
    fn window_must_hold_more_samples_than_parameters() {
        let x = linspace(-5.0, 5.0, 11);
        let y = lorentzian(&x, &[0.0, 1.0, 0.0, 2.0]);
        let solver = LmOptions::default();
        let input = PeakFitInput {
            x: &x,
            y: &y,
            model: ModelKind::Lorentzian,
            linewidth: 2.0,
            window: 3.0,
            response: None,
            solver: &solver,
        };
        assert!(matches!(fit_peak(&input, 0.0), Err(TreatError::InsufficientWindow(_))));
    }

    #[test]
    fn response_longer_than_window_is_incompatible() {
        let x = linspace(-5.0, 5.0, 11);
        let y = lorentzian(&x, &[0.0, 1.0, 0.0, 2.0]);
        let solver = LmOptions::default();
        let response = vec![0.5; 8];
        let input = PeakFitInput {
            x: &x,
            y: &y,
            model: ModelKind::Lorentzian,
            linewidth: 2.0,
            window: 6.0,
            response: Some(&response),
            solver: &solver,
        };
        assert!(matches!(fit_peak(&input, 0.0), Err(TreatError::IncompatibleResponse(_))));
    }
}
