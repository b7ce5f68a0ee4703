//! Line-shape evaluation for Lorentzian / DHO models and their elastic variants.
//!
//! Parameter layouts:
//! - `[b, a, ν0, γ]` for the base shapes
//! - `[ae, be, a, ν0, γ]` for the elastic variants, where `be + ae·ν` models
//!   leakage of the neighbouring elastic peak
//!
//! An optional instrument response is applied by discrete convolution with the
//! output kept at the length of the evaluated axis ("same" mode).

use crate::domain::ModelKind;

/// Evaluates a line shape on `nu` for the given parameters.
pub type LineShape = fn(&[f64], &[f64]) -> Vec<f64>;

static LINE_SHAPES: [(ModelKind, LineShape); 4] = [
    (ModelKind::Lorentzian, lorentzian),
    (ModelKind::LorentzianElastic, lorentzian_elastic),
    (ModelKind::Dho, dho),
    (ModelKind::DhoElastic, dho_elastic),
];

impl ModelKind {
    pub fn line_shape(self) -> LineShape {
        LINE_SHAPES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, f)| *f)
            .unwrap_or(lorentzian)
    }
}

fn lorentzian_term(nu: f64, a: f64, nu0: f64, gamma: f64) -> f64 {
    let hw2 = (gamma / 2.0).powi(2);
    a * hw2 / ((nu - nu0).powi(2) + hw2)
}

fn dho_term(nu: f64, a: f64, nu0: f64, gamma: f64) -> f64 {
    let g = gamma * nu0 * nu0;
    a * g / ((nu * nu - nu0 * nu0).powi(2) + g)
}

/// `b + a (γ/2)² / ((ν - ν0)² + (γ/2)²)`.
pub fn lorentzian(nu: &[f64], p: &[f64]) -> Vec<f64> {
    let [b, a, nu0, gamma] = [p[0], p[1], p[2], p[3]];
    nu.iter().map(|&v| b + lorentzian_term(v, a, nu0, gamma)).collect()
}

pub fn lorentzian_elastic(nu: &[f64], p: &[f64]) -> Vec<f64> {
    let [ae, be, a, nu0, gamma] = [p[0], p[1], p[2], p[3], p[4]];
    nu.iter()
        .map(|&v| be + ae * v + lorentzian_term(v, a, nu0, gamma))
        .collect()
}

/// Damped harmonic oscillator: `b + a γν0² / ((ν² - ν0²)² + γν0²)`.
pub fn dho(nu: &[f64], p: &[f64]) -> Vec<f64> {
    let [b, a, nu0, gamma] = [p[0], p[1], p[2], p[3]];
    nu.iter().map(|&v| b + dho_term(v, a, nu0, gamma)).collect()
}

pub fn dho_elastic(nu: &[f64], p: &[f64]) -> Vec<f64> {
    let [ae, be, a, nu0, gamma] = [p[0], p[1], p[2], p[3], p[4]];
    nu.iter()
        .map(|&v| be + ae * v + dho_term(v, a, nu0, gamma))
        .collect()
}

/// Evaluate `model` on `nu`, convolved with `response` when given.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_len()`.
pub fn evaluate(model: ModelKind, nu: &[f64], params: &[f64], response: Option<&[f64]>) -> Vec<f64> {
    let shape = (model.line_shape())(nu, params);
    match response {
        Some(r) if !r.is_empty() => convolve_same(&shape, r),
        _ => shape,
    }
}

/// Discrete convolution keeping the central `max(len)` samples of the full result.
pub fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let (n, m) = (signal.len(), kernel.len());
    if n == 0 || m == 0 {
        return Vec::new();
    }
    let full_len = n + m - 1;
    let start = (n.min(m) - 1) / 2;
    let out_len = n.max(m);
    (start..start + out_len)
        .take_while(|&k| k < full_len)
        .map(|k| {
            let i_lo = k.saturating_sub(m - 1);
            let i_hi = k.min(n - 1);
            (i_lo..=i_hi).map(|i| signal[i] * kernel[k - i]).sum()
        })
        .collect()
}
