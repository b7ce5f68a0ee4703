//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - mutated in place by an analysis session
//! - recorded in step checkpoints
//! - handed to storage collaborators as plain attributes

use serde::{Deserialize, Serialize};

use crate::error::{TreatError, TreatResult};

/// Nature of a marked peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointKind {
    Elastic,
    Stokes,
    #[serde(rename = "Anti-Stokes")]
    AntiStokes,
}

impl PointKind {
    pub const ALL: [PointKind; 3] = [PointKind::Elastic, PointKind::Stokes, PointKind::AntiStokes];

    /// Label prefix used in point names (`<Type>_<ordinal>`).
    pub fn label(self) -> &'static str {
        match self {
            PointKind::Elastic => "Elastic",
            PointKind::Stokes => "Stokes",
            PointKind::AntiStokes => "Anti-Stokes",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }
}

/// A marked peak: `(label, position)` where position is an x-value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub label: String,
    pub position: f64,
}

impl Point {
    pub fn new(kind: PointKind, ordinal: usize, position: f64) -> Self {
        Self {
            label: format!("{}_{ordinal}", kind.label()),
            position,
        }
    }

    /// Type parsed from the label prefix.
    pub fn kind(&self) -> Option<PointKind> {
        let (prefix, _) = self.label.rsplit_once('_')?;
        PointKind::from_label(prefix)
    }

    pub fn ordinal(&self) -> Option<usize> {
        let (_, ordinal) = self.label.rsplit_once('_')?;
        ordinal.parse().ok()
    }
}

/// A `[start, end]` interval on the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn new(start: f64, end: f64) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Window of full width `width` centred on `center`.
    pub fn centered(center: f64, width: f64) -> Self {
        Self::new(center - width / 2.0, center + width / 2.0)
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.start && x <= self.end
    }

    /// Clip to `[lo, hi]`. Returns `None` when the window lies fully outside.
    pub fn clamp_to(&self, lo: f64, hi: f64) -> Option<Self> {
        if self.end < lo || self.start > hi {
            return None;
        }
        Some(Self {
            start: self.start.max(lo),
            end: self.end.min(hi),
        })
    }
}

/// An `(x, y)` pair of equal-length sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Spectrum {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> TreatResult<Self> {
        if x.len() != y.len() {
            return Err(TreatError::configuration(format!(
                "x and y must have the same length (got {} and {})",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(TreatError::configuration("Spectrum is empty."));
        }
        Ok(Self { x, y })
    }

    /// Spectrum over the sample index (`x = 0, 1, 2, ...`).
    pub fn from_y(y: Vec<f64>) -> TreatResult<Self> {
        let x = (0..y.len()).map(|i| i as f64).collect();
        Self::new(x, y)
    }

    /// Average several rows of ordinates into one 1-D signal.
    pub fn from_rows(x: Vec<f64>, rows: &[Vec<f64>]) -> TreatResult<Self> {
        let y = crate::signal::average_rows(rows)?;
        Self::new(x, y)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// `(min(x), max(x))`.
    pub fn x_range(&self) -> (f64, f64) {
        x_range(&self.x)
    }
}

pub(crate) fn x_range(x: &[f64]) -> (f64, f64) {
    x.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Line-shape models available to the fit engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "Lorentzian")]
    Lorentzian,
    #[serde(rename = "Lorentzian elastic")]
    LorentzianElastic,
    #[serde(rename = "DHO")]
    Dho,
    #[serde(rename = "DHO elastic")]
    DhoElastic,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Lorentzian,
        ModelKind::LorentzianElastic,
        ModelKind::Dho,
        ModelKind::DhoElastic,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Lorentzian => "Lorentzian",
            ModelKind::LorentzianElastic => "Lorentzian elastic",
            ModelKind::Dho => "DHO",
            ModelKind::DhoElastic => "DHO elastic",
        }
    }

    /// Whether the constant offset is replaced by a linear elastic term.
    pub fn is_elastic(self) -> bool {
        matches!(self, ModelKind::LorentzianElastic | ModelKind::DhoElastic)
    }

    /// The variant of this model carrying the elastic-leakage term.
    pub fn with_elastic(self) -> Self {
        match self {
            ModelKind::Lorentzian | ModelKind::LorentzianElastic => ModelKind::LorentzianElastic,
            ModelKind::Dho | ModelKind::DhoElastic => ModelKind::DhoElastic,
        }
    }

    /// Number of parameters: `[b, a, ν0, γ]` or `[ae, be, a, ν0, γ]`.
    pub fn param_len(self) -> usize {
        if self.is_elastic() { 5 } else { 4 }
    }

    pub fn param_names(self) -> &'static [&'static str] {
        if self.is_elastic() {
            &["elastic_slope", "offset", "amplitude", "center", "linewidth"]
        } else {
            &["offset", "amplitude", "center", "linewidth"]
        }
    }

    /// Initial guess for a peak at `center` with expected `linewidth`.
    pub fn initial_guess(self, center: f64, linewidth: f64) -> Vec<f64> {
        if self.is_elastic() {
            vec![0.0, 0.0, 1.0, center, linewidth]
        } else {
            vec![0.0, 1.0, center, linewidth]
        }
    }
}

/// How the Stokes/anti-Stokes centers are merged into one shift.
///
/// Both rules are in use; `HalfDistance` assumes the doublet is anti-symmetric
/// about zero frequency, `Mean` averages the two fitted centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterCombination {
    /// `(AS_center - S_center) / 2`.
    #[default]
    HalfDistance,
    /// `(S_center + AS_center) / 2`.
    Mean,
}

/// How the x axis is recentered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CenterType {
    /// On the first elastic peak.
    Elastic,
    /// On the midpoint of the first Stokes/anti-Stokes pair.
    Inelastic,
}

/// Fit of a single peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakFit {
    pub popt: Vec<f64>,
    /// 1-sigma uncertainties (square root of the covariance diagonal).
    pub std: Vec<f64>,
    pub sse: f64,
    pub n_points: usize,
    pub iterations: usize,
}

/// Outcome of a fit: parameters in model order plus 1-sigma uncertainties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: ModelKind,
    pub popt: Vec<f64>,
    pub std: Vec<f64>,
    /// Per-peak fits when both Stokes and anti-Stokes peaks were fitted.
    pub stokes: Option<PeakFit>,
    pub anti_stokes: Option<PeakFit>,
    pub center_combination: Option<CenterCombination>,
}

impl FitResult {
    fn param(&self, from_end: usize) -> (f64, f64) {
        let i = self.popt.len() - from_end;
        (self.popt[i], self.std[i])
    }

    /// `(value, sigma)` of the fitted shift.
    pub fn center(&self) -> (f64, f64) {
        self.param(2)
    }

    pub fn linewidth(&self) -> (f64, f64) {
        self.param(1)
    }

    pub fn amplitude(&self) -> (f64, f64) {
        self.param(3)
    }

    pub fn offset(&self) -> (f64, f64) {
        self.param(4)
    }

    pub fn elastic_slope(&self) -> Option<(f64, f64)> {
        self.model.is_elastic().then(|| (self.popt[0], self.std[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_label_round_trips_kind_and_ordinal() {
        let p = Point::new(PointKind::AntiStokes, 2, 41.5);
        assert_eq!(p.label, "Anti-Stokes_2");
        assert_eq!(p.kind(), Some(PointKind::AntiStokes));
        assert_eq!(p.ordinal(), Some(2));
    }

    #[test]
    fn window_clamps_to_range() {
        let w = Window::centered(1.0, 4.0);
        assert_eq!(w.clamp_to(0.0, 10.0), Some(Window::new(0.0, 3.0)));
        assert_eq!(Window::new(20.0, 30.0).clamp_to(0.0, 10.0), None);
    }

    #[test]
    fn spectrum_rejects_mismatched_lengths() {
        let err = Spectrum::new(vec![0.0, 1.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, TreatError::Configuration(_)));
    }

    #[test]
    fn model_names_serialize_like_the_algorithm_files() {
        let s = serde_json::to_string(&ModelKind::DhoElastic).unwrap();
        assert_eq!(s, "\"DHO elastic\"");
        let k: PointKind = serde_json::from_str("\"Anti-Stokes\"").unwrap();
        assert_eq!(k, PointKind::AntiStokes);
    }

    #[test]
    fn elastic_results_expose_slope() {
        let r = FitResult {
            model: ModelKind::LorentzianElastic,
            popt: vec![0.1, 0.0, 1.0, 5.0, 0.5],
            std: vec![0.01, 0.0, 0.02, 0.003, 0.004],
            stokes: None,
            anti_stokes: None,
            center_combination: None,
        };
        assert_eq!(r.center(), (5.0, 0.003));
        assert_eq!(r.linewidth(), (0.5, 0.004));
        assert_eq!(r.elastic_slope(), Some((0.1, 0.01)));
    }
}
