//! Synthetic Brillouin spectra.
//!
//! Two generators, both deterministic for a given seed:
//!
//! - a single Stokes/anti-Stokes doublet on a calibrated frequency axis
//! - a multi-order VIPA spectrum on a pixel axis, where the frequency of each
//!   pixel follows a known quadratic `f(p) = a p² + b p + c`
//!
//! The VIPA generator also reports the exact pixel position of every peak so
//! calibration can be checked against ground truth.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{PointKind, Spectrum};
use crate::error::{TreatError, TreatResult};
use crate::models::lorentzian;
use crate::signal::linspace;

/// A Lorentzian doublet at `±shift` on an evenly spaced frequency axis.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubletSpec {
    pub shift: f64,
    pub linewidth: f64,
    pub amplitude: f64,
    pub offset: f64,
    /// Standard deviation of additive gaussian noise.
    pub noise: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub n_points: usize,
}

impl Default for DoubletSpec {
    fn default() -> Self {
        Self {
            shift: 5.0,
            linewidth: 0.5,
            amplitude: 1.0,
            offset: 0.0,
            noise: 0.0,
            x_min: -10.0,
            x_max: 10.0,
            n_points: 1001,
        }
    }
}

pub fn synthetic_doublet(spec: &DoubletSpec, seed: u64) -> TreatResult<Spectrum> {
    if spec.n_points < 3 || !(spec.x_max > spec.x_min) {
        return Err(TreatError::configuration("Invalid axis for a synthetic doublet."));
    }
    let x = linspace(spec.x_min, spec.x_max, spec.n_points);
    let stokes = lorentzian(&x, &[0.0, spec.amplitude, -spec.shift, spec.linewidth]);
    let anti_stokes = lorentzian(&x, &[0.0, spec.amplitude, spec.shift, spec.linewidth]);
    let mut y: Vec<f64> = stokes
        .iter()
        .zip(&anti_stokes)
        .map(|(s, a)| spec.offset + s + a)
        .collect();
    add_noise(&mut y, spec.noise, seed)?;
    Spectrum::new(x, y)
}

/// A VIPA acquisition: several diffraction orders of an elastic line and its
/// Brillouin doublet, seen through a quadratic dispersion and a gaussian
/// envelope centred on the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct VipaSpec {
    pub n_pixels: usize,
    /// Frequency seen by the first and last pixel.
    pub nu_first: f64,
    pub nu_last: f64,
    /// Linear dispersion term of the pixel→frequency map.
    pub dispersion: f64,
    pub fsr: f64,
    pub shift: f64,
    pub linewidth: f64,
    pub amplitude: f64,
    pub elastic_amplitude: f64,
    pub elastic_linewidth: f64,
    /// Width (in pixels) of the gaussian envelope.
    pub envelope_sigma: f64,
    pub noise: f64,
}

impl Default for VipaSpec {
    fn default() -> Self {
        Self {
            n_pixels: 1000,
            nu_first: -62.0,
            nu_last: 62.0,
            dispersion: 5e-2,
            fsr: 30.0,
            shift: 5.0,
            linewidth: 1.0,
            amplitude: 1.0,
            elastic_amplitude: 0.5,
            elastic_linewidth: 0.3,
            envelope_sigma: 300.0,
            noise: 1e-2,
        }
    }
}

/// A peak of the synthetic VIPA spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruePeak {
    pub kind: PointKind,
    /// Diffraction order `k` of the elastic line at `k·FSR`.
    pub order: i64,
    pub frequency: f64,
    /// Exact (fractional) pixel position.
    pub pixel: f64,
}

#[derive(Debug, Clone)]
pub struct VipaSample {
    /// Signal on the pixel axis.
    pub spectrum: Spectrum,
    /// True frequency of every pixel.
    pub frequency: Vec<f64>,
    /// `(a, b, c)` of the true map `f(p) = a p² + b p + c`.
    pub map: (f64, f64, f64),
    /// Peaks inside the detector, sorted by pixel.
    pub peaks: Vec<TruePeak>,
}

impl VipaSample {
    /// Exact pixel positions of the peaks of one kind, sorted.
    pub fn pixels(&self, kind: PointKind) -> Vec<f64> {
        self.peaks
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.pixel)
            .collect()
    }
}

pub fn synthetic_vipa(spec: &VipaSpec, seed: u64) -> TreatResult<VipaSample> {
    let n = spec.n_pixels;
    if n < 3 {
        return Err(TreatError::configuration("A VIPA sample needs at least 3 pixels."));
    }
    if !(spec.fsr > 0.0 && spec.nu_last > spec.nu_first) {
        return Err(TreatError::configuration("Invalid frequency range or FSR."));
    }

    let nf = n as f64;
    let c = spec.nu_first;
    let b = spec.dispersion;
    let a = (spec.nu_last - b * nf - spec.nu_first) / (nf * nf);
    let pixel: Vec<f64> = (0..n).map(|p| p as f64).collect();
    let frequency: Vec<f64> = pixel.iter().map(|p| (a * p + b) * p + c).collect();
    if frequency.windows(2).any(|w| w[1] <= w[0]) {
        return Err(TreatError::configuration(
            "The pixel to frequency map is not monotonic over the detector.",
        ));
    }

    let (f_lo, f_hi) = (frequency[0], frequency[n - 1]);
    let k0 = (f_lo / spec.fsr).floor() as i64;
    let kf = (f_hi / spec.fsr).ceil() as i64;

    let mut y = vec![0.0; n];
    let mut peaks = Vec::new();
    for k in k0..=kf {
        let nu_e = k as f64 * spec.fsr;
        let lines = [
            (PointKind::Stokes, nu_e - spec.shift, spec.amplitude, spec.linewidth),
            (PointKind::Elastic, nu_e, spec.elastic_amplitude, spec.elastic_linewidth),
            (PointKind::AntiStokes, nu_e + spec.shift, spec.amplitude, spec.linewidth),
        ];
        for (kind, nu, amp, width) in lines {
            let line = lorentzian(&frequency, &[0.0, amp, nu, width]);
            y.iter_mut().zip(&line).for_each(|(acc, v)| *acc += v);
            if let Some(p) = pixel_of(a, b, c, nu).filter(|p| *p >= 0.0 && *p <= nf - 1.0) {
                peaks.push(TruePeak {
                    kind,
                    order: k,
                    frequency: nu,
                    pixel: p,
                });
            }
        }
    }
    peaks.sort_by(|l, r| l.pixel.total_cmp(&r.pixel));

    let half = (n / 2) as f64;
    for (i, v) in y.iter_mut().enumerate() {
        let d = i as f64 - half;
        *v *= (-(d * d) / (spec.envelope_sigma * spec.envelope_sigma)).exp();
    }
    add_noise(&mut y, spec.noise, seed)?;

    Ok(VipaSample {
        spectrum: Spectrum::new(pixel, y)?,
        frequency,
        map: (a, b, c),
        peaks,
    })
}

/// Inverse of `f(p) = a p² + b p + c` on the increasing branch.
fn pixel_of(a: f64, b: f64, c: f64, nu: f64) -> Option<f64> {
    if a == 0.0 {
        return (b != 0.0).then(|| (nu - c) / b);
    }
    let disc = b * b - 4.0 * a * (c - nu);
    if disc < 0.0 {
        return None;
    }
    Some((-b + disc.sqrt()) / (2.0 * a))
}

fn add_noise(y: &mut [f64], sigma: f64, seed: u64) -> TreatResult<()> {
    if sigma == 0.0 {
        return Ok(());
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma)
        .map_err(|e| TreatError::configuration(format!("Noise distribution error: {e}")))?;
    for v in y.iter_mut() {
        *v += normal.sample(&mut rng);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doublet_is_deterministic_for_a_seed() {
        let spec = DoubletSpec {
            noise: 0.05,
            ..DoubletSpec::default()
        };
        let a = synthetic_doublet(&spec, 7).unwrap();
        let b = synthetic_doublet(&spec, 7).unwrap();
        let c = synthetic_doublet(&spec, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.y, c.y);
    }

    #[test]
    fn noiseless_doublet_peaks_at_the_shift() {
        let s = synthetic_doublet(&DoubletSpec::default(), 0).unwrap();
        // x = -10 + 0.02 i, so ±5 sit on samples 250 and 750.
        assert!((s.y[250] - s.y[750]).abs() < 1e-12);
        assert!(s.y[250] > s.y[249] && s.y[250] > s.y[251]);
    }

    #[test]
    fn vipa_peaks_sit_on_their_true_frequencies() {
        let sample = synthetic_vipa(&VipaSpec::default(), 1).unwrap();
        let (a, b, c) = sample.map;
        assert!((sample.frequency[0] - (-62.0)).abs() < 1e-12);
        for peak in &sample.peaks {
            let f = (a * peak.pixel + b) * peak.pixel + c;
            assert!((f - peak.frequency).abs() < 1e-9);
        }
        // Orders -2..=2 fall on the detector: elastic lines at -60, -30, 0, 30, 60.
        let elastic = sample.pixels(PointKind::Elastic);
        assert_eq!(elastic.len(), 5);
        assert!(elastic.windows(2).all(|w| w[0] < w[1]));
    }
}
