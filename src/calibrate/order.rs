//! Assignment of inelastic peaks to diffraction orders.
//!
//! Elastic peaks define the orders: sorted by position, the `k`-th elastic peak
//! is order `k`. Every Stokes and anti-Stokes peak belongs to the order of its
//! nearest elastic peak.

use crate::domain::{Point, PointKind};
use crate::error::{TreatError, TreatResult};

/// Peak positions split by kind and sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakSet {
    pub elastic: Vec<f64>,
    pub stokes: Vec<f64>,
    pub anti_stokes: Vec<f64>,
}

impl PeakSet {
    pub fn from_points(points: &[Point]) -> Self {
        let mut set = Self::default();
        for p in points {
            match p.kind() {
                Some(PointKind::Elastic) => set.elastic.push(p.position),
                Some(PointKind::Stokes) => set.stokes.push(p.position),
                Some(PointKind::AntiStokes) => set.anti_stokes.push(p.position),
                None => log::warn!("ignoring point with unknown label '{}'", p.label),
            }
        }
        for v in [&mut set.elastic, &mut set.stokes, &mut set.anti_stokes] {
            v.sort_by(f64::total_cmp);
        }
        set
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.elastic.len(), self.stokes.len(), self.anti_stokes.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedPeak {
    pub position: f64,
    pub order: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedOrders {
    pub elastic: Vec<f64>,
    pub stokes: Vec<OrderedPeak>,
    pub anti_stokes: Vec<OrderedPeak>,
}

impl MatchedOrders {
    /// Orders holding both a Stokes and an anti-Stokes peak, ascending, as
    /// `(order, stokes, anti_stokes)`.
    pub fn doublets(&self) -> Vec<(usize, f64, f64)> {
        self.stokes
            .iter()
            .filter_map(|s| {
                self.anti_stokes
                    .iter()
                    .find(|a| a.order == s.order)
                    .map(|a| (s.order, s.position, a.position))
            })
            .collect()
    }
}

pub fn match_orders(peaks: &PeakSet) -> TreatResult<MatchedOrders> {
    let elastic = peaks.elastic.clone();
    let has_inelastic = !peaks.stokes.is_empty() || !peaks.anti_stokes.is_empty();
    if elastic.is_empty() && has_inelastic {
        return Err(TreatError::ambiguous_order(
            "inelastic peaks cannot be assigned to an order without elastic peaks",
        ));
    }
    Ok(MatchedOrders {
        stokes: assign(&peaks.stokes, &elastic, "Stokes")?,
        anti_stokes: assign(&peaks.anti_stokes, &elastic, "Anti-Stokes")?,
        elastic,
    })
}

fn assign(positions: &[f64], elastic: &[f64], kind: &str) -> TreatResult<Vec<OrderedPeak>> {
    let mut out = Vec::with_capacity(positions.len());
    for &p in positions {
        let mut best = 0;
        let mut tie = false;
        for (i, e) in elastic.iter().enumerate().skip(1) {
            let d = (p - e).abs();
            let d_best = (p - elastic[best]).abs();
            if d < d_best {
                best = i;
                tie = false;
            } else if d == d_best {
                tie = true;
            }
        }
        if tie {
            return Err(TreatError::ambiguous_order(format!(
                "{kind} peak at {p} is equidistant from two elastic peaks"
            )));
        }
        out.push(OrderedPeak { position: p, order: best });
    }

    // A trailing duplicate usually is a spurious detection at the edge of the detector.
    if out.len() > 2 && out[out.len() - 1].order == out[out.len() - 2].order {
        if let Some(dropped) = out.pop() {
            log::warn!(
                "dropping {kind} peak at {} sharing order {} with its neighbour",
                dropped.position,
                dropped.order
            );
        }
    }

    if let Some(w) = out.windows(2).find(|w| w[0].order == w[1].order) {
        return Err(TreatError::ambiguous_order(format!(
            "{kind} peaks at {} and {} both belong to order {}",
            w[0].position, w[1].position, w[0].order
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(e: &[f64], s: &[f64], a: &[f64]) -> PeakSet {
        PeakSet {
            elastic: e.to_vec(),
            stokes: s.to_vec(),
            anti_stokes: a.to_vec(),
        }
    }

    #[test]
    fn points_are_split_and_sorted() {
        let points = vec![
            Point::new(PointKind::Elastic, 0, 400.0),
            Point::new(PointKind::Stokes, 0, 600.0),
            Point::new(PointKind::Elastic, 1, 100.0),
            Point::new(PointKind::AntiStokes, 0, 450.0),
        ];
        let s = PeakSet::from_points(&points);
        assert_eq!(s.elastic, vec![100.0, 400.0]);
        assert_eq!(s.counts(), (2, 1, 1));
    }

    #[test]
    fn peaks_take_the_order_of_the_nearest_elastic_peak() {
        let m = match_orders(&set(&[100.0, 400.0, 650.0], &[80.0, 370.0, 630.0], &[125.0, 430.0])).unwrap();
        let orders: Vec<usize> = m.stokes.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(m.doublets(), vec![(0, 80.0, 125.0), (1, 370.0, 430.0)]);
    }

    #[test]
    fn trailing_duplicate_is_dropped() {
        let m = match_orders(&set(&[100.0, 400.0], &[], &[120.0, 420.0, 480.0])).unwrap();
        assert_eq!(m.anti_stokes.len(), 2);
        assert_eq!(m.anti_stokes[1].position, 420.0);
    }

    #[test]
    fn ambiguous_assignments_fail() {
        let tie = match_orders(&set(&[100.0, 200.0], &[150.0], &[])).unwrap_err();
        assert!(matches!(tie, TreatError::AmbiguousOrder(_)));
        let no_elastic = match_orders(&set(&[], &[10.0], &[])).unwrap_err();
        assert!(matches!(no_elastic, TreatError::AmbiguousOrder(_)));
        let duplicate = match_orders(&set(&[100.0, 400.0], &[90.0, 95.0], &[])).unwrap_err();
        assert!(matches!(duplicate, TreatError::AmbiguousOrder(_)));
    }
}
