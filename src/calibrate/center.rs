//! Recentering of the x axis on marked peaks.

use crate::domain::{CenterType, Point, PointKind};
use crate::error::{TreatError, TreatResult};

fn first(points: &[Point], kind: PointKind) -> Option<f64> {
    points
        .iter()
        .find(|p| p.kind() == Some(kind) && p.ordinal() == Some(0))
        .map(|p| p.position)
}

/// Abscissa that becomes zero after recentering.
pub fn center_of(points: &[Point], center_type: CenterType) -> TreatResult<f64> {
    match center_type {
        CenterType::Elastic => first(points, PointKind::Elastic)
            .ok_or_else(|| TreatError::configuration("There is no elastic peak to center the axis on.")),
        CenterType::Inelastic => {
            match (first(points, PointKind::Stokes), first(points, PointKind::AntiStokes)) {
                (Some(s), Some(a)) => Ok(s / 2.0 + a / 2.0),
                _ => Err(TreatError::configuration(
                    "A Stokes and an anti-Stokes peak are needed to center the axis.",
                )),
            }
        }
    }
}

/// `x - center`.
pub fn center_x_axis(x: &[f64], points: &[Point], center_type: CenterType) -> TreatResult<Vec<f64>> {
    let center = center_of(points, center_type)?;
    Ok(x.iter().map(|v| v - center).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elastic_centering_uses_the_first_elastic_peak() {
        let points = vec![
            Point::new(PointKind::Elastic, 0, 12.0),
            Point::new(PointKind::Elastic, 1, 40.0),
        ];
        let x = center_x_axis(&[10.0, 12.0, 14.0], &points, CenterType::Elastic).unwrap();
        assert_eq!(x, vec![-2.0, 0.0, 2.0]);
    }

    #[test]
    fn inelastic_centering_uses_the_doublet_midpoint() {
        let points = vec![
            Point::new(PointKind::Stokes, 0, 4.0),
            Point::new(PointKind::AntiStokes, 0, 10.0),
        ];
        assert_eq!(center_of(&points, CenterType::Inelastic).unwrap(), 7.0);
        assert!(center_of(&points, CenterType::Elastic).is_err());
    }
}
