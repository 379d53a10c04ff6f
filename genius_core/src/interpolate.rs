//! Piecewise-linear lookup into a progress map.

use crate::error::GeniusError;
use crate::map::ProgressPoint;

/// Interpolate the point at position `x`.
///
/// - `x` below the first or above the last position (or NaN) is `OutOfRange`.
/// - `x` equal to any knot returns that knot unchanged.
/// - Otherwise both fields are blended linearly between the bracketing knots.
///
/// Positions must strictly increase; a bracketing pair that does not is
/// reported as `MalformedMap` instead of dividing by zero.
pub fn interpolate(points: &[ProgressPoint], x: f64) -> Result<ProgressPoint, GeniusError> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(GeniusError::MalformedMap("cannot interpolate an empty map".into()));
    };
    if x.is_nan() || x < first.position || x > last.position {
        return Err(GeniusError::OutOfRange {
            x,
            min: first.position,
            max: last.position,
        });
    }
    if x == first.position {
        return Ok(*first);
    }
    if x == last.position {
        return Ok(*last);
    }

    // First knot at or beyond x; x > first.position so right >= 1.
    let right = points.partition_point(|p| p.position < x);
    let hi = points[right];
    if hi.position == x {
        return Ok(hi);
    }
    let lo = points[right - 1];
    let span = hi.position - lo.position;
    if !(span > 0.0) {
        return Err(GeniusError::MalformedMap(format!(
            "positions do not increase at index {} ({} -> {})",
            right - 1,
            lo.position,
            hi.position
        )));
    }
    let ratio = (x - lo.position) / span;
    Ok(ProgressPoint {
        position: lo.position * (1.0 - ratio) + hi.position * ratio,
        value: lo.value * (1.0 - ratio) + hi.value * ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn map() -> Vec<ProgressPoint> {
        vec![
            ProgressPoint::new(0.0, 100.0),
            ProgressPoint::new(0.5, 50.0),
            ProgressPoint::new(1.0, 0.0),
        ]
    }

    #[rstest]
    #[case(0.0, 100.0)]
    #[case(0.25, 75.0)]
    #[case(0.5, 50.0)]
    #[case(0.9, 10.0)]
    #[case(1.0, 0.0)]
    fn table(#[case] x: f64, #[case] expected: f64) {
        let p = interpolate(&map(), x).unwrap();
        assert!((p.value - expected).abs() < 1e-9, "x={x} got {}", p.value);
        assert!((p.position - x).abs() < 1e-12);
    }

    #[rstest]
    #[case(-0.01)]
    #[case(1.01)]
    #[case(f64::NAN)]
    fn out_of_range(#[case] x: f64) {
        let err = interpolate(&map(), x).unwrap_err();
        assert!(matches!(err, GeniusError::OutOfRange { .. }));
    }

    #[test]
    fn interior_knot_is_returned_verbatim() {
        let pts = vec![
            ProgressPoint::new(0.0, 90.0),
            ProgressPoint::new(0.3, 61.7),
            ProgressPoint::new(1.0, 0.0),
        ];
        assert_eq!(interpolate(&pts, 0.3).unwrap(), pts[1]);
    }

    #[test]
    fn empty_map_is_malformed() {
        assert!(matches!(
            interpolate(&[], 0.5),
            Err(GeniusError::MalformedMap(_))
        ));
    }

    #[test]
    fn nan_knot_is_malformed() {
        let pts = vec![
            ProgressPoint::new(0.0, 10.0),
            ProgressPoint::new(f64::NAN, 5.0),
            ProgressPoint::new(1.0, 0.0),
        ];
        assert!(matches!(
            interpolate(&pts, 0.5),
            Err(GeniusError::MalformedMap(_))
        ));
    }

    #[test]
    fn single_point_map() {
        let pts = vec![ProgressPoint::new(0.5, 3.0)];
        assert_eq!(interpolate(&pts, 0.5).unwrap().value, 3.0);
        assert!(interpolate(&pts, 0.6).is_err());
    }
}
