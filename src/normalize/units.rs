//! Magnitude conversion between display units.

use crate::domain::Unit;
use crate::error::ChartError;

/// Rescale `raw` from `source` to `target` using the fixed unit factors.
///
/// The factor is the ratio of magnitudes: millions to billions divides by
/// 1000, thousands to billions by 1e6, billions to millions multiplies by
/// 1000. Converting a unit to itself returns `raw` unchanged.
pub fn normalize_value(raw: f64, source: Unit, target: Unit) -> f64 {
    if source == target {
        return raw;
    }
    raw * (source.factor() / target.factor())
}

/// Reject NaN and infinities coming from the upstream service.
pub fn ensure_finite(value: f64, what: &str) -> Result<f64, ChartError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ChartError::parse(format!("non-finite {what}: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn millions_to_billions_divides_by_1000() {
        let v = normalize_value(27_360.5, Unit::Millions, Unit::Billions);
        assert!((v - 27.3605).abs() < 1e-9, "got {v}");
        let v = normalize_value(25_000.0, Unit::Millions, Unit::Billions);
        assert!((v - 25.0).abs() < 1e-12, "got {v}");
    }

    #[test]
    fn thousands_to_billions_divides_by_a_million() {
        let v = normalize_value(25_000_000.0, Unit::Thousands, Unit::Billions);
        assert!((v - 25.0).abs() < 1e-12, "got {v}");
        let v = normalize_value(25_000.0, Unit::Thousands, Unit::Billions);
        assert!((v - 0.025).abs() < 1e-15, "got {v}");
    }

    #[test]
    fn billions_to_millions_multiplies_by_1000() {
        assert_eq!(normalize_value(27.5, Unit::Billions, Unit::Millions), 27_500.0);
    }

    #[test]
    fn same_unit_is_identity() {
        assert_eq!(normalize_value(1.25, Unit::Billions, Unit::Billions), 1.25);
    }

    #[test]
    fn zero_stays_zero() {
        assert_eq!(normalize_value(0.0, Unit::Units, Unit::Trillions), 0.0);
    }

    #[test]
    fn ensure_finite_rejects_nan() {
        assert!(ensure_finite(f64::NAN, "value").is_err());
        assert!(ensure_finite(f64::INFINITY, "value").is_err());
        assert_eq!(ensure_finite(-3.5, "value").unwrap(), -3.5);
    }

    fn any_unit() -> impl Strategy<Value = Unit> {
        prop_oneof![
            Just(Unit::Units),
            Just(Unit::Thousands),
            Just(Unit::Millions),
            Just(Unit::Billions),
            Just(Unit::Trillions),
        ]
    }

    proptest! {
        #[test]
        fn round_trip_within_tolerance(x in -1e9f64..1e9, a in any_unit(), b in any_unit()) {
            let back = normalize_value(normalize_value(x, a, b), b, a);
            let tol = 1e-9 * x.abs().max(1.0);
            prop_assert!((back - x).abs() <= tol, "x={x} back={back}");
        }
    }
}
