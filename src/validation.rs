//! Range guards for test parameters.
//!
//! Every numeric parameter of a test run has an inclusive valid range. The
//! helpers here turn a violated range into a `DaqError::ParameterOutOfRange`
//! naming the parameter and the bound that was crossed.

use crate::error::{AppResult, Bound, DaqError};
use std::ops::RangeInclusive;

/// Valid chamber temperatures in °C.
pub const TEMPERATURE_RANGE_C: RangeInclusive<f64> = 0.0..=60.0;
/// Valid initial load current in A.
pub const INITIAL_CURRENT_RANGE_A: RangeInclusive<f64> = 0.0..=5.0;
/// Valid final load current in A.
pub const FINAL_CURRENT_RANGE_A: RangeInclusive<f64> = 1.0..=10.0;
/// Valid stabilization timeout in seconds.
pub const STABILIZATION_TIMEOUT_RANGE_S: RangeInclusive<f64> = 0.0..=3600.0;

/// Validates that `value` lies within the inclusive `range`.
///
/// NaN is reported as a lower-bound violation since it compares false against
/// both ends.
///
/// # Arguments
///
/// * `parameter` - Name reported in the error.
/// * `value` - The value to validate.
/// * `range` - The inclusive range to validate against.
pub fn check_range(
    parameter: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> AppResult<()> {
    if range.contains(&value) {
        return Ok(());
    }
    let bound = if value > *range.end() {
        Bound::Upper
    } else {
        Bound::Lower
    };
    Err(DaqError::ParameterOutOfRange {
        parameter,
        value,
        min: *range.start(),
        max: *range.end(),
        bound,
    })
}

/// Validates a chamber temperature.
pub fn check_temperature(value: f64) -> AppResult<()> {
    check_range("temperature", value, &TEMPERATURE_RANGE_C)
}

/// Validates the stabilization timeout.
pub fn check_stabilization_timeout(seconds: f64) -> AppResult<()> {
    check_range(
        "stabilization_timeout",
        seconds,
        &STABILIZATION_TIMEOUT_RANGE_S,
    )
}

/// Validates the initial load current.
pub fn check_initial_current(amps: f64) -> AppResult<()> {
    check_range("initial_current", amps, &INITIAL_CURRENT_RANGE_A)
}

/// Validates the final load current.
pub fn check_final_current(amps: f64) -> AppResult<()> {
    check_range("final_current", amps, &FINAL_CURRENT_RANGE_A)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_inclusive_bounds() {
        assert!(check_temperature(0.0).is_ok());
        assert!(check_temperature(60.0).is_ok());
        assert!(check_initial_current(5.0).is_ok());
        assert!(check_final_current(1.0).is_ok());
        assert!(check_stabilization_timeout(3600.0).is_ok());
    }

    #[test]
    fn reports_which_bound_was_violated() {
        match check_temperature(-10.0) {
            Err(DaqError::ParameterOutOfRange {
                parameter, bound, ..
            }) => {
                assert_eq!(parameter, "temperature");
                assert_eq!(bound, Bound::Lower);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        match check_temperature(85.0) {
            Err(DaqError::ParameterOutOfRange { bound, max, .. }) => {
                assert_eq!(bound, Bound::Upper);
                assert_eq!(max, 60.0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn each_parameter_is_named() {
        let cases: [(AppResult<()>, &str); 3] = [
            (check_initial_current(5.5), "initial_current"),
            (check_final_current(0.5), "final_current"),
            (check_stabilization_timeout(40.0 * 60.0 * 2.0), "stabilization_timeout"),
        ];
        for (result, name) in cases {
            let err = result.unwrap_err();
            assert_eq!(err.parameter(), Some(name));
        }
    }

    #[test]
    fn nan_is_rejected() {
        assert!(check_final_current(f64::NAN).is_err());
    }
}
