//! Percent-change helpers.

fn percent(from: f64, to: f64) -> Option<f64> {
    Some((to / from - 1.0) * 100.0).filter(|c| c.is_finite())
}

/// Percent change from the first to the last value.
///
/// `Some(0.0)` for a single value, `None` for no values or a zero base.
pub fn pct_change_first_last(values: &[f64]) -> Option<f64> {
    match values {
        [] => None,
        [_] => Some(0.0),
        [first, .., last] => percent(*first, *last),
    }
}

/// Percent change between the final two values, `None` below two values
/// or when the earlier value is zero.
///
/// Callers pass the last few points rather than "yesterday vs today" so a
/// holiday gap just means the comparison spans more calendar days.
pub fn pct_change_last_period(values: &[f64]) -> Option<f64> {
    match values {
        [.., prev, last] => percent(*prev, *last),
        _ => None,
    }
}
