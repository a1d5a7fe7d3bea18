//! Contour level selection.

use tracing::warn;

/// Upper bound on levels per field; a tiny interval over a wide range
/// would otherwise generate an unbounded amount of work.
pub const MAX_LEVELS: usize = 1000;

/// Every `k * interval` (integer `k`) inside `[min_value, max_value]`,
/// ascending.
///
/// Levels are computed from `k` rather than by repeated addition so they
/// are exact multiples of the interval. Returns nothing for a non-positive
/// or non-finite interval, an inverted range, or more than [`MAX_LEVELS`]
/// levels.
pub fn generate_contour_levels(min_value: f64, max_value: f64, interval: f64) -> Vec<f64> {
    if !(interval.is_finite() && interval > 0.0) {
        return vec![];
    }
    if !(min_value.is_finite() && max_value.is_finite()) || max_value < min_value {
        return vec![];
    }

    if (max_value - min_value) / interval > MAX_LEVELS as f64 {
        warn!(
            min = min_value,
            max = max_value,
            interval,
            "Contour interval too small for value range; no levels generated"
        );
        return vec![];
    }
    // Keeps the integer multipliers well inside i64.
    if min_value.abs().max(max_value.abs()) / interval > 1.0e15 {
        return vec![];
    }

    let k_start = (min_value / interval).floor() as i64 - 1;
    let k_end = (max_value / interval).ceil() as i64 + 1;

    (k_start..=k_end)
        .map(|k| k as f64 * interval)
        .filter(|level| *level >= min_value && *level <= max_value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_include_touching_extremes() {
        assert_eq!(
            generate_contour_levels(1008.0, 1014.0, 2.0),
            vec![1008.0, 1010.0, 1012.0, 1014.0]
        );
    }

    #[test]
    fn test_levels_offset_start() {
        assert_eq!(
            generate_contour_levels(3.0, 27.0, 5.0),
            vec![5.0, 10.0, 15.0, 20.0, 25.0]
        );
    }

    #[test]
    fn test_levels_negative_range() {
        assert_eq!(
            generate_contour_levels(-20.0, 20.0, 10.0),
            vec![-20.0, -10.0, 0.0, 10.0, 20.0]
        );
    }

    #[test]
    fn test_flat_field_on_level() {
        assert_eq!(generate_contour_levels(10.0, 10.0, 5.0), vec![10.0]);
        assert!(generate_contour_levels(11.0, 11.0, 5.0).is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(generate_contour_levels(0.0, 100.0, 0.0).is_empty());
        assert!(generate_contour_levels(0.0, 100.0, -10.0).is_empty());
        assert!(generate_contour_levels(0.0, 100.0, f64::NAN).is_empty());
        assert!(generate_contour_levels(100.0, 0.0, 10.0).is_empty());
        assert!(generate_contour_levels(f64::NAN, 1.0, 1.0).is_empty());
    }

    #[test]
    fn test_too_many_levels() {
        assert!(generate_contour_levels(0.0, 1.0e6, 0.5).is_empty());
    }
}
