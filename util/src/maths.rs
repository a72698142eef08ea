//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
///
/// The mapping is linear and unbounded, values outside `source_range` map outside
/// `target_range`.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Limit a value to the range `[min, max]`.
///
/// NaN values are passed through unchanged.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((1000.0, 2000.0), (-1.0, 1.0), 1500.0), 0.0);
        assert_eq!(lin_map((1000.0, 2000.0), (-1.0, 1.0), 2000.0), 1.0);
        assert_eq!(lin_map((1000.0, 2000.0), (-1.0, 1.0), 1000.0), -1.0);
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 2f64), 20f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5f64, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-3.0f64, -1.0, 1.0), -1.0);
        assert_eq!(clamp(0.25f64, -1.0, 1.0), 0.25);
    }
}
