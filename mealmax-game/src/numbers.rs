//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a win ratio into a percentage rounded to one decimal place.
/// Non-finite ratios map to 0.0.
#[must_use]
pub fn ratio_to_pct_tenths(ratio: f64) -> f64 {
    if !ratio.is_finite() {
        return 0.0;
    }
    (ratio * 1_000.0).round() / 10.0
}

/// Convert a character or element count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(count: usize) -> f64 {
    cast::<usize, f64>(count).unwrap_or(0.0)
}

/// Convert a whole number of hundredths into a fraction.
#[must_use]
pub fn hundredths_to_fraction(hundredths: u32) -> f64 {
    f64::from(hundredths) / 100.0
}
