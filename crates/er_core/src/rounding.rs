//! Integer-first percent helpers.
//!
//! Engine outputs carry `f64` percentages for the UI, but every one of them is
//! computed from integer counts in a single division, and a zero denominator
//! always yields `0.0` (never NaN or infinity). Report strings are rendered
//! from integer hundredths so formatting never depends on float printing.

/// `num / den * 100`, or `0.0` when `den == 0`.
#[inline]
pub fn percent(num: u64, den: u64) -> f64 {
    if den == 0 {
        return 0.0;
    }
    (num as f64) * 100.0 / (den as f64)
}

/// Percent in integer hundredths (`12.34% -> 1234`), round half to even.
/// Returns 0 when `den == 0`.
pub fn percent_hundredths(num: u64, den: u64) -> u64 {
    if den == 0 {
        return 0;
    }
    let n = (num as u128) * 10_000;
    let d = den as u128;
    let q = n / d;
    let r = n % d;
    let twice = r * 2;
    let rounded = if twice > d || (twice == d && q % 2 == 1) { q + 1 } else { q };
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Render hundredths as a fixed two-decimal string: `1234 -> "12.34"`.
pub fn format_hundredths(h: u64) -> String {
    format!("{}.{:02}", h / 100, h % 100)
}

/// Convenience: `format_hundredths(percent_hundredths(num, den))`.
#[inline]
pub fn percent_string(num: u64, den: u64) -> String {
    format_hundredths(percent_hundredths(num, den))
}
