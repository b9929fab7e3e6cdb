//! Number formatting for G-code words.
//!
//! Values are scaled by `10^decimals` and rounded half away from zero before
//! the digits are laid out, so the same input always prints the same text.

/// Largest magnitude that is formatted through integer digits.
const MAX_SCALED: f64 = 9.0e15;

/// Formats `value` with exactly `decimals` digits after the point.
///
/// A value that rounds to zero prints without a sign. With `leading_zeros`
/// off, magnitudes below one drop the `0` before the point (`.5`, `-.25`).
pub fn format_number(value: f64, decimals: usize, leading_zeros: bool) -> String {
    let scale = 10f64.powi(decimals as i32);
    let scaled = (value * scale).round();
    if decimals > 15 || !scaled.is_finite() || scaled.abs() > MAX_SCALED {
        return format!("{:.*}", decimals, value);
    }

    let n = scaled as i64;
    let negative = n < 0;
    let digits = n.unsigned_abs();
    let divisor = 10u64.pow(decimals as u32);
    let whole = digits / divisor;
    let frac = digits % divisor;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if whole > 0 || leading_zeros || decimals == 0 {
        out.push_str(&whole.to_string());
    }
    if decimals > 0 {
        out.push('.');
        out.push_str(&format!("{:0width$}", frac, width = decimals));
    }
    out
}

/// Feed rate word digits: whole numbers in mm/min, hundredths in in/min.
pub fn feed_decimals(inches: bool) -> usize {
    if inches {
        2
    } else {
        0
    }
}
