//! Engineering Notation
//!
//! Every duration in a report goes through these functions: values are
//! rounded to a number of significant digits and shown with an exponent that
//! is a multiple of three (or the matching SI prefix for seconds).

/// Significant digits used for durations in reports
pub const REPORT_DIGITS: usize = 3;

/// Format `value` in engineering notation with `significant_digits` digits.
///
/// ```ignore
/// assert_eq!(format_engineering(0.00123456, 3), "1.23e-3");
/// assert_eq!(format_engineering(123456.0, 3), "123e3");
/// ```
pub fn format_engineering(value: f64, significant_digits: usize) -> String {
    match split(value, significant_digits) {
        Some((mantissa, exponent, decimals)) if exponent != 0 => {
            format!("{mantissa:.decimals$}e{exponent}")
        }
        Some((mantissa, _, decimals)) => format!("{mantissa:.decimals$}"),
        None => plain(value),
    }
}

/// Format a duration in seconds with an SI prefix and three significant digits
pub fn format_seconds(seconds: f64) -> String {
    format_seconds_with(seconds, REPORT_DIGITS)
}

/// Format a duration in seconds with an SI prefix
pub fn format_seconds_with(seconds: f64, significant_digits: usize) -> String {
    match split(seconds, significant_digits) {
        Some((mantissa, exponent, decimals)) => match si_prefix(exponent) {
            Some(prefix) => format!("{mantissa:.decimals$} {prefix}s"),
            None => format!("{mantissa:.decimals$}e{exponent} s"),
        },
        None => format!("{} s", plain(seconds)),
    }
}

fn plain(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

fn si_prefix(exponent: i32) -> Option<&'static str> {
    Some(match exponent {
        -15 => "f",
        -12 => "p",
        -9 => "n",
        -6 => "u",
        -3 => "m",
        0 => "",
        3 => "k",
        6 => "M",
        9 => "G",
        _ => return None,
    })
}

/// Decimal exponent `e` with `10^e <= |x| < 10^(e+1)`
fn decade(x: f64) -> i32 {
    let mut e = x.log10().floor() as i32;
    if 10f64.powi(e + 1) <= x {
        e += 1;
    } else if 10f64.powi(e) > x {
        e -= 1;
    }
    e
}

/// Split into (mantissa, engineering exponent, decimals to print).
///
/// `None` for zero and non-finite input.
fn split(value: f64, significant_digits: usize) -> Option<(f64, i32, usize)> {
    if value == 0.0 || !value.is_finite() {
        return None;
    }
    let digits = significant_digits.max(1) as i32;

    let e = decade(value.abs());
    let scale = 10f64.powi(digits - 1 - e);
    let rounded = (value * scale).round() / scale;

    // rounding may carry into the next decade (999.6 -> 1000)
    let e = decade(rounded.abs());
    let exponent = e.div_euclid(3) * 3;
    let mantissa = rounded / 10f64.powi(exponent);
    let decimals = (digits - 1 - (e - exponent)).max(0) as usize;

    Some((mantissa, exponent, decimals))
}
