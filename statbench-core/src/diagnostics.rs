//! Measurement Diagnostics
//!
//! Advisory checks over the block durations. Each returns `None` when the
//! data looks clean and a human-readable explanation otherwise.

use statbench_report::{format_engineering, format_seconds};
use statbench_stats::{OutlierClass, correlogram, detect_outliers};

/// Fewest samples for which outliers are assessed
pub const MIN_OUTLIER_SAMPLES: usize = 4;

/// Fewest samples for which serial correlation is assessed
pub const MIN_SERIAL_SAMPLES: usize = 50;

/// Largest lag examined
pub const MAX_SERIAL_LAG: usize = 20;

/// Describe the samples outside the quartile fences.
///
/// Lists the count in each of the four buckets along with every flagged
/// value and its position in the original sequence.
pub fn outlier_issues(samples: &[f64]) -> Option<String> {
    if samples.len() < MIN_OUTLIER_SAMPLES {
        return None;
    }
    let analysis = detect_outliers(samples);
    if !analysis.has_outliers() {
        return None;
    }

    let q = &analysis.quartiles;
    let f = &analysis.fences;
    let mut text = format!(
        "{} of {} measurements ({:.1}%) are outliers \
         (Q1 = {}, median = {}, Q3 = {}, IQR = {}; fences: {}, {}, {}, {})",
        analysis.flagged.len(),
        analysis.sample_count,
        analysis.outlier_percentage(),
        format_seconds(q.q1),
        format_seconds(q.median),
        format_seconds(q.q3),
        format_seconds(q.iqr()),
        format_seconds(f.low_extreme),
        format_seconds(f.low_mild),
        format_seconds(f.high_mild),
        format_seconds(f.high_extreme),
    );

    for class in OutlierClass::ALL {
        let flagged: Vec<String> = analysis
            .in_class(class)
            .map(|s| format!("#{} = {}", s.index, format_seconds(s.value)))
            .collect();
        text.push_str(&format!("\n  {}: {}", class, flagged.len()));
        if !flagged.is_empty() {
            text.push_str(&format!(" [{}]", flagged.join(", ")));
        }
    }

    Some(text)
}

/// Test the samples for serial correlation.
///
/// Autocorrelations for lags `1..=min(round(N/4), 20)` are compared against
/// their 95% white-noise bands. A few excursions are expected by chance, so
/// only more than `round(5% · K)` of them count as an issue. Fewer than 50
/// samples are reported as undeterminable.
pub fn serial_correlation_issues(samples: &[f64]) -> Option<String> {
    let n = samples.len();
    if n < MIN_SERIAL_SAMPLES {
        return Some(format!(
            "unable to determine serial correlation: {n} measurements, at least {MIN_SERIAL_SAMPLES} required"
        ));
    }

    let max_lag = ((n as f64 / 4.0).round() as usize).min(MAX_SERIAL_LAG);
    // a constant series cannot be correlated
    let lags = correlogram(samples, max_lag)?;

    let outside: Vec<_> = lags.iter().filter(|l| l.is_outside()).collect();
    let allowed = (0.05 * lags.len() as f64).round() as usize;
    if outside.len() <= allowed {
        return None;
    }

    let details: Vec<String> = outside
        .iter()
        .map(|l| {
            let dev = l.deviation_sd();
            format!(
                "r[{}] = {} is {} sd {} its expected value {} (band {} .. {})",
                l.lag,
                format_engineering(l.r, 3),
                format_engineering(dev.abs(), 3),
                if dev >= 0.0 { "above" } else { "below" },
                format_engineering(l.expected, 3),
                format_engineering(l.lower, 3),
                format_engineering(l.upper, 3),
            )
        })
        .collect();

    Some(format!(
        "measurements may be serially correlated: {} of {} autocorrelation lags fall outside their 95% band \
         (at most {} expected by chance)\n  {}",
        outside.len(),
        lags.len(),
        allowed,
        details.join("\n  "),
    ))
}
