//! Outlier Detection
//!
//! Tukey quartile fences with two severities per side:
//!
//! ```text
//!   extreme low | mild low |        normal        | mild high | extreme high
//! -------------+----------+----------------------+-----------+-------------
//!          Q1 - 3·IQR  Q1 - 1.5·IQR        Q3 + 1.5·IQR  Q3 + 3·IQR
//! ```
//!
//! Samples are only classified, never removed: every sample is still used by
//! the bootstrap estimates.

use crate::percentiles::{Quartiles, compute_quartiles, sorted_copy};

/// Multiplier of the IQR for the mild fences
pub const MILD_FENCE_FACTOR: f64 = 1.5;

/// Multiplier of the IQR for the extreme fences
pub const EXTREME_FENCE_FACTOR: f64 = 3.0;

/// Bucket a flagged sample falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutlierClass {
    /// Below `Q1 - 3·IQR`
    LowExtreme,
    /// Between `Q1 - 3·IQR` and `Q1 - 1.5·IQR`
    LowMild,
    /// Between `Q3 + 1.5·IQR` and `Q3 + 3·IQR`
    HighMild,
    /// Above `Q3 + 3·IQR`
    HighExtreme,
}

impl OutlierClass {
    /// All classes, in report order
    pub const ALL: [OutlierClass; 4] = [
        OutlierClass::LowExtreme,
        OutlierClass::LowMild,
        OutlierClass::HighMild,
        OutlierClass::HighExtreme,
    ];

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            OutlierClass::LowExtreme => "extreme low",
            OutlierClass::LowMild => "mild low",
            OutlierClass::HighMild => "mild high",
            OutlierClass::HighExtreme => "extreme high",
        }
    }
}

impl std::fmt::Display for OutlierClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The four fence values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fences {
    /// `Q1 - 3·IQR`
    pub low_extreme: f64,
    /// `Q1 - 1.5·IQR`
    pub low_mild: f64,
    /// `Q3 + 1.5·IQR`
    pub high_mild: f64,
    /// `Q3 + 3·IQR`
    pub high_extreme: f64,
}

impl Fences {
    /// Build fences from quartiles
    pub fn from_quartiles(q: &Quartiles) -> Self {
        let iqr = q.iqr();
        Self {
            low_extreme: q.q1 - EXTREME_FENCE_FACTOR * iqr,
            low_mild: q.q1 - MILD_FENCE_FACTOR * iqr,
            high_mild: q.q3 + MILD_FENCE_FACTOR * iqr,
            high_extreme: q.q3 + EXTREME_FENCE_FACTOR * iqr,
        }
    }

    /// Classify one value; extreme is checked before mild on each side
    pub fn classify(&self, value: f64) -> Option<OutlierClass> {
        if value < self.low_extreme {
            Some(OutlierClass::LowExtreme)
        } else if value < self.low_mild {
            Some(OutlierClass::LowMild)
        } else if value > self.high_extreme {
            Some(OutlierClass::HighExtreme)
        } else if value > self.high_mild {
            Some(OutlierClass::HighMild)
        } else {
            None
        }
    }
}

/// One sample that fell outside the mild fences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlaggedSample {
    /// Position in the original (unsorted) sample
    pub index: usize,
    /// Sample value
    pub value: f64,
    /// Bucket
    pub class: OutlierClass,
}

/// Result of outlier analysis
#[derive(Debug, Clone)]
pub struct OutlierAnalysis {
    /// Quartiles of the sample
    pub quartiles: Quartiles,
    /// Fences derived from the quartiles
    pub fences: Fences,
    /// Flagged samples in original index order
    pub flagged: Vec<FlaggedSample>,
    /// Total number of samples analysed
    pub sample_count: usize,
}

impl OutlierAnalysis {
    /// Number of samples in `class`
    pub fn count(&self, class: OutlierClass) -> usize {
        self.flagged.iter().filter(|s| s.class == class).count()
    }

    /// Flagged samples in `class`
    pub fn in_class(&self, class: OutlierClass) -> impl Iterator<Item = &FlaggedSample> + '_ {
        self.flagged.iter().filter(move |s| s.class == class)
    }

    /// Whether any sample was flagged
    pub fn has_outliers(&self) -> bool {
        !self.flagged.is_empty()
    }

    /// Percentage of samples that are outliers
    pub fn outlier_percentage(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        (self.flagged.len() as f64 / self.sample_count as f64) * 100.0
    }
}

/// Classify every sample against the quartile fences of the whole sample
pub fn detect_outliers(samples: &[f64]) -> OutlierAnalysis {
    let sorted = sorted_copy(samples);
    let quartiles = compute_quartiles(&sorted);
    let fences = Fences::from_quartiles(&quartiles);

    let flagged = samples
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            fences.classify(value).map(|class| FlaggedSample {
                index,
                value,
                class,
            })
        })
        .collect();

    OutlierAnalysis {
        quartiles,
        fences,
        flagged,
        sample_count: samples.len(),
    }
}
