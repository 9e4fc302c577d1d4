//! Threshold classification
//!
//! Maps a continuous measurement onto a discrete table row/column. Two forms
//! are used by the pricing tables:
//!
//! - **Upper-bound scan** ([`Thresholds`]): the first bound `>=` the value is
//!   selected. Values beyond every bound saturate into the last bucket.
//! - **Inclusive range** ([`RangeBand`]): `min <= value <= max` membership,
//!   used for hole-price bands where a miss is meaningful.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ascending upper bounds with a label per bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thresholds {
    bounds: Vec<f64>,
    labels: Vec<String>,
}

/// Why a threshold list was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("threshold list is empty")]
    Empty,

    #[error("{bounds} bounds but {labels} labels")]
    LabelCount { bounds: usize, labels: usize },

    #[error("bound #{} is not strictly greater than the previous one", .index + 1)]
    NotIncreasing { index: usize },

    #[error("bound #{} is NaN or infinite (only the last bound may be infinite)", .index + 1)]
    NotFinite { index: usize },
}

impl Thresholds {
    /// Build from bounds and matching labels
    ///
    /// Bounds must be strictly increasing. `f64::INFINITY` is accepted as the
    /// terminal overflow bound.
    pub fn new(bounds: Vec<f64>, labels: Vec<String>) -> Result<Self, ThresholdError> {
        if bounds.is_empty() {
            return Err(ThresholdError::Empty);
        }
        if bounds.len() != labels.len() {
            return Err(ThresholdError::LabelCount {
                bounds: bounds.len(),
                labels: labels.len(),
            });
        }
        for (i, b) in bounds.iter().enumerate() {
            if b.is_nan() || (b.is_infinite() && i + 1 != bounds.len()) {
                return Err(ThresholdError::NotFinite { index: i });
            }
            if i > 0 && *b <= bounds[i - 1] {
                return Err(ThresholdError::NotIncreasing { index: i });
            }
        }
        Ok(Self { bounds, labels })
    }

    /// Build with labels generated from the bounds
    pub fn with_labels(
        bounds: Vec<f64>,
        label: impl Fn(usize, f64, &[f64]) -> String,
    ) -> Result<Self, ThresholdError> {
        let labels = bounds
            .iter()
            .enumerate()
            .map(|(i, b)| label(i, *b, &bounds))
            .collect();
        Self::new(bounds, labels)
    }

    /// Index of the first bound `>= value`, or the last index on overflow
    pub fn classify(&self, value: f64) -> usize {
        first_at_least(&self.bounds, value).unwrap_or(self.bounds.len() - 1)
    }

    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Position of the first bound that is `>= value`
///
/// Bounds are ascending, so the scan stops at the first hit. A value equal to
/// a bound selects that bound.
pub fn first_at_least(bounds: &[f64], value: f64) -> Option<usize> {
    bounds.iter().position(|b| value <= *b)
}

/// Closed interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBand {
    pub min: f64,
    pub max: f64,
}

impl RangeBand {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Index of the band containing `value`, if any
pub fn find_band<'a, I>(bands: I, value: f64) -> Option<usize>
where
    I: IntoIterator<Item = &'a RangeBand>,
{
    bands.into_iter().position(|b| b.contains(value))
}

/// Check bands are well-formed, ascending and non-overlapping
///
/// Returns the offending band index (1-based in the message).
pub fn validate_bands(bands: &[RangeBand]) -> Result<(), String> {
    if bands.is_empty() {
        return Err("band list is empty".to_string());
    }
    for (i, band) in bands.iter().enumerate() {
        if !(band.min.is_finite() && band.max.is_finite()) || band.min > band.max {
            return Err(format!(
                "band #{} has an invalid range {}..={}",
                i + 1,
                band.min,
                band.max
            ));
        }
        if i > 0 && band.min <= bands[i - 1].max {
            return Err(format!(
                "band #{} ({}..={}) overlaps band #{} ({}..={})",
                i + 1,
                band.min,
                band.max,
                i,
                bands[i - 1].min,
                bands[i - 1].max
            ));
        }
    }
    Ok(())
}
