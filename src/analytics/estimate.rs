//! Ratio and overrun statistics
//!
//! Learns how far actuals historically drift from estimates and applies
//! that drift to a new estimate.

use super::stats::{mean, median, sample_stdev};
use super::Analysis;
use crate::records::FlatRecord;
use serde::Serialize;

/// Mean ratio above which estimates are considered to overrun
pub const OVERRUN_THRESHOLD: f64 = 1.2;

/// Mean ratio below which estimates are considered to underrun
pub const UNDERRUN_THRESHOLD: f64 = 0.8;

/// Historical actual-vs-estimate statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioStatistics {
    /// Rows with both an estimate and an actual
    pub sample_size: usize,
    /// Rows that contributed a ratio (estimate > 0)
    pub ratio_samples: usize,
    pub mean_actual: f64,
    pub median_actual: f64,
    /// Sample standard deviation of actuals; 0 with fewer than two rows
    pub stdev_actual: f64,
    /// Mean of per-row `actual / estimate`; 1.0 when no row qualifies
    pub mean_ratio: f64,
}

impl RatioStatistics {
    /// Compute from flat rows
    ///
    /// Only rows where both columns hold numbers are considered.
    pub fn compute(rows: &[FlatRecord], estimate_col: &str, actual_col: &str) -> Analysis<Self> {
        let pairs: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|r| Some((r.get_f64(actual_col)?, r.get_f64(estimate_col)?)))
            .collect();
        Self::from_pairs(&pairs)
    }

    /// Compute from `(actual, estimate)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Analysis<Self> {
        let actuals: Vec<f64> = pairs.iter().map(|(actual, _)| *actual).collect();
        let (Some(mean_actual), Some(median_actual)) = (mean(&actuals), median(&actuals)) else {
            return Analysis::NoData;
        };

        let ratios: Vec<f64> = pairs
            .iter()
            .filter(|(_, estimate)| *estimate > 0.0)
            .map(|(actual, estimate)| actual / estimate)
            .collect();

        Analysis::Ready(Self {
            sample_size: pairs.len(),
            ratio_samples: ratios.len(),
            mean_actual,
            median_actual,
            stdev_actual: sample_stdev(&actuals),
            mean_ratio: mean(&ratios).unwrap_or(1.0),
        })
    }

    /// Classify the historical bias
    pub fn bias(&self) -> EstimateBias {
        if self.mean_ratio > OVERRUN_THRESHOLD {
            EstimateBias::Overrun
        } else if self.mean_ratio < UNDERRUN_THRESHOLD {
            EstimateBias::Underrun
        } else {
            EstimateBias::Accurate
        }
    }

    /// Apply the historical ratio to a new estimate
    pub fn project(&self, estimate: f64) -> ScopeProjection {
        let adjusted = estimate * self.mean_ratio;
        ScopeProjection {
            input: estimate,
            adjusted,
            conservative: adjusted + self.stdev_actual,
        }
    }
}

/// An estimate adjusted by historical statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScopeProjection {
    /// Estimate as given
    pub input: f64,
    /// `input * mean_ratio`
    pub adjusted: f64,
    /// `adjusted + stdev_actual`
    pub conservative: f64,
}

/// Direction of historical estimation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateBias {
    Overrun,
    Underrun,
    Accurate,
}
