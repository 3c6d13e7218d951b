//! Burn statistics reduced over all realizations
//!
//! Sums are kept in `f64` and folded in realization-index order, which makes
//! the result independent of how many workers produced the outcomes.

use serde::{Deserialize, Serialize};

use super::realization::RealizationOutcome;
use crate::core_types::diagnostics::Diagnostic;

/// Per-cell statistics over completed realizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    width: usize,
    height: usize,
    burn_count: Vec<u32>,
    intensity_sum: Vec<f64>,
    intensity_max: Vec<f32>,
    ros_sum: Vec<f64>,
    realizations: u32,
}

impl AggregateStatistics {
    pub fn new(width: usize, height: usize) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            burn_count: vec![0; n],
            intensity_sum: vec![0.0; n],
            intensity_max: vec![0.0; n],
            ros_sum: vec![0.0; n],
            realizations: 0,
        }
    }

    /// Fold one completed realization in.
    pub fn merge(&mut self, outcome: &RealizationOutcome) {
        for record in &outcome.records {
            let i = record.index as usize;
            self.burn_count[i] += 1;
            self.intensity_sum[i] += f64::from(record.peak_intensity);
            self.intensity_max[i] = self.intensity_max[i].max(record.peak_intensity);
            self.ros_sum[i] += f64::from(record.peak_ros);
        }
        self.realizations += 1;
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Completed realizations folded in
    pub fn realizations(&self) -> u32 {
        self.realizations
    }

    pub fn burn_count(&self, x: usize, y: usize) -> u32 {
        self.burn_count[y * self.width + x]
    }

    /// Fraction of completed realizations in which the cell burned.
    pub fn burn_probability(&self, x: usize, y: usize) -> f64 {
        if self.realizations == 0 {
            return 0.0;
        }
        f64::from(self.burn_count(x, y)) / f64::from(self.realizations)
    }

    /// Mean peak intensity over realizations where the cell burned (kW/m).
    pub fn mean_intensity(&self, x: usize, y: usize) -> f64 {
        let i = y * self.width + x;
        conditional_mean(self.intensity_sum[i], self.burn_count[i])
    }

    /// Largest peak intensity seen in any realization (kW/m).
    pub fn max_intensity(&self, x: usize, y: usize) -> f32 {
        self.intensity_max[y * self.width + x]
    }

    /// Mean peak rate of spread over realizations where the cell burned (m/min).
    pub fn mean_ros(&self, x: usize, y: usize) -> f64 {
        let i = y * self.width + x;
        conditional_mean(self.ros_sum[i], self.burn_count[i])
    }

    /// Burn probability for every cell, row-major.
    pub fn burn_probability_grid(&self) -> Vec<f64> {
        if self.realizations == 0 {
            return vec![0.0; self.burn_count.len()];
        }
        let n = f64::from(self.realizations);
        self.burn_count.iter().map(|&c| f64::from(c) / n).collect()
    }

    pub fn mean_intensity_grid(&self) -> Vec<f64> {
        self.intensity_sum
            .iter()
            .zip(&self.burn_count)
            .map(|(&sum, &count)| conditional_mean(sum, count))
            .collect()
    }

    pub fn max_intensity_grid(&self) -> &[f32] {
        &self.intensity_max
    }

    pub fn mean_ros_grid(&self) -> Vec<f64> {
        self.ros_sum
            .iter()
            .zip(&self.burn_count)
            .map(|(&sum, &count)| conditional_mean(sum, count))
            .collect()
    }

    pub fn burn_count_grid(&self) -> &[u32] {
        &self.burn_count
    }
}

#[inline]
fn conditional_mean(sum: f64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

/// Bookkeeping for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub requested: u32,
    /// Realizations that started
    pub dispatched: u32,
    pub completed: u32,
    /// Completed realizations that hit the maximum simulated duration
    pub truncated: u32,
    pub failed: u32,
    /// Realizations stopped at the hard deadline
    pub cancelled: u32,
    pub wall_clock_secs: f64,
    /// Failure cause and count, most frequent first
    pub failure_causes: Vec<(String, u32)>,
    pub diagnostics: Vec<Diagnostic>,
    /// Mean burned area per completed realization (ha)
    pub mean_burned_area_ha: f64,
}

/// Statistics plus summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub statistics: AggregateStatistics,
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::diagnostics::DiagnosticTally;
    use crate::grid::{BurnRecord, IgnitionSource};

    fn outcome(index: u32, cells: &[(u32, f32, f32)]) -> RealizationOutcome {
        RealizationOutcome {
            index,
            records: cells
                .iter()
                .map(|&(i, intensity, ros)| BurnRecord {
                    index: i,
                    peak_intensity: intensity,
                    peak_ros: ros,
                    source: IgnitionSource::Front,
                })
                .collect(),
            truncated: false,
            duration: 60.0,
            diagnostics: DiagnosticTally::default(),
        }
    }

    #[test]
    fn test_empty_statistics_are_zero() {
        let stats = AggregateStatistics::new(2, 2);
        assert_eq!(stats.burn_probability(1, 1), 0.0);
        assert_eq!(stats.mean_intensity(1, 1), 0.0);
        assert!(stats.burn_probability_grid().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_means_are_conditional_on_burning() {
        let mut stats = AggregateStatistics::new(2, 1);
        stats.merge(&outcome(0, &[(0, 1000.0, 2.0)]));
        stats.merge(&outcome(1, &[(0, 3000.0, 4.0), (1, 500.0, 1.0)]));
        stats.merge(&outcome(2, &[]));

        assert_eq!(stats.realizations(), 3);
        assert!((stats.burn_probability(0, 0) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.mean_intensity(0, 0), 2000.0);
        assert_eq!(stats.mean_ros(0, 0), 3.0);
        assert_eq!(stats.max_intensity(0, 0), 3000.0);
        assert_eq!(stats.mean_intensity(1, 0), 500.0);
    }
}
