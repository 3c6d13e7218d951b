//! Non-fatal numeric-domain diagnostics
//!
//! Out-of-nominal weather never aborts a run. The calculator marks each
//! affected evaluation with [`BehaviorFlags`]; realizations count them in a
//! [`DiagnosticTally`], the tallies are merged in the reduction step, and the
//! run summary reports them as [`Diagnostic`] entries.

use serde::{Deserialize, Serialize};

use super::weather::WeatherState;

/// Per-evaluation flags raised by the fire behavior calculator.
#[allow(clippy::struct_excessive_bools)] // Independent flags, any combination can be raised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorFlags {
    /// Raw buildup above the extreme threshold (150)
    pub extreme_buildup: bool,
    /// Buildup effect evaluated on the capped path (BUI > 80)
    pub buildup_capped: bool,
    /// FFMC above 101 was clamped
    pub ffmc_out_of_range: bool,
    /// Wind speed beyond the calibration range
    pub wind_out_of_range: bool,
    /// Slope steeper than 60% was capped
    pub slope_capped: bool,
}

impl BehaviorFlags {
    pub fn any(&self) -> bool {
        self.extreme_buildup
            || self.buildup_capped
            || self.ffmc_out_of_range
            || self.wind_out_of_range
            || self.slope_capped
    }
}

/// A recovered condition reported in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    ExtremeBuildup { max_buildup: f32, occurrences: u64 },
    BuildupCapped { occurrences: u64 },
    FfmcOutOfRange { max_ffmc: f32, occurrences: u64 },
    WindOutOfRange { max_wind_speed: f32, occurrences: u64 },
    SlopeCapped { occurrences: u64 },
}

/// Running counts of flagged evaluations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticTally {
    pub extreme_buildup: u64,
    pub buildup_capped: u64,
    pub ffmc_out_of_range: u64,
    pub wind_out_of_range: u64,
    pub slope_capped: u64,
    pub max_buildup: f32,
    pub max_ffmc: f32,
    pub max_wind_speed: f32,
}

impl DiagnosticTally {
    /// Count one flagged evaluation made under `weather`.
    pub fn record(&mut self, flags: BehaviorFlags, weather: &WeatherState) {
        if !flags.any() {
            return;
        }
        if flags.extreme_buildup {
            self.extreme_buildup += 1;
            self.max_buildup = self.max_buildup.max(weather.bui);
        }
        if flags.buildup_capped {
            self.buildup_capped += 1;
        }
        if flags.ffmc_out_of_range {
            self.ffmc_out_of_range += 1;
            self.max_ffmc = self.max_ffmc.max(weather.ffmc);
        }
        if flags.wind_out_of_range {
            self.wind_out_of_range += 1;
            self.max_wind_speed = self.max_wind_speed.max(weather.wind_speed);
        }
        if flags.slope_capped {
            self.slope_capped += 1;
        }
    }

    pub fn merge(&mut self, other: &DiagnosticTally) {
        self.extreme_buildup += other.extreme_buildup;
        self.buildup_capped += other.buildup_capped;
        self.ffmc_out_of_range += other.ffmc_out_of_range;
        self.wind_out_of_range += other.wind_out_of_range;
        self.slope_capped += other.slope_capped;
        self.max_buildup = self.max_buildup.max(other.max_buildup);
        self.max_ffmc = self.max_ffmc.max(other.max_ffmc);
        self.max_wind_speed = self.max_wind_speed.max(other.max_wind_speed);
    }

    /// Non-empty counters as summary entries.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if self.extreme_buildup > 0 {
            out.push(Diagnostic::ExtremeBuildup {
                max_buildup: self.max_buildup,
                occurrences: self.extreme_buildup,
            });
        }
        if self.buildup_capped > 0 {
            out.push(Diagnostic::BuildupCapped {
                occurrences: self.buildup_capped,
            });
        }
        if self.ffmc_out_of_range > 0 {
            out.push(Diagnostic::FfmcOutOfRange {
                max_ffmc: self.max_ffmc,
                occurrences: self.ffmc_out_of_range,
            });
        }
        if self.wind_out_of_range > 0 {
            out.push(Diagnostic::WindOutOfRange {
                max_wind_speed: self.max_wind_speed,
                occurrences: self.wind_out_of_range,
            });
        }
        if self.slope_capped > 0 {
            out.push(Diagnostic::SlopeCapped {
                occurrences: self.slope_capped,
            });
        }
        out
    }
}
