//! Fire weather state and FWI System helper equations
//!
//! A [`WeatherState`] is one time-sliced set of fire weather indices valid for
//! a single simulation step. Producing the daily moisture codes from raw
//! observations is the job of an upstream weather pipeline; the helpers here
//! only derive the two composite indices the behavior calculator needs (BUI
//! from DMC/DC, ISI from FFMC and wind).
//!
//! # Scientific References
//! - Van Wagner, C.E. (1987). "Development and structure of the Canadian Forest
//!   Fire Weather Index System". Forestry Technical Report 35.
//! - Forestry Canada Fire Danger Group (1992). ST-X-3, equations 52-53.

use serde::{Deserialize, Serialize};

use super::diagnostics::Diagnostic;
use crate::error::SimError;

/// Upper bound of the FFMC scale.
pub const FFMC_MAX: f32 = 101.0;

/// Buildup above which the run reports an extreme-buildup diagnostic.
pub const EXTREME_BUILDUP: f32 = 150.0;

/// Wind speeds above this (km/h) are outside the calibration data.
pub const NOMINAL_WIND_MAX: f32 = 120.0;

/// Fine fuel moisture content (%) from FFMC.
#[inline]
pub fn fine_fuel_moisture(ffmc: f32) -> f32 {
    let ffmc = ffmc.clamp(0.0, FFMC_MAX);
    147.27723 * (FFMC_MAX - ffmc) / (59.5 + ffmc)
}

/// FFMC component of the ISI, f(F).
pub fn moisture_function(ffmc: f32) -> f32 {
    let m = fine_fuel_moisture(ffmc);
    91.9 * (-0.1386 * m).exp() * (1.0 + m.powf(5.31) / 4.93e7)
}

/// Wind component of the ISI, f(W).
///
/// Above 40 km/h the exponential form is replaced by the saturating
/// high-wind form of Wotton et al. (2009); both agree at 40 km/h.
pub fn wind_function(wind_speed: f32) -> f32 {
    let ws = wind_speed.max(0.0);
    if ws <= 40.0 {
        (0.05039 * ws).exp()
    } else {
        12.0 * (1.0 - (-0.0818 * (ws - 28.0)).exp())
    }
}

/// Initial Spread Index.
pub fn initial_spread_index(ffmc: f32, wind_speed: f32) -> f32 {
    0.208 * wind_function(wind_speed) * moisture_function(ffmc)
}

/// Buildup Index from the Duff Moisture Code and Drought Code.
pub fn buildup_index(dmc: f32, dc: f32) -> f32 {
    let dmc = dmc.max(0.0);
    let dc = dc.max(0.0);
    if dmc == 0.0 {
        return 0.0;
    }
    let bui = if dmc <= 0.4 * dc {
        0.8 * dmc * dc / (dmc + 0.4 * dc)
    } else {
        dmc - (1.0 - 0.8 * dc / (dmc + 0.4 * dc)) * (0.92 + (0.0114 * dmc).powf(1.7))
    };
    bui.max(0.0)
}

/// Fire weather valid for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    /// Fine Fuel Moisture Code (0-101)
    pub ffmc: f32,
    /// Duff Moisture Code, when the buildup was derived from daily codes
    pub dmc: Option<f32>,
    /// Drought Code, when the buildup was derived from daily codes
    pub dc: Option<f32>,
    /// Buildup Index (unbounded)
    pub bui: f32,
    /// 10 m open wind speed (km/h)
    pub wind_speed: f32,
    /// Direction the wind blows from (degrees clockwise from north)
    pub wind_direction: f32,
}

impl WeatherState {
    /// Build from the daily FWI moisture codes, deriving BUI.
    pub fn from_codes(ffmc: f32, dmc: f32, dc: f32, wind_speed: f32, wind_direction: f32) -> Self {
        Self {
            ffmc,
            dmc: Some(dmc),
            dc: Some(dc),
            bui: buildup_index(dmc, dc),
            wind_speed,
            wind_direction,
        }
    }

    /// Build from an already-computed buildup index.
    pub fn with_buildup(ffmc: f32, bui: f32, wind_speed: f32, wind_direction: f32) -> Self {
        Self {
            ffmc,
            dmc: None,
            dc: None,
            bui,
            wind_speed,
            wind_direction,
        }
    }

    /// Initial Spread Index on flat ground for this state's wind.
    pub fn isi(&self) -> f32 {
        initial_spread_index(self.ffmc, self.wind_speed)
    }

    /// Bearing the head fire runs toward on flat ground (degrees).
    pub fn downwind_bearing(&self) -> f32 {
        (self.wind_direction + 180.0).rem_euclid(360.0)
    }

    /// Check that every index is finite and non-negative.
    ///
    /// Values outside their nominal range are not errors: they are returned
    /// as diagnostics and handled by the capped paths in the calculator.
    pub fn validate(&self) -> Result<Vec<Diagnostic>, SimError> {
        let fields = [
            ("ffmc", Some(self.ffmc)),
            ("dmc", self.dmc),
            ("dc", self.dc),
            ("bui", Some(self.bui)),
            ("wind_speed", Some(self.wind_speed)),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(SimError::invalid_input(format!(
                        "weather index {name} must be finite and non-negative, got {v}"
                    )));
                }
            }
        }
        if !self.wind_direction.is_finite() {
            return Err(SimError::invalid_input(format!(
                "wind direction must be finite, got {}",
                self.wind_direction
            )));
        }

        let mut diagnostics = Vec::new();
        if self.ffmc > FFMC_MAX {
            diagnostics.push(Diagnostic::FfmcOutOfRange {
                max_ffmc: self.ffmc,
                occurrences: 1,
            });
        }
        if self.bui > EXTREME_BUILDUP {
            diagnostics.push(Diagnostic::ExtremeBuildup {
                max_buildup: self.bui,
                occurrences: 1,
            });
        }
        if self.wind_speed > NOMINAL_WIND_MAX {
            diagnostics.push(Diagnostic::WindOutOfRange {
                max_wind_speed: self.wind_speed,
                occurrences: 1,
            });
        }
        Ok(diagnostics)
    }
}
