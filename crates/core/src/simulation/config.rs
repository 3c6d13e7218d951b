//! Run configuration
//!
//! Every knob of a Monte Carlo run lives in [`RunConfig`]. All sections
//! deserialize with `#[serde(default)]`, so a TOML file only needs the keys
//! it changes:
//!
//! ```toml
//! iterations = 500
//! seed = 42
//!
//! [simulation]
//! max_duration = 360.0
//!
//! [ignition.random]
//! max_attempts = 200
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::scenario::IgnitionPolicy;
use crate::core_types::fuel::FuelModifiers;
use crate::error::{Result, SimError};
use crate::physics::albini_spotting::SpottingParams;
use crate::physics::fire_behavior::BehaviorParams;

/// Current calibration schema version
pub const CALIBRATION_VERSION: u32 = 1;

/// Versioned adaptive parameters applied on top of the FBP equations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub version: u32,
    /// Multiplier on head rate of spread
    pub ros_multiplier: f32,
    /// Multiplier on the number of embers released
    pub ember_multiplier: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            version: CALIBRATION_VERSION,
            ros_multiplier: 1.0,
            ember_multiplier: 1.0,
        }
    }
}

/// Time stepping and fuel parameters for each realization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Integrator step (minutes)
    pub time_step: f32,
    /// Simulated time after which a realization is truncated (minutes)
    pub max_duration: f32,
    /// Foliar moisture content (%)
    pub foliar_moisture: f32,
    pub modifiers: FuelModifiers,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            time_step: 15.0,
            max_duration: 480.0,
            foliar_moisture: 97.0,
            modifiers: FuelModifiers::default(),
        }
    }
}

/// Complete configuration of a Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Realizations requested
    pub iterations: u32,
    /// Worker threads; 0 uses one per logical CPU
    pub workers: usize,
    /// Base seed every realization seed is derived from
    pub seed: u64,
    /// Largest tolerated fraction of failed realizations
    pub failure_tolerance: f64,
    /// Wall-clock budget after which no new realizations start (seconds)
    pub wall_clock_limit: Option<f64>,
    /// Time past the budget before in-flight realizations are cancelled (seconds)
    pub cancel_grace: f64,
    pub simulation: SimulationParams,
    pub spotting: SpottingParams,
    pub calibration: Calibration,
    pub ignition: IgnitionPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            workers: 0,
            seed: 0x5eed_f1e5,
            failure_tolerance: 0.1,
            wall_clock_limit: None,
            cancel_grace: 5.0,
            simulation: SimulationParams::default(),
            spotting: SpottingParams::default(),
            calibration: Calibration::default(),
            ignition: IgnitionPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Small, fast run for smoke testing.
    pub fn quick() -> Self {
        Self {
            iterations: 50,
            simulation: SimulationParams {
                time_step: 30.0,
                max_duration: 180.0,
                ..SimulationParams::default()
            },
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parameters handed to the fire behavior calculator.
    pub fn behavior_params(&self) -> BehaviorParams {
        BehaviorParams {
            modifiers: self.simulation.modifiers,
            foliar_moisture: self.simulation.foliar_moisture,
            ros_multiplier: self.calibration.ros_multiplier,
        }
    }

    /// Check ranges that do not depend on the landscape.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f32) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimError::Config(format!("{name} must be finite and positive, got {value}")))
            }
        }
        fn non_negative(name: &str, value: f32) -> Result<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(SimError::Config(format!("{name} must be finite and non-negative, got {value}")))
            }
        }
        fn percent(name: &str, value: f32) -> Result<()> {
            if (0.0..=100.0).contains(&value) {
                Ok(())
            } else {
                Err(SimError::Config(format!("{name} must be within 0-100, got {value}")))
            }
        }

        if self.iterations == 0 {
            return Err(SimError::Config("iterations must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.failure_tolerance) {
            return Err(SimError::Config(format!(
                "failure_tolerance must be within 0-1, got {}",
                self.failure_tolerance
            )));
        }
        if let Some(limit) = self.wall_clock_limit {
            if !limit.is_finite() || limit < 0.0 {
                return Err(SimError::Config(format!(
                    "wall_clock_limit must be finite and non-negative, got {limit}"
                )));
            }
        }
        if !self.cancel_grace.is_finite() || self.cancel_grace < 0.0 {
            return Err(SimError::Config(format!(
                "cancel_grace must be finite and non-negative, got {}",
                self.cancel_grace
            )));
        }
        if self.calibration.version != CALIBRATION_VERSION {
            return Err(SimError::Config(format!(
                "calibration version {} is not supported (expected {CALIBRATION_VERSION})",
                self.calibration.version
            )));
        }

        let sim = &self.simulation;
        positive("simulation.time_step", sim.time_step)?;
        positive("simulation.max_duration", sim.max_duration)?;
        positive("simulation.foliar_moisture", sim.foliar_moisture)?;
        percent("simulation.modifiers.percent_conifer", sim.modifiers.percent_conifer)?;
        percent("simulation.modifiers.percent_dead_fir", sim.modifiers.percent_dead_fir)?;
        percent("simulation.modifiers.curing", sim.modifiers.curing)?;
        non_negative("simulation.modifiers.grass_fuel_load", sim.modifiers.grass_fuel_load)?;

        non_negative("spotting.embers_per_cell", self.spotting.embers_per_cell)?;
        non_negative("spotting.max_distance", self.spotting.max_distance)?;
        non_negative("spotting.direction_jitter", self.spotting.direction_jitter)?;
        positive("spotting.ember_burnout_time", self.spotting.ember_burnout_time)?;

        non_negative("calibration.ros_multiplier", self.calibration.ros_multiplier)?;
        non_negative("calibration.ember_multiplier", self.calibration.ember_multiplier)?;

        if let IgnitionPolicy::Random { max_attempts: 0 } = self.ignition {
            return Err(SimError::Config("ignition.random.max_attempts must be at least 1".into()));
        }
        if let IgnitionPolicy::Fixed(points) = &self.ignition {
            if points.is_empty() {
                return Err(SimError::Config("ignition.fixed needs at least one point".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        RunConfig::default().validate().unwrap();
        RunConfig::quick().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RunConfig::from_toml_str(
            r#"
            iterations = 25
            workers = 2

            [simulation]
            max_duration = 120.0

            [ignition]
            fixed = [[3, 4], [5, 6]]
            "#,
        )
        .unwrap();
        assert_eq!(config.iterations, 25);
        assert_eq!(config.workers, 2);
        assert_eq!(config.simulation.max_duration, 120.0);
        assert_eq!(config.simulation.time_step, 15.0);
        assert_eq!(config.ignition, IgnitionPolicy::Fixed(vec![(3, 4), (5, 6)]));
        assert_eq!(config.calibration, Calibration::default());
    }

    #[test]
    fn test_random_ignition_from_toml() {
        let config = RunConfig::from_toml_str(
            r#"
            [ignition.random]
            max_attempts = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.ignition, IgnitionPolicy::Random { max_attempts: 12 });
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            RunConfig::from_toml_str("iterations = 0"),
            Err(SimError::Config(_))
        ));
        assert!(matches!(
            RunConfig::from_toml_str("failure_tolerance = 1.5"),
            Err(SimError::Config(_))
        ));
        assert!(matches!(
            RunConfig::from_toml_str("[calibration]\nversion = 7"),
            Err(SimError::Config(_))
        ));
        assert!(matches!(
            RunConfig::from_toml_str("iterations = \"many\""),
            Err(SimError::Config(_))
        ));
    }
}
