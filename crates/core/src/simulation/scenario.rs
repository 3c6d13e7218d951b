//! Per-realization draws: weather sequence and ignition cells
//!
//! Both draws consume the realization's own random source and nothing else,
//! so a realization is fully determined by its seed.

use std::borrow::Cow;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core_types::weather::WeatherState;
use crate::error::{RealizationError, Result, SimError};
use crate::grid::Landscape;

/// Where each realization's fire starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnitionPolicy {
    /// The same `(x, y)` cells in every realization
    Fixed(Vec<(usize, usize)>),
    /// One uniformly drawn burnable cell per realization
    Random { max_attempts: u32 },
}

impl Default for IgnitionPolicy {
    fn default() -> Self {
        Self::Random { max_attempts: 100 }
    }
}

impl IgnitionPolicy {
    /// Check fixed ignition points against the landscape before any
    /// realization runs.
    pub fn validate(&self, landscape: &Landscape) -> Result<()> {
        if let Self::Fixed(points) = self {
            if points.is_empty() {
                return Err(SimError::invalid_input("fixed ignition needs at least one point"));
            }
            for &(x, y) in points {
                let cell = landscape.cell_at(x, y).ok_or_else(|| {
                    SimError::invalid_input(format!(
                        "ignition point ({x}, {y}) is outside the {}x{} grid",
                        landscape.width(),
                        landscape.height()
                    ))
                })?;
                if !cell.is_burnable() {
                    return Err(SimError::invalid_input(format!(
                        "ignition point ({x}, {y}) is on non-fuel"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Cells ignited at the start of a realization, in index order.
    pub fn ignition_cells<R: Rng + ?Sized>(
        &self,
        landscape: &Landscape,
        rng: &mut R,
    ) -> std::result::Result<Vec<usize>, RealizationError> {
        match self {
            Self::Fixed(points) => {
                let mut cells: Vec<usize> =
                    points.iter().map(|&(x, y)| landscape.index(x, y)).collect();
                cells.sort_unstable();
                cells.dedup();
                Ok(cells)
            }
            Self::Random { max_attempts } => {
                for _ in 0..*max_attempts {
                    let index = rng.random_range(0..landscape.len());
                    if landscape.cell(index).is_burnable() {
                        return Ok(vec![index]);
                    }
                }
                Err(RealizationError::NoIgnitableCell {
                    attempts: *max_attempts,
                })
            }
        }
    }
}

/// Weather driving each realization.
///
/// Step `k` of a realization uses state `min(k, len - 1)` of its sequence,
/// so the last state persists once the sequence runs out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherScenario {
    /// One sequence shared by every realization
    Fixed(Vec<WeatherState>),
    /// One member drawn uniformly per realization
    Ensemble(Vec<Vec<WeatherState>>),
    /// The base sequence with per-realization wind jitter
    Perturbed {
        base: Vec<WeatherState>,
        /// Relative half-width of the wind speed multiplier (0.2 = ±20 %)
        wind_speed_jitter: f32,
        /// Half-width of the wind direction offset (degrees)
        wind_direction_jitter: f32,
    },
}

impl WeatherScenario {
    /// Constant weather for the whole run.
    pub fn constant(state: WeatherState) -> Self {
        Self::Fixed(vec![state])
    }

    fn sequences(&self) -> Vec<&[WeatherState]> {
        match self {
            Self::Fixed(seq) | Self::Perturbed { base: seq, .. } => vec![seq.as_slice()],
            Self::Ensemble(members) => members.iter().map(Vec::as_slice).collect(),
        }
    }

    /// Reject empty or non-finite weather; out-of-nominal values are logged
    /// and left to the calculator's capped paths.
    pub fn validate(&self) -> Result<()> {
        let sequences = self.sequences();
        if sequences.is_empty() {
            return Err(SimError::invalid_input("weather ensemble has no members"));
        }
        for (member, seq) in sequences.iter().enumerate() {
            if seq.is_empty() {
                return Err(SimError::invalid_input(format!(
                    "weather sequence {member} is empty"
                )));
            }
            for (step, state) in seq.iter().enumerate() {
                let diagnostics = state.validate().map_err(|e| {
                    SimError::invalid_input(format!("weather sequence {member}, step {step}: {e}"))
                })?;
                for diagnostic in diagnostics {
                    warn!(member, step, ?diagnostic, "Out-of-nominal weather input");
                }
            }
        }
        if let Self::Perturbed {
            wind_speed_jitter,
            wind_direction_jitter,
            ..
        } = self
        {
            for (name, value) in [
                ("wind_speed_jitter", *wind_speed_jitter),
                ("wind_direction_jitter", *wind_direction_jitter),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(SimError::invalid_input(format!(
                        "{name} must be finite and non-negative, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Weather sequence for one realization.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> std::result::Result<Cow<'_, [WeatherState]>, RealizationError> {
        match self {
            Self::Fixed(seq) => Ok(Cow::Borrowed(seq.as_slice())),
            Self::Ensemble(members) => {
                if members.is_empty() {
                    return Err(RealizationError::WeatherDraw("empty ensemble".into()));
                }
                let member = rng.random_range(0..members.len());
                Ok(Cow::Borrowed(members[member].as_slice()))
            }
            Self::Perturbed {
                base,
                wind_speed_jitter,
                wind_direction_jitter,
            } => {
                let speed_factor = 1.0 + symmetric(rng, *wind_speed_jitter);
                let direction_offset = symmetric(rng, *wind_direction_jitter);
                let perturbed: Vec<WeatherState> = base
                    .iter()
                    .map(|state| WeatherState {
                        wind_speed: (state.wind_speed * speed_factor).max(0.0),
                        wind_direction: (state.wind_direction + direction_offset).rem_euclid(360.0),
                        ..*state
                    })
                    .collect();
                for state in &perturbed {
                    state
                        .validate()
                        .map_err(|e| RealizationError::WeatherDraw(e.to_string()))?;
                }
                Ok(Cow::Owned(perturbed))
            }
        }
    }
}

/// Uniform draw in `[-half_width, half_width]`.
fn symmetric<R: Rng + ?Sized>(rng: &mut R, half_width: f32) -> f32 {
    if half_width > 0.0 {
        rng.random_range(-half_width..=half_width)
    } else {
        0.0
    }
}

/// State for step `k` of a sequence.
#[inline]
pub fn weather_at(sequence: &[WeatherState], step: usize) -> Option<&WeatherState> {
    sequence.get(step.min(sequence.len().saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::fuel::FuelType;
    use crate::grid::FuelCell;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn weather(wind: f32) -> WeatherState {
        WeatherState::with_buildup(90.0, 60.0, wind, 270.0)
    }

    #[test]
    fn test_fixed_ignition_validation() {
        let mut cells = vec![FuelCell::new(FuelType::C2, 0.0, 0.0, 0.0); 9];
        cells[4] = FuelCell::non_fuel(0.0);
        let landscape = Landscape::new(3, 3, 30.0, cells).unwrap();

        assert!(IgnitionPolicy::Fixed(vec![(0, 0)]).validate(&landscape).is_ok());
        assert!(matches!(
            IgnitionPolicy::Fixed(vec![(1, 1)]).validate(&landscape),
            Err(SimError::InvalidInput(_))
        ));
        assert!(matches!(
            IgnitionPolicy::Fixed(vec![(3, 0)]).validate(&landscape),
            Err(SimError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_random_ignition_on_bare_ground_fails() {
        let landscape = Landscape::new(2, 2, 30.0, vec![FuelCell::non_fuel(0.0); 4]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = IgnitionPolicy::Random { max_attempts: 8 }
            .ignition_cells(&landscape, &mut rng)
            .unwrap_err();
        assert_eq!(err, RealizationError::NoIgnitableCell { attempts: 8 });
    }

    #[test]
    fn test_random_ignition_picks_fuel() {
        let mut cells = vec![FuelCell::non_fuel(0.0); 16];
        cells[11] = FuelCell::new(FuelType::O1b, 0.0, 0.0, 0.0);
        let landscape = Landscape::new(4, 4, 30.0, cells).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let picked = IgnitionPolicy::Random { max_attempts: 10_000 }
            .ignition_cells(&landscape, &mut rng)
            .unwrap();
        assert_eq!(picked, vec![11]);
    }

    #[test]
    fn test_last_state_persists() {
        let seq = vec![weather(10.0), weather(20.0)];
        assert_eq!(weather_at(&seq, 0).map(|w| w.wind_speed), Some(10.0));
        assert_eq!(weather_at(&seq, 7).map(|w| w.wind_speed), Some(20.0));
        assert!(weather_at(&[], 0).is_none());
    }

    #[test]
    fn test_perturbed_draw_stays_in_bounds() {
        let scenario = WeatherScenario::Perturbed {
            base: vec![weather(20.0)],
            wind_speed_jitter: 0.25,
            wind_direction_jitter: 30.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..50 {
            let drawn = scenario.draw(&mut rng).unwrap();
            let state = drawn[0];
            assert!((15.0..=25.0).contains(&state.wind_speed));
            let offset = (state.wind_direction - 270.0 + 540.0).rem_euclid(360.0) - 180.0;
            assert!(offset.abs() <= 30.0 + 1e-3);
        }
    }

    #[test]
    fn test_empty_sequences_rejected() {
        assert!(WeatherScenario::Fixed(vec![]).validate().is_err());
        assert!(WeatherScenario::Ensemble(vec![]).validate().is_err());
        assert!(WeatherScenario::Ensemble(vec![vec![weather(5.0)], vec![]])
            .validate()
            .is_err());
        assert!(WeatherScenario::constant(weather(5.0)).validate().is_ok());
    }
}
