//! One Monte Carlo realization
//!
//! A realization owns its random source, its weather draw and its
//! [`GridState`]; it shares only the read-only landscape and run
//! configuration. It ends when the fire goes out, when simulated time reaches
//! the configured maximum (truncated), or when the run's hard deadline passes
//! (cancelled).

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::config::RunConfig;
use super::scenario::{weather_at, WeatherScenario};
use crate::core_types::diagnostics::DiagnosticTally;
use crate::error::RealizationError;
use crate::grid::{BurnRecord, GridState, IgnitionSource, Landscape};
use crate::solver::{SpreadIntegrator, StepOutcome};

/// Seed of realization `index`, derived from the run seed.
///
/// SplitMix64 finalizer over the seed and index, so neighbouring indices
/// get unrelated streams.
pub fn derive_seed(base_seed: u64, index: u64) -> u64 {
    let mut z = base_seed ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Random source of realization `index`.
pub fn realization_rng(base_seed: u64, index: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_seed(base_seed, index))
}

/// Everything a finished realization contributes to the reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizationOutcome {
    pub index: u32,
    /// Cells that burned, in index order, with their peak behavior
    pub records: Vec<BurnRecord>,
    /// Simulated time hit the maximum while cells were still burning
    pub truncated: bool,
    /// Simulated minutes until the fire went out or was truncated
    pub duration: f32,
    pub diagnostics: DiagnosticTally,
}

impl RealizationOutcome {
    pub fn burned_cells(&self) -> usize {
        self.records.len()
    }
}

/// How a dispatched realization ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RealizationEnd {
    Finished(RealizationOutcome),
    Failed(RealizationError),
    /// Stopped at the hard deadline; partial state is discarded
    Cancelled,
}

/// Hard deadline for in-flight realizations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancelToken {
    hard_stop: Option<Instant>,
}

impl CancelToken {
    pub fn never() -> Self {
        Self { hard_stop: None }
    }

    pub fn at(hard_stop: Instant) -> Self {
        Self {
            hard_stop: Some(hard_stop),
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.hard_stop.is_some_and(|stop| Instant::now() >= stop)
    }
}

/// Run realization `index` to completion.
pub fn run_realization(
    landscape: &Landscape,
    weather: &WeatherScenario,
    config: &RunConfig,
    index: u32,
    cancel: CancelToken,
) -> RealizationEnd {
    match simulate(landscape, weather, config, index, cancel) {
        Ok(Some(outcome)) => RealizationEnd::Finished(outcome),
        Ok(None) => RealizationEnd::Cancelled,
        Err(err) => RealizationEnd::Failed(err),
    }
}

fn simulate(
    landscape: &Landscape,
    scenario: &WeatherScenario,
    config: &RunConfig,
    index: u32,
    cancel: CancelToken,
) -> Result<Option<RealizationOutcome>, RealizationError> {
    let mut rng = realization_rng(config.seed, u64::from(index));
    let weather = scenario.draw(&mut rng)?;
    let ignitions = config.ignition.ignition_cells(landscape, &mut rng)?;
    let first = weather_at(&weather, 0)
        .ok_or_else(|| RealizationError::WeatherDraw("empty weather sequence".into()))?;

    let mut diagnostics = DiagnosticTally::default();
    let mut grid = GridState::new(landscape.width(), landscape.height());
    let mut integrator = SpreadIntegrator::new(
        landscape,
        config.behavior_params(),
        config.spotting,
        config.calibration.ember_multiplier,
    );
    for &cell in &ignitions {
        integrator.ignite(
            &mut grid,
            cell,
            0.0,
            IgnitionSource::Initial,
            first,
            &mut diagnostics,
        )?;
    }

    let dt = config.simulation.time_step;
    let max_duration = config.simulation.max_duration;
    let mut step = 0usize;
    let mut now = 0.0_f32;
    let mut truncated = false;
    while grid.burning_count() > 0 {
        if now >= max_duration {
            truncated = true;
            break;
        }
        if cancel.is_cancelled() {
            debug!(index, step, "Realization cancelled");
            return Ok(None);
        }
        let Some(state) = weather_at(&weather, step) else {
            break;
        };
        let t1 = (now + dt).min(max_duration);
        let report = integrator.step(&mut grid, state, now, t1, &mut rng, &mut diagnostics)?;
        now = t1;
        step += 1;
        if report.outcome == StepOutcome::Extinguished {
            break;
        }
    }

    let records = grid.burn_records();
    debug!(
        index,
        burned = records.len(),
        duration = now,
        truncated,
        "Realization finished"
    );
    Ok(Some(RealizationOutcome {
        index,
        records,
        truncated,
        duration: now,
        diagnostics,
    }))
}
