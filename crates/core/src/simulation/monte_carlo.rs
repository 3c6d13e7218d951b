//! Monte Carlo orchestrator
//!
//! Realizations run on a dedicated rayon pool in index-ordered batches. Each
//! batch's outcomes come back in index order and are folded sequentially
//! into the aggregate, so the statistics are bit-identical for any worker
//! count. The fold is the only place shared results are mutated.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use super::aggregate::{AggregateStatistics, RunResult, RunSummary};
use super::config::RunConfig;
use super::realization::{run_realization, CancelToken, RealizationEnd};
use super::scenario::WeatherScenario;
use crate::core_types::diagnostics::{Diagnostic, DiagnosticTally};
use crate::error::{Result, SimError};
use crate::grid::Landscape;

/// Realizations per batch for each worker thread
const BATCH_PER_WORKER: usize = 4;

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// Run the Monte Carlo ensemble.
///
/// # Errors
/// - `InvalidInput` for inconsistent landscape, weather or ignition points
/// - `Config` for out-of-range configuration or a pool that cannot start
/// - `TooManyFailedRealizations` when the failed fraction exceeds the
///   configured tolerance
pub fn run(landscape: &Landscape, weather: &WeatherScenario, config: &RunConfig) -> Result<RunResult> {
    config.validate()?;
    weather.validate()?;
    config.ignition.validate(landscape)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| SimError::Config(format!("failed to start worker pool: {e}")))?;
    let workers = pool.current_num_threads();
    let batch_size = (workers * BATCH_PER_WORKER).max(1);

    info!(
        iterations = config.iterations,
        workers,
        width = landscape.width(),
        height = landscape.height(),
        seed = config.seed,
        "Starting Monte Carlo run"
    );

    let started = Instant::now();
    let soft_limit = config.wall_clock_limit.map(|secs| started + Duration::from_secs_f64(secs));
    let cancel = soft_limit.map_or_else(CancelToken::never, |limit| {
        CancelToken::at(limit + Duration::from_secs_f64(config.cancel_grace))
    });

    let mut fold = Fold::new(landscape.width(), landscape.height());
    let mut next = 0u32;
    while next < config.iterations {
        if soft_limit.is_some_and(|limit| Instant::now() >= limit) {
            warn!(
                dispatched = next,
                requested = config.iterations,
                "Wall-clock limit reached, no further realizations dispatched"
            );
            break;
        }
        let end = next.saturating_add(batch_size as u32).min(config.iterations);
        let batch: Vec<Option<RealizationEnd>> = pool.install(|| {
            (next..end)
                .into_par_iter()
                .map(|index| {
                    // Realizations not yet started when the limit passes are skipped
                    if soft_limit.is_some_and(|limit| Instant::now() >= limit) {
                        None
                    } else {
                        Some(run_realization(landscape, weather, config, index, cancel))
                    }
                })
                .collect()
        });
        for (offset, realization) in batch.into_iter().enumerate() {
            if let Some(realization) = realization {
                fold.push(next + offset as u32, realization);
            }
        }
        next = end;
    }

    let wall_clock_secs = started.elapsed().as_secs_f64();
    let cell_area = f64::from(landscape.cell_size()).powi(2);
    let result = fold.finish(config, wall_clock_secs, cell_area)?;

    let summary = &result.summary;
    for diagnostic in &summary.diagnostics {
        if let Diagnostic::ExtremeBuildup {
            max_buildup,
            occurrences,
        } = diagnostic
        {
            warn!(max_buildup, occurrences, "Extreme buildup engaged the capped buildup path");
        }
    }
    info!(
        completed = summary.completed,
        truncated = summary.truncated,
        failed = summary.failed,
        cancelled = summary.cancelled,
        wall_clock_secs = summary.wall_clock_secs,
        "Monte Carlo run finished"
    );
    Ok(result)
}

/// Sequential reduction state.
struct Fold {
    statistics: AggregateStatistics,
    diagnostics: DiagnosticTally,
    causes: FxHashMap<&'static str, u32>,
    dispatched: u32,
    completed: u32,
    truncated: u32,
    failed: u32,
    cancelled: u32,
    burned_cells: u64,
}

impl Fold {
    fn new(width: usize, height: usize) -> Self {
        Self {
            statistics: AggregateStatistics::new(width, height),
            diagnostics: DiagnosticTally::default(),
            causes: FxHashMap::default(),
            dispatched: 0,
            completed: 0,
            truncated: 0,
            failed: 0,
            cancelled: 0,
            burned_cells: 0,
        }
    }

    fn push(&mut self, index: u32, realization: RealizationEnd) {
        self.dispatched += 1;
        match realization {
            RealizationEnd::Finished(outcome) => {
                self.statistics.merge(&outcome);
                self.diagnostics.merge(&outcome.diagnostics);
                self.burned_cells += outcome.burned_cells() as u64;
                self.completed += 1;
                if outcome.truncated {
                    self.truncated += 1;
                }
            }
            RealizationEnd::Failed(err) => {
                warn!(index, error = %err, "Realization failed, excluded from statistics");
                *self.causes.entry(err.cause_label()).or_insert(0) += 1;
                self.failed += 1;
            }
            RealizationEnd::Cancelled => {
                debug!(index, "Realization cancelled at the hard deadline");
                self.cancelled += 1;
            }
        }
    }

    fn finish(self, config: &RunConfig, wall_clock_secs: f64, cell_area: f64) -> Result<RunResult> {
        let mut causes: Vec<(String, u32)> = self
            .causes
            .into_iter()
            .map(|(cause, count)| (cause.to_string(), count))
            .collect();
        causes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        if self.dispatched > 0
            && f64::from(self.failed) > config.failure_tolerance * f64::from(self.dispatched)
        {
            return Err(SimError::TooManyFailedRealizations {
                failed: self.failed,
                dispatched: self.dispatched,
                tolerance: config.failure_tolerance,
                causes,
            });
        }

        let mean_burned_area_ha = if self.completed == 0 {
            0.0
        } else {
            self.burned_cells as f64 * cell_area / SQUARE_METRES_PER_HECTARE / f64::from(self.completed)
        };

        Ok(RunResult {
            statistics: self.statistics,
            summary: RunSummary {
                requested: config.iterations,
                dispatched: self.dispatched,
                completed: self.completed,
                truncated: self.truncated,
                failed: self.failed,
                cancelled: self.cancelled,
                wall_clock_secs,
                failure_causes: causes,
                diagnostics: self.diagnostics.to_diagnostics(),
                mean_burned_area_ha,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::fuel::FuelType;
    use crate::core_types::weather::WeatherState;
    use crate::grid::FuelCell;
    use crate::simulation::scenario::IgnitionPolicy;

    fn quick_config(iterations: u32, workers: usize) -> RunConfig {
        RunConfig {
            iterations,
            workers,
            ignition: IgnitionPolicy::Fixed(vec![(7, 7)]),
            ..RunConfig::quick()
        }
    }

    #[test]
    fn test_summary_counts_add_up() {
        let landscape = Landscape::uniform(15, 15, 30.0, FuelType::C3).unwrap();
        let weather = WeatherScenario::constant(WeatherState::with_buildup(90.0, 70.0, 20.0, 180.0));
        let result = run(&landscape, &weather, &quick_config(12, 2)).unwrap();
        let summary = &result.summary;
        assert_eq!(summary.requested, 12);
        assert_eq!(summary.dispatched, 12);
        assert_eq!(summary.completed + summary.failed + summary.cancelled, 12);
        assert_eq!(result.statistics.realizations(), summary.completed);
        assert!(summary.mean_burned_area_ha > 0.0);
    }

    #[test]
    fn test_all_failed_run_is_fatal() {
        let landscape = Landscape::new(3, 3, 30.0, vec![FuelCell::non_fuel(0.0); 9]).unwrap();
        let weather = WeatherScenario::constant(WeatherState::with_buildup(90.0, 70.0, 20.0, 180.0));
        let config = RunConfig {
            iterations: 5,
            workers: 1,
            ignition: IgnitionPolicy::Random { max_attempts: 4 },
            ..RunConfig::quick()
        };
        match run(&landscape, &weather, &config) {
            Err(SimError::TooManyFailedRealizations {
                failed,
                dispatched,
                causes,
                ..
            }) => {
                assert_eq!(failed, 5);
                assert_eq!(dispatched, 5);
                assert_eq!(causes, vec![("no_ignitable_cell".to_string(), 5)]);
            }
            other => panic!("expected TooManyFailedRealizations, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_wall_clock_limit_dispatches_nothing() {
        let landscape = Landscape::uniform(15, 15, 30.0, FuelType::C3).unwrap();
        let weather = WeatherScenario::constant(WeatherState::with_buildup(90.0, 70.0, 20.0, 180.0));
        let config = RunConfig {
            wall_clock_limit: Some(0.0),
            ..quick_config(10, 1)
        };
        let result = run(&landscape, &weather, &config).unwrap();
        assert_eq!(result.summary.dispatched, 0);
        assert_eq!(result.statistics.realizations(), 0);
        assert_eq!(result.statistics.burn_probability(7, 7), 0.0);
    }
}
