//! Per-step spread integrator
//!
//! Advances one realization's [`GridState`] over `[t0, t1)`:
//!
//! 1. Fire behavior is evaluated once per burning cell and cached for the step
//! 2. Active crown cells release embers (cells in index order); a landed ember
//!    ignites its cell when the realization's draw falls under the ignition
//!    probability
//! 3. The front expands by arrival-time propagation over a 16-cell
//!    neighborhood: each burning cell reaches a neighbor after
//!    `d / r(θ)` minutes, with `r(θ)` from its fire ellipse. Cells reached
//!    before `t1` ignite and keep propagating inside the same step. Moves
//!    whose path cuts through non-fuel are not taken
//! 4. Cells whose burnout time has passed burn out
//!
//! A cell ignites at most once; embers are resolved before the front, so an
//! ember-lit cell keeps the `Ember` source even if the front gets there in
//! the same step.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::Vector2;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::ellipse::directional_rate;
use crate::core_types::diagnostics::DiagnosticTally;
use crate::core_types::weather::WeatherState;
use crate::error::RealizationError;
use crate::grid::{GridState, IgnitionSource, Landscape};
use crate::physics::albini_spotting::{launch_embers, resolve_landing, SpottingParams};
use crate::physics::fire_behavior::{
    calculate_fire_behavior, BehaviorParams, FireBehaviorResult, Terrain, Wind,
};
use crate::physics::terrain_physics::vector_bearing;

/// Shortest time a cell stays burning (minutes)
pub const MIN_BURN_DURATION: f32 = 10.0;
/// Longest time a cell stays burning (minutes)
pub const MAX_BURN_DURATION: f32 = 360.0;

/// Neighbor offsets: the 8 adjacent cells plus the 8 knight moves, which
/// let the front travel along bearings between the compass points.
const NEIGHBORS: [(i64, i64); 16] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (-2, -1),
    (-1, -2),
    (1, -2),
    (2, -1),
    (-2, 1),
    (-1, 2),
    (1, 2),
    (2, 1),
];

/// Whether the straight path of a diagonal or knight move passes through a
/// non-fuel cell. Adjacent moves have no cells in between.
fn crosses_non_fuel(landscape: &Landscape, x: usize, y: usize, dx: i64, dy: i64) -> bool {
    let (x, y) = (x as i64, y as i64);
    let (sx, sy) = (dx.signum(), dy.signum());
    let between = match (dx.abs(), dy.abs()) {
        (1, 1) => [(x + sx, y), (x, y + sy)],
        (2, 1) => [(x + sx, y), (x + sx, y + sy)],
        (1, 2) => [(x, y + sy), (x + sx, y + sy)],
        _ => return false,
    };
    between.iter().any(|&(cx, cy)| {
        landscape
            .checked_index(cx, cy)
            .is_none_or(|i| !landscape.cell(i).is_burnable())
    })
}

/// Whether the fire survives the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Burning,
    Extinguished,
}

/// Counts from one integrator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub outcome: StepOutcome,
    pub front_ignitions: usize,
    pub ember_ignitions: usize,
    pub burned_out: usize,
}

/// Candidate arrival in the propagation queue
#[derive(Debug, Clone, Copy)]
struct Arrival {
    time: f32,
    index: usize,
}

impl PartialEq for Arrival {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Arrival {}

impl Ord for Arrival {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; ties go to the lower index
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Arrival {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Spread integrator for one realization.
///
/// Holds the per-step behavior cache and scratch buffers so they are reused
/// across steps.
pub struct SpreadIntegrator<'a> {
    landscape: &'a Landscape,
    behavior_params: BehaviorParams,
    spotting: SpottingParams,
    ember_multiplier: f32,
    behavior: FxHashMap<usize, FireBehaviorResult>,
    tentative: FxHashMap<usize, f32>,
    expanded: FxHashSet<usize>,
    heap: BinaryHeap<Arrival>,
}

impl<'a> SpreadIntegrator<'a> {
    pub fn new(
        landscape: &'a Landscape,
        behavior_params: BehaviorParams,
        spotting: SpottingParams,
        ember_multiplier: f32,
    ) -> Self {
        Self {
            landscape,
            behavior_params,
            spotting,
            ember_multiplier,
            behavior: FxHashMap::default(),
            tentative: FxHashMap::default(),
            expanded: FxHashSet::default(),
            heap: BinaryHeap::new(),
        }
    }

    /// Fire behavior of a burnable cell under `weather`, cached for the step.
    ///
    /// The first evaluation of a cell in a step also feeds its peaks and the
    /// diagnostic tally. Non-fuel cells yield `None`.
    fn evaluate(
        &mut self,
        index: usize,
        weather: &WeatherState,
        grid: &mut GridState,
        diagnostics: &mut DiagnosticTally,
    ) -> Result<Option<FireBehaviorResult>, RealizationError> {
        if let Some(cached) = self.behavior.get(&index) {
            return Ok(Some(*cached));
        }
        let cell = self.landscape.cell(index);
        let Some(fuel) = cell.fuel else {
            return Ok(None);
        };
        let canopy = cell.effective_canopy();
        let result = calculate_fire_behavior(
            fuel,
            weather,
            Wind::from(weather),
            Terrain {
                slope: cell.slope,
                aspect: cell.aspect,
            },
            canopy.as_ref(),
            &self.behavior_params,
        );
        if let Some(quantity) = result.non_finite_quantity() {
            let (x, y) = self.landscape.coords(index);
            return Err(RealizationError::NumericalFault { x, y, quantity });
        }

        grid.record_behavior(index, result.intensity(), result.ros());
        diagnostics.record(result.flags(), weather);
        self.behavior.insert(index, result);
        Ok(Some(result))
    }

    /// Ignite a cell, deriving its burnout time from the backing fire.
    ///
    /// Returns `false` when the cell is non-fuel or already ignited.
    pub fn ignite(
        &mut self,
        grid: &mut GridState,
        index: usize,
        time: f32,
        source: IgnitionSource,
        weather: &WeatherState,
        diagnostics: &mut DiagnosticTally,
    ) -> Result<bool, RealizationError> {
        if !grid.is_unburned(index) {
            return Ok(false);
        }
        let Some(behavior) = self.evaluate(index, weather, grid, diagnostics)? else {
            return Ok(false);
        };
        let burnout_at = time + self.burn_duration(&behavior);
        Ok(grid.ignite(index, time, burnout_at, source))
    }

    /// Time for the backing fire to cross one cell, clamped.
    fn burn_duration(&self, behavior: &FireBehaviorResult) -> f32 {
        let duration = self.landscape.cell_size() / behavior.back_ros();
        if duration.is_nan() {
            MAX_BURN_DURATION
        } else {
            duration.clamp(MIN_BURN_DURATION, MAX_BURN_DURATION)
        }
    }

    /// Advance the fire over `[t0, t1)` under `weather`.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        grid: &mut GridState,
        weather: &WeatherState,
        t0: f32,
        t1: f32,
        rng: &mut R,
        diagnostics: &mut DiagnosticTally,
    ) -> Result<StepReport, RealizationError> {
        self.behavior.clear();
        let burning = grid.burning_cells();
        for &index in &burning {
            self.evaluate(index, weather, grid, diagnostics)?;
        }

        let ember_ignitions = if self.spotting.enabled {
            self.resolve_embers(&burning, grid, weather, t0, t1, rng, diagnostics)?
        } else {
            0
        };
        let front_ignitions = self.expand_front(grid, weather, t0, t1, diagnostics)?;

        let burned_out = grid.burn_out_until(t1);
        let outcome = if grid.burning_count() == 0 {
            StepOutcome::Extinguished
        } else {
            StepOutcome::Burning
        };
        trace!(
            t0,
            t1,
            front_ignitions,
            ember_ignitions,
            burned_out,
            burning = grid.burning_count(),
            "Spread step"
        );

        Ok(StepReport {
            outcome,
            front_ignitions,
            ember_ignitions,
            burned_out,
        })
    }

    fn resolve_embers<R: Rng + ?Sized>(
        &mut self,
        burning: &[usize],
        grid: &mut GridState,
        weather: &WeatherState,
        t0: f32,
        t1: f32,
        rng: &mut R,
        diagnostics: &mut DiagnosticTally,
    ) -> Result<usize, RealizationError> {
        let mut ignited = 0;
        for &origin in burning {
            let Some(behavior) = self.behavior.get(&origin).copied() else {
                continue;
            };
            let embers = launch_embers(
                rng,
                origin,
                self.landscape.cell_center(origin),
                &behavior,
                weather.wind_speed,
                &self.spotting,
                self.ember_multiplier,
            );
            for ember in &embers {
                let Some(landing) = resolve_landing(self.landscape, weather, ember, &self.spotting)
                else {
                    continue;
                };
                let draw: f32 = rng.random();
                if draw >= landing.ignition_probability || !grid.is_unburned(landing.cell) {
                    continue;
                }
                let time = (t0 + landing.flight_time).min(t1);
                if self.ignite(grid, landing.cell, time, IgnitionSource::Ember, weather, diagnostics)? {
                    ignited += 1;
                }
            }
        }
        Ok(ignited)
    }

    fn expand_front(
        &mut self,
        grid: &mut GridState,
        weather: &WeatherState,
        t0: f32,
        t1: f32,
        diagnostics: &mut DiagnosticTally,
    ) -> Result<usize, RealizationError> {
        self.heap.clear();
        self.tentative.clear();
        self.expanded.clear();

        for index in grid.burning_cells() {
            let start = grid.ignition_time(index).max(t0);
            if start < t1 {
                self.heap.push(Arrival { time: start, index });
            }
        }

        let cell_size = self.landscape.cell_size();
        let mut ignited = 0;
        while let Some(Arrival { time, index }) = self.heap.pop() {
            if grid.is_unburned(index) {
                if !self.ignite(grid, index, time, IgnitionSource::Front, weather, diagnostics)? {
                    continue;
                }
                ignited += 1;
            }
            if !self.expanded.insert(index) {
                continue;
            }
            let Some(behavior) = self.evaluate(index, weather, grid, diagnostics)? else {
                continue;
            };
            if behavior.ros() <= 0.0 {
                continue;
            }

            let ignition_time = grid.ignition_time(index);
            let burnout_time = grid.burnout_time(index);
            let (x, y) = self.landscape.coords(index);
            for (dx, dy) in NEIGHBORS {
                let Some(neighbor) = self.landscape.checked_index(x as i64 + dx, y as i64 + dy)
                else {
                    continue;
                };
                if !grid.is_unburned(neighbor)
                    || !self.landscape.cell(neighbor).is_burnable()
                    || crosses_non_fuel(self.landscape, x, y, dx, dy)
                {
                    continue;
                }

                let offset = Vector2::new(dx as f32, dy as f32);
                let distance = offset.norm() * cell_size;
                let angle = (vector_bearing(&offset) - behavior.head_bearing()).to_radians();
                let rate = directional_rate(behavior.ros(), behavior.length_to_breadth(), angle);
                if !(rate.is_finite() && rate > 0.0) {
                    continue;
                }

                let arrival = (ignition_time + distance / rate).max(t0);
                if arrival > burnout_time || arrival >= t1 {
                    continue;
                }
                let best = self.tentative.entry(neighbor).or_insert(f32::INFINITY);
                if arrival < *best {
                    *best = arrival;
                    self.heap.push(Arrival {
                        time: arrival,
                        index: neighbor,
                    });
                }
            }
        }
        Ok(ignited)
    }
}
