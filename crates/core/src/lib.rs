//! Wildfire Burn-Probability Core Library
//!
//! A Monte Carlo engine built on the Canadian Forest Fire Behavior Prediction
//! (FBP) System. Each realization ignites a fuel/terrain grid, grows the fire
//! with elliptical spread and ember spotting under a time-sliced weather
//! sequence, and the ensemble is reduced to per-cell burn probability,
//! intensity and rate-of-spread statistics.
//!
//! ## Layout
//!
//! - [`core_types`]: fuel-type catalogue, fire weather, diagnostics
//! - [`physics`]: fire behavior calculator, crown fire, slope, spotting
//! - [`grid`]: the read-only landscape and per-realization burn state
//! - [`solver`]: ellipse geometry and the per-step spread integrator
//! - [`simulation`]: configuration, realizations and the Monte Carlo run
//!
//! ## Example
//!
//! ```rust,no_run
//! use fire_mc_core::{
//!     run, FuelType, IgnitionPolicy, Landscape, RunConfig, WeatherScenario, WeatherState,
//! };
//!
//! let landscape = Landscape::uniform(100, 100, 30.0, FuelType::C2)?;
//! let weather = WeatherScenario::constant(WeatherState::from_codes(90.0, 40.0, 300.0, 20.0, 270.0));
//! let config = RunConfig {
//!     iterations: 200,
//!     ignition: IgnitionPolicy::Fixed(vec![(50, 50)]),
//!     ..RunConfig::default()
//! };
//! let result = run(&landscape, &weather, &config)?;
//! println!("P(burn) at origin: {}", result.statistics.burn_probability(50, 50));
//! # Ok::<(), fire_mc_core::SimError>(())
//! ```

pub mod core_types;
pub mod error;
pub mod grid;
pub mod physics;
pub mod simulation;
pub mod solver;

// Re-export core types
pub use core_types::{
    BehaviorFlags, CanopyProperties, Diagnostic, DiagnosticTally, FuelModifiers, FuelType,
    WeatherState,
};
pub use error::{RealizationError, Result, SimError};

// Re-export grid and physics entry points
pub use grid::{BurnRecord, CellStatus, FuelCell, GridState, IgnitionSource, Landscape};
pub use physics::{
    calculate_fire_behavior, BehaviorParams, CrownFireType, FireBehaviorResult, SpottingParams,
    Terrain, Wind,
};

// Re-export simulation types
pub use simulation::{
    run, AggregateStatistics, Calibration, IgnitionPolicy, RunConfig, RunResult, RunSummary,
    SimulationParams, WeatherScenario,
};
pub use solver::{SpreadIntegrator, StepOutcome};
