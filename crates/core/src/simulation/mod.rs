//! Monte Carlo burn-probability simulation
//!
//! [`run`] drives an ensemble of independent fire realizations over a shared
//! [`Landscape`](crate::grid::Landscape) and reduces them into per-cell burn
//! statistics:
//!
//! - [`config`]: run configuration, TOML loading and validation
//! - [`scenario`]: per-realization weather and ignition draws
//! - [`realization`]: seed derivation and a single realization
//! - [`aggregate`]: the reduced statistics and run summary
//! - [`monte_carlo`]: worker pool, dispatch, cancellation and reduction

pub mod aggregate;
pub mod config;
pub mod monte_carlo;
pub mod realization;
pub mod scenario;

pub use aggregate::{AggregateStatistics, RunResult, RunSummary};
pub use config::{Calibration, RunConfig, SimulationParams, CALIBRATION_VERSION};
pub use monte_carlo::run;
pub use realization::{
    derive_seed, run_realization, CancelToken, RealizationEnd, RealizationOutcome,
};
pub use scenario::{IgnitionPolicy, WeatherScenario};
