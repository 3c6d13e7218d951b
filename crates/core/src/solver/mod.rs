//! Fire spread solver
//!
//! Elliptical growth geometry and the per-step integrator that moves one
//! realization's burn state forward in time.

pub mod ellipse;
mod spread;

// Re-exports
pub use ellipse::{back_rate, directional_rate, eccentricity, length_to_breadth};
pub use spread::{SpreadIntegrator, StepOutcome, StepReport, MAX_BURN_DURATION, MIN_BURN_DURATION};
