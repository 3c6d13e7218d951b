//! Core types and utilities

pub mod diagnostics;
pub mod fuel;
pub mod weather;

pub use diagnostics::{BehaviorFlags, Diagnostic, DiagnosticTally};
pub use fuel::{CanopyProperties, FuelCoefficients, FuelModifiers, FuelType};
pub use weather::WeatherState;
