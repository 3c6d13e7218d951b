//! Error taxonomy for the burn-probability engine.
//!
//! Fatal conditions surface as [`SimError`] and abort a run before (or instead
//! of) producing statistics. Problems confined to a single Monte Carlo
//! realization are [`RealizationError`]s: the orchestrator logs them, drops the
//! realization from the reduction and only escalates once the failed fraction
//! exceeds the configured tolerance.

use thiserror::Error;

/// Result alias used across the public API.
pub type Result<T> = std::result::Result<T, SimError>;

/// Fatal simulation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Fuel-type code or name outside the closed FBP catalogue.
    #[error("invalid fuel type '{0}'")]
    InvalidFuelType(String),

    /// Malformed landscape, weather or ignition input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Run configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Too many realizations failed for the aggregate to be trusted.
    #[error(
        "{failed} of {dispatched} realizations failed (tolerance {tolerance:.3}); causes: {}",
        format_causes(.causes)
    )]
    TooManyFailedRealizations {
        failed: u32,
        dispatched: u32,
        tolerance: f64,
        /// Failure cause label and occurrence count, most frequent first.
        causes: Vec<(String, u32)>,
    },
}

impl SimError {
    /// Shorthand for [`SimError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

fn format_causes(causes: &[(String, u32)]) -> String {
    causes
        .iter()
        .map(|(cause, count)| format!("{cause} x{count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of one realization; recovered at the orchestrator level.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RealizationError {
    /// Random ignition could not find a burnable cell within its attempt budget.
    #[error("no ignitable cell found after {attempts} attempts")]
    NoIgnitableCell { attempts: u32 },

    /// The fire behavior for a cell produced a non-finite value.
    #[error("non-finite fire behavior at cell ({x}, {y}): {quantity}")]
    NumericalFault {
        x: usize,
        y: usize,
        quantity: &'static str,
    },

    /// The weather drawn for this realization failed validation.
    #[error("weather draw rejected: {0}")]
    WeatherDraw(String),
}

impl RealizationError {
    /// Stable label used when tallying failure causes.
    pub fn cause_label(&self) -> &'static str {
        match self {
            Self::NoIgnitableCell { .. } => "no_ignitable_cell",
            Self::NumericalFault { .. } => "numerical_fault",
            Self::WeatherDraw(_) => "weather_draw",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_failed_message_lists_causes() {
        let err = SimError::TooManyFailedRealizations {
            failed: 9,
            dispatched: 10,
            tolerance: 0.1,
            causes: vec![("no_ignitable_cell".to_string(), 9)],
        };
        let msg = err.to_string();
        assert!(msg.contains("9 of 10"), "{msg}");
        assert!(msg.contains("no_ignitable_cell x9"), "{msg}");
    }

    #[test]
    fn test_cause_labels_are_stable() {
        assert_eq!(
            RealizationError::NoIgnitableCell { attempts: 3 }.cause_label(),
            "no_ignitable_cell"
        );
        assert_eq!(
            RealizationError::WeatherDraw("nan".into()).cause_label(),
            "weather_draw"
        );
    }
}
