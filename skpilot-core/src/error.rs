//! Error types for autopilot commands

use thiserror::Error;

use crate::status::{PilotMode, PilotState};

/// Errors returned by [`Autopilot`](crate::Autopilot) operations.
///
/// A failed command leaves the device status untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AutopilotError {
    /// Requested state is not in the state catalog
    #[error("Invalid state: {value} (current state {})", or_unset(.state))]
    InvalidState {
        value: String,
        state: Option<PilotState>,
    },

    /// Requested mode is not in the mode catalog
    #[error("Invalid mode: {value} (current mode {})", or_unset(.mode))]
    InvalidMode {
        value: String,
        mode: Option<PilotMode>,
    },

    /// Target value is not acceptable in the current mode
    #[error("Invalid value {value} for current mode {}", or_unset(.mode))]
    InvalidTarget { value: f64, mode: Option<PilotMode> },

    /// Adjusted target would leave the range of the current mode
    #[error("Adjustment {delta} moves target to {candidate}, outside the range of mode {}", or_unset(.mode))]
    OutOfRange {
        delta: f64,
        candidate: f64,
        mode: Option<PilotMode>,
    },

    /// Operation is not supported by this device
    #[error("Not implemented: {operation}")]
    NotImplemented { operation: &'static str },

    /// Device could not be reached during start-up
    #[error("Connection to autopilot failed: {0}")]
    ConnectionFailure(String),
}

impl AutopilotError {
    /// True for errors caused by an unacceptable command argument
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AutopilotError::InvalidState { .. }
                | AutopilotError::InvalidMode { .. }
                | AutopilotError::InvalidTarget { .. }
                | AutopilotError::OutOfRange { .. }
        )
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, AutopilotError::NotImplemented { .. })
    }
}

fn or_unset<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "unset".to_string(),
    }
}
