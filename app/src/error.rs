use derive_more::derive::{Display, Error};

use crate::automation::TargetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Signal {
    #[display("Occupancy")]
    Occupancy,
    #[display("Temperature")]
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    SignalUnavailable,
    ActuatorFailure,
    ConfigurationError,
}

#[derive(Debug, Clone, PartialEq, Display, Error)]
pub enum ControlError {
    #[display("{signal} signal unavailable: {reason}")]
    SignalUnavailable { signal: Signal, reason: String },

    #[display("Failed to set output {target}: {reason}")]
    ActuatorFailure { target: TargetId, reason: String },

    #[display("Invalid configuration: {reason}")]
    Configuration { reason: String },
}

impl ControlError {
    pub fn signal_unavailable(signal: Signal, reason: impl ToString) -> Self {
        Self::SignalUnavailable {
            signal,
            reason: reason.to_string(),
        }
    }

    pub fn actuator_failure(target: &TargetId, reason: impl ToString) -> Self {
        Self::ActuatorFailure {
            target: target.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn configuration(reason: impl ToString) -> Self {
        Self::Configuration {
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ControlError::SignalUnavailable { .. } => ErrorKind::SignalUnavailable,
            ControlError::ActuatorFailure { .. } => ErrorKind::ActuatorFailure,
            ControlError::Configuration { .. } => ErrorKind::ConfigurationError,
        }
    }

    /// Only configuration errors stop the installation, everything else is handled within a tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConfigurationError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_errors_are_fatal() {
        assert!(ControlError::configuration("bad threshold").is_fatal());
        assert!(!ControlError::signal_unavailable(Signal::Temperature, "timeout").is_fatal());
        assert!(!ControlError::actuator_failure(&TargetId::new("gpio:18"), "io").is_fatal());
    }

    #[test]
    fn display_contains_reason() {
        let error = ControlError::signal_unavailable(Signal::Occupancy, "timed out after 500ms");

        assert_eq!(error.to_string(), "Occupancy signal unavailable: timed out after 500ms");
    }
}
