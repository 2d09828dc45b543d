use super::ControlMode;
use crate::core::time::Duration;
use crate::core::unit::DegreeCelsius;
use crate::error::ControlError;
use crate::t;

#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub tick_interval: Duration,
    pub signal_timeout: Duration,
    pub actuator_timeout: Duration,
    pub off_delay: Duration,
    pub temperature_threshold: DegreeCelsius,
    pub mode: ControlMode,
    pub savings_factor: f64,
    pub history_capacity: usize,
    /// Sweep manually controlled appliances of empty rooms off after every tick.
    pub turn_off_when_empty: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval: t!(1 seconds),
            signal_timeout: t!(500 millis),
            actuator_timeout: t!(500 millis),
            off_delay: t!(10 seconds),
            temperature_threshold: DegreeCelsius(28.0),
            mode: ControlMode::PresenceOnly,
            savings_factor: 0.1,
            history_capacity: 100,
            turn_off_when_empty: false,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.off_delay < Duration::zero() {
            return Err(ControlError::configuration(format!(
                "Off delay must not be negative, got {}",
                self.off_delay
            )));
        }

        if !self.temperature_threshold.is_plausible() {
            return Err(ControlError::configuration("Temperature threshold must be a finite number"));
        }

        if !(0.0..=1.0).contains(&self.savings_factor) {
            return Err(ControlError::configuration(format!(
                "Savings factor must be within [0, 1], got {}",
                self.savings_factor
            )));
        }

        if self.history_capacity == 0 {
            return Err(ControlError::configuration("History capacity must be at least 1"));
        }

        for (name, duration) in [
            ("Tick interval", self.tick_interval),
            ("Signal timeout", self.signal_timeout),
            ("Actuator timeout", self.actuator_timeout),
        ] {
            if duration <= Duration::zero() {
                return Err(ControlError::configuration(format!("{name} must be positive, got {duration}")));
            }
        }

        Ok(())
    }
}
