use serde::{Deserialize, Serialize};

use crate::core::unit::DegreeCelsius;
use crate::home::OccupancySample;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    #[default]
    #[display("PresenceOnly")]
    PresenceOnly,
    #[display("PresenceAndTemperature")]
    PresenceAndTemperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TurnOn,
    LetIdle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reason {
    Occupied,
    Unoccupied,
    AboveThreshold(DegreeCelsius),
    BelowThreshold(DegreeCelsius),
    TemperatureUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub command: Command,
    pub reason: Reason,
}

impl Decision {
    fn turn_on(reason: Reason) -> Self {
        Self {
            command: Command::TurnOn,
            reason,
        }
    }

    fn let_idle(reason: Reason) -> Self {
        Self {
            command: Command::LetIdle,
            reason,
        }
    }

    /// Decision was taken without the signals the mode requires.
    pub fn is_degraded(&self) -> bool {
        matches!(self.reason, Reason::TemperatureUnavailable)
    }
}

/// Missing temperature fails closed in `PresenceAndTemperature`, independent of occupancy.
pub fn decide(
    occupancy: &OccupancySample,
    temperature: Option<DegreeCelsius>,
    threshold: DegreeCelsius,
    mode: ControlMode,
) -> Decision {
    match mode {
        ControlMode::PresenceOnly if occupancy.is_occupied => Decision::turn_on(Reason::Occupied),
        ControlMode::PresenceOnly => Decision::let_idle(Reason::Unoccupied),

        ControlMode::PresenceAndTemperature => match temperature {
            None => Decision::let_idle(Reason::TemperatureUnavailable),
            Some(_) if !occupancy.is_occupied => Decision::let_idle(Reason::Unoccupied),
            Some(t) if t > threshold => Decision::turn_on(Reason::AboveThreshold(t)),
            Some(t) => Decision::let_idle(Reason::BelowThreshold(t)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied(is_occupied: bool) -> OccupancySample {
        OccupancySample::new(is_occupied, 0.9, if is_occupied { 1 } else { 0 })
    }

    const THRESHOLD: DegreeCelsius = DegreeCelsius(28.0);

    #[test]
    fn presence_only_follows_occupancy() {
        let on = decide(&occupied(true), None, THRESHOLD, ControlMode::PresenceOnly);
        let idle = decide(&occupied(false), Some(DegreeCelsius(35.0)), THRESHOLD, ControlMode::PresenceOnly);

        assert_eq!(on.command, Command::TurnOn);
        assert_eq!(idle.command, Command::LetIdle);
        assert!(!on.is_degraded());
    }

    #[test]
    fn warm_and_occupied_turns_on() {
        let decision = decide(
            &occupied(true),
            Some(DegreeCelsius(29.0)),
            THRESHOLD,
            ControlMode::PresenceAndTemperature,
        );

        assert_eq!(decision.command, Command::TurnOn);
        assert_eq!(decision.reason, Reason::AboveThreshold(DegreeCelsius(29.0)));
    }

    #[test]
    fn cool_and_occupied_lets_idle() {
        let decision = decide(
            &occupied(true),
            Some(DegreeCelsius(27.0)),
            THRESHOLD,
            ControlMode::PresenceAndTemperature,
        );

        assert_eq!(decision.command, Command::LetIdle);
        assert_eq!(decision.reason, Reason::BelowThreshold(DegreeCelsius(27.0)));
    }

    #[test]
    fn exactly_at_threshold_lets_idle() {
        let decision = decide(&occupied(true), Some(THRESHOLD), THRESHOLD, ControlMode::PresenceAndTemperature);

        assert_eq!(decision.command, Command::LetIdle);
    }

    #[test]
    fn warm_but_empty_lets_idle() {
        let decision = decide(
            &occupied(false),
            Some(DegreeCelsius(31.0)),
            THRESHOLD,
            ControlMode::PresenceAndTemperature,
        );

        assert_eq!(decision.command, Command::LetIdle);
        assert_eq!(decision.reason, Reason::Unoccupied);
    }

    #[test]
    fn missing_temperature_fails_closed() {
        for is_occupied in [true, false] {
            let decision = decide(&occupied(is_occupied), None, THRESHOLD, ControlMode::PresenceAndTemperature);

            assert_eq!(decision.command, Command::LetIdle);
            assert!(decision.is_degraded());
        }
    }
}
