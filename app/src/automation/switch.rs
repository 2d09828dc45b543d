use serde::{Deserialize, Serialize};

use super::Command;
use crate::core::time::{DateTime, Duration};
use crate::event::PowerState;
use crate::t;

/// Output a switch drives, e.g. `gpio:18` or `living_room/Fan`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display, derive_more::From,
)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchTransition {
    pub target: TargetId,
    pub previous: PowerState,
    pub new: PowerState,
    pub timestamp: DateTime,
}

/// Turns on immediately, turns off only once no activity was seen for longer than `off_delay`.
#[derive(Debug, Clone)]
pub struct DebouncedSwitch {
    target: TargetId,
    off_delay: Duration,
    is_on: bool,
    last_active_at: Option<DateTime>,
    on_since: Option<DateTime>,
    completed_on_time: Duration,
}

impl DebouncedSwitch {
    pub fn new(target: TargetId, off_delay: Duration) -> Self {
        Self {
            target,
            off_delay,
            is_on: false,
            last_active_at: None,
            on_since: None,
            completed_on_time: Duration::zero(),
        }
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn off_delay(&self) -> Duration {
        self.off_delay
    }

    pub fn last_active_at(&self) -> Option<DateTime> {
        self.last_active_at
    }

    pub fn request_on(&mut self) -> Option<SwitchTransition> {
        if self.is_on {
            return None;
        }

        self.is_on = true;
        self.on_since = Some(t!(now));
        Some(self.transition(PowerState::Off, PowerState::On))
    }

    pub fn mark_activity(&mut self) {
        self.last_active_at = Some(t!(now));
    }

    pub fn request_off_if_idle(&mut self) -> Option<SwitchTransition> {
        if !self.is_on || !self.is_idle() {
            return None;
        }

        Some(self.switch_off())
    }

    /// Manual override. Switching on counts as activity, switching off bypasses the delay.
    pub fn set_manually(&mut self, on: bool) -> Option<SwitchTransition> {
        if on {
            self.mark_activity();
            self.request_on()
        } else if self.is_on {
            Some(self.switch_off())
        } else {
            None
        }
    }

    /// Time spent on so far, including a running on-period.
    pub fn on_time(&self) -> Duration {
        match self.on_since {
            Some(on_since) => self.completed_on_time + t!(now).elapsed_since(on_since),
            None => self.completed_on_time,
        }
    }

    /// `TurnOn` refreshes activity before switching on, `LetIdle` never forces the switch off.
    pub fn apply(&mut self, command: Command) -> Option<SwitchTransition> {
        match command {
            Command::TurnOn => {
                self.mark_activity();
                self.request_on()
            }
            Command::LetIdle => self.request_off_if_idle(),
        }
    }

    //never active counts as idle forever
    fn is_idle(&self) -> bool {
        match self.last_active_at {
            Some(last_active_at) => t!(now).elapsed_since(last_active_at) > self.off_delay,
            None => true,
        }
    }

    fn switch_off(&mut self) -> SwitchTransition {
        if let Some(on_since) = self.on_since.take() {
            self.completed_on_time = self.completed_on_time + t!(now).elapsed_since(on_since);
        }

        self.is_on = false;
        self.transition(PowerState::On, PowerState::Off)
    }

    fn transition(&self, previous: PowerState, new: PowerState) -> SwitchTransition {
        SwitchTransition {
            target: self.target.clone(),
            previous,
            new,
            timestamp: t!(now),
        }
    }
}
