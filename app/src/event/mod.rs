mod sink;

use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::automation::{SwitchTransition, TargetId};
use crate::core::time::DateTime;
use crate::error::ControlError;
use crate::home::RoomId;
use crate::t;

pub use sink::{BroadcastEventSink, FanOutEventSink, JsonLinesEventSink, MemoryEventSink, TracingEventSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    #[display("SYSTEM")]
    System,
    #[display("DETECTION")]
    Detection,
    #[display("IDLE")]
    Idle,
    #[display("TEMP")]
    Temp,
    #[display("ERROR")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    #[display("ON")]
    On,
    #[display("OFF")]
    Off,
}

impl PowerState {
    pub fn is_on(&self) -> bool {
        matches!(self, PowerState::On)
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on { PowerState::On } else { PowerState::Off }
    }
}

/// Append-only record consumed by reporting. Transition records carry both states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime,
    pub event_type: EventType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<PowerState>,
    #[serde(rename = "appliance_state_after")]
    pub state_after: Option<PowerState>,
}

impl EventRecord {
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            timestamp: t!(now),
            event_type,
            message: message.into(),
            room: None,
            target: None,
            previous_state: None,
            state_after: None,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(EventType::System, message)
    }

    pub fn error(error: &ControlError) -> Self {
        Self::new(EventType::Error, error.to_string())
    }

    pub fn transition(event_type: EventType, transition: &SwitchTransition, message: impl Into<String>) -> Self {
        Self {
            timestamp: transition.timestamp,
            target: Some(transition.target.clone()),
            previous_state: Some(transition.previous),
            state_after: Some(transition.new),
            ..Self::new(event_type, message)
        }
    }

    pub fn in_room(mut self, room: &RoomId) -> Self {
        self.room = Some(room.clone());
        self
    }

    pub fn with_state_after(mut self, state: PowerState) -> Self {
        self.state_after = Some(state);
        self
    }
}

impl Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: ", self.timestamp.format_local(), self.event_type)?;
        if let Some(room) = &self.room {
            write!(f, "{} - ", room)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(state) = &self.state_after {
            write!(f, " → State: {}", state)?;
        }
        Ok(())
    }
}

pub trait EventSink {
    fn publish(&self, record: EventRecord);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn publish(&self, record: EventRecord) {
        (**self).publish(record)
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn publish(&self, record: EventRecord) {
        (**self).publish(record)
    }
}
