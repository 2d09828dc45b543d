use std::collections::{BTreeMap, BTreeSet};

use super::{Command, ControlConfig, ControlMode, DebouncedSwitch, Decision, Reason, SwitchTransition, TargetId, decide};
use crate::core::time::Duration;
use crate::core::unit::DegreeCelsius;
use crate::error::{ControlError, Signal};
use crate::event::{EventRecord, EventSink, EventType};
use crate::home::{ApplianceId, OccupancySample, Room, RoomId};
use crate::port::{Actuator, SignalSource};

#[derive(Debug, Clone)]
pub struct RoomTickOutcome {
    pub room: RoomId,
    pub decision: Decision,
    pub transitions: usize,
    pub signal_failures: usize,
    pub actuator_failures: usize,
}

/// Drives the switches of one room from that room's signal source.
pub struct RoomController<S> {
    room: RoomId,
    source: S,
    switches: BTreeMap<ApplianceId, DebouncedSwitch>,
    unsynced: BTreeSet<ApplianceId>,
}

impl<S: SignalSource> RoomController<S> {
    pub fn new(room: RoomId, source: S) -> Self {
        Self {
            room,
            source,
            switches: BTreeMap::new(),
            unsynced: BTreeSet::new(),
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn add_switch(&mut self, appliance: ApplianceId, switch: DebouncedSwitch) {
        self.switches.insert(appliance, switch);
    }

    pub fn remove_switch(&mut self, appliance: &ApplianceId) -> Option<DebouncedSwitch> {
        self.unsynced.remove(appliance);
        self.switches.remove(appliance)
    }

    pub fn switch(&self, appliance: &ApplianceId) -> Option<&DebouncedSwitch> {
        self.switches.get(appliance)
    }

    pub fn controls(&self, appliance: &ApplianceId) -> bool {
        self.switches.contains_key(appliance)
    }

    /// Summed on-time of all switches of this room.
    pub fn on_time(&self) -> Duration {
        self.switches
            .values()
            .fold(Duration::zero(), |total, switch| total + switch.on_time())
    }

    /// Appliances whose last output write failed and will be re-sent next tick.
    pub fn pending_reconciliation(&self) -> impl Iterator<Item = &ApplianceId> {
        self.unsynced.iter()
    }

    #[tracing::instrument(skip_all, fields(room = %self.room))]
    pub async fn tick<A: Actuator, E: EventSink>(
        &mut self,
        room: &mut Room,
        config: &ControlConfig,
        actuator: &A,
        sink: &E,
    ) -> RoomTickOutcome {
        let mut signal_failures = 0;
        let mut actuator_failures = self.reconcile(config, actuator, sink).await;

        let sample = match self.read_occupancy(config.signal_timeout).await {
            Ok(sample) => {
                room.update_occupancy(sample.is_occupied, sample.confidence, sample.person_count);
                sample
            }
            Err(e) => {
                signal_failures += 1;
                report_error(sink, &self.room, &e);
                room.current_sample()
            }
        };

        let temperature = match config.mode {
            ControlMode::PresenceOnly => None,
            ControlMode::PresenceAndTemperature => match self.read_temperature(config.signal_timeout).await {
                Ok(temperature) => Some(temperature),
                Err(e) => {
                    signal_failures += 1;
                    report_error(sink, &self.room, &e);
                    None
                }
            },
        };

        let decision = decide(&sample, temperature, config.temperature_threshold, config.mode);
        tracing::debug!(?decision, occupied = sample.is_occupied, ?temperature, "Decision taken");

        let mut transitions = 0;
        for (appliance, switch) in self.switches.iter_mut() {
            let Some(transition) = switch.apply(decision.command) else {
                continue;
            };

            transitions += 1;
            room.set_appliance(appliance, transition.new.is_on());
            sink.publish(transition_record(appliance, &transition, &decision, &sample, config).in_room(&self.room));

            let written = push_output(&mut self.unsynced, &self.room, appliance, &transition, config, actuator, sink).await;
            if !written {
                actuator_failures += 1;
            }
        }

        RoomTickOutcome {
            room: self.room.clone(),
            decision,
            transitions,
            signal_failures,
            actuator_failures,
        }
    }

    /// Manual change of an automated appliance. Keeps room, switch and output in agreement and
    /// returns the previous state, `None` if the appliance has no switch here.
    pub async fn set_manually<A: Actuator, E: EventSink>(
        &mut self,
        room: &mut Room,
        appliance: &ApplianceId,
        on: bool,
        config: &ControlConfig,
        actuator: &A,
        sink: &E,
    ) -> Option<bool> {
        let previous = room.appliance(appliance)?.is_on();
        let transition = self.switches.get_mut(appliance)?.set_manually(on);
        room.set_appliance(appliance, on);

        if let Some(transition) = transition {
            sink.publish(
                EventRecord::transition(EventType::System, &transition, format!("{appliance} set manually"))
                    .in_room(&self.room),
            );
            push_output(&mut self.unsynced, &self.room, appliance, &transition, config, actuator, sink).await;
        }

        Some(previous)
    }

    async fn reconcile<A: Actuator, E: EventSink>(&mut self, config: &ControlConfig, actuator: &A, sink: &E) -> usize {
        let pending: Vec<ApplianceId> = self.unsynced.iter().cloned().collect();
        let mut failures = 0;

        for appliance in pending {
            let Some(switch) = self.switches.get(&appliance) else {
                self.unsynced.remove(&appliance);
                continue;
            };

            match write_output(actuator, config.actuator_timeout, switch.target(), switch.is_on()).await {
                Ok(()) => {
                    tracing::info!(output = %switch.target(), on = switch.is_on(), "Output reconciled");
                    self.unsynced.remove(&appliance);
                }
                Err(e) => {
                    failures += 1;
                    report_error(sink, &self.room, &e);
                }
            }
        }

        failures
    }

    async fn read_occupancy(&mut self, timeout: Duration) -> Result<OccupancySample, ControlError> {
        match tokio::time::timeout(timeout.into(), self.source.occupancy_sample()).await {
            Ok(Ok(sample)) => Ok(sample),
            Ok(Err(e)) => Err(ControlError::signal_unavailable(Signal::Occupancy, format!("{e:#}"))),
            Err(_) => Err(ControlError::signal_unavailable(
                Signal::Occupancy,
                format!("no sample within {timeout}"),
            )),
        }
    }

    async fn read_temperature(&mut self, timeout: Duration) -> Result<DegreeCelsius, ControlError> {
        match tokio::time::timeout(timeout.into(), self.source.temperature()).await {
            Ok(Ok(Some(temperature))) if temperature.is_plausible() => Ok(temperature),
            Ok(Ok(Some(temperature))) => Err(ControlError::signal_unavailable(
                Signal::Temperature,
                format!("invalid reading {}", temperature.0),
            )),
            Ok(Ok(None)) => Err(ControlError::signal_unavailable(Signal::Temperature, "no reading")),
            Ok(Err(e)) => Err(ControlError::signal_unavailable(Signal::Temperature, format!("{e:#}"))),
            Err(_) => Err(ControlError::signal_unavailable(
                Signal::Temperature,
                format!("no reading within {timeout}"),
            )),
        }
    }
}

async fn write_output<A: Actuator>(actuator: &A, timeout: Duration, target: &TargetId, on: bool) -> Result<(), ControlError> {
    match tokio::time::timeout(timeout.into(), actuator.set_output(target, on)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ControlError::actuator_failure(target, format!("{e:#}"))),
        Err(_) => Err(ControlError::actuator_failure(target, format!("no response within {timeout}"))),
    }
}

//failed writes stay marked until reconciled
async fn push_output<A: Actuator, E: EventSink>(
    unsynced: &mut BTreeSet<ApplianceId>,
    room: &RoomId,
    appliance: &ApplianceId,
    transition: &SwitchTransition,
    config: &ControlConfig,
    actuator: &A,
    sink: &E,
) -> bool {
    match write_output(actuator, config.actuator_timeout, &transition.target, transition.new.is_on()).await {
        Ok(()) => {
            unsynced.remove(appliance);
            true
        }
        Err(e) => {
            unsynced.insert(appliance.clone());
            report_error(sink, room, &e);
            false
        }
    }
}

fn report_error<E: EventSink>(sink: &E, room: &RoomId, error: &ControlError) {
    if error.is_fatal() {
        tracing::error!(%room, kind = %error.kind(), "{}", error);
    } else {
        tracing::warn!(%room, kind = %error.kind(), "{}", error);
    }
    sink.publish(EventRecord::error(error).in_room(room));
}

fn transition_record(
    appliance: &ApplianceId,
    transition: &SwitchTransition,
    decision: &Decision,
    sample: &OccupancySample,
    config: &ControlConfig,
) -> EventRecord {
    let threshold = config.temperature_threshold;

    let (event_type, message) = match (decision.command, decision.reason) {
        (Command::TurnOn, Reason::AboveThreshold(t)) => (
            EventType::Detection,
            format!("Human detected at {t} (above {threshold}), {appliance} on"),
        ),
        (Command::TurnOn, _) => (EventType::Detection, format!("Human detected, {appliance} on")),
        (Command::LetIdle, Reason::BelowThreshold(t)) => (
            EventType::Temp,
            format!("Temp {t} below threshold {threshold}, {appliance} off"),
        ),
        (Command::LetIdle, Reason::TemperatureUnavailable) if sample.is_occupied => (
            EventType::Temp,
            format!("No temperature reading, {appliance} off"),
        ),
        (Command::LetIdle, _) => (
            EventType::Idle,
            format!("No human detected for {}, {appliance} off", config.off_delay),
        ),
    };

    EventRecord::transition(event_type, transition, message)
}
