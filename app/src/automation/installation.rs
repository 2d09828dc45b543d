use futures::future::join_all;
use serde::Serialize;

use super::{Command, ControlConfig, DebouncedSwitch, RoomController, RoomTickOutcome, TargetId};
use crate::core::time::Duration;
use crate::core::unit::KiloWattHours;
use crate::energy::{EnergyLedger, EnergyReport, SavingsEntry};
use crate::error::ControlError;
use crate::event::{EventRecord, EventSink, EventType, PowerState};
use crate::home::{Appliance, ApplianceId, Room, RoomId};
use crate::port::{Actuator, SignalSource};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub detections: u64,
    pub degraded_ticks: u64,
    pub transitions: u64,
    pub signal_failures: u64,
    pub actuator_failures: u64,
    pub switched_off_in_empty_rooms: u64,
    pub switch_on_seconds: f64,
}

impl SessionStats {
    fn record(&mut self, outcomes: &[RoomTickOutcome]) {
        self.ticks += 1;
        if outcomes.iter().any(|o| o.decision.is_degraded() || o.signal_failures > 0) {
            self.degraded_ticks += 1;
        }

        for outcome in outcomes {
            if outcome.decision.command == Command::TurnOn {
                self.detections += 1;
            }
            self.transitions += outcome.transitions as u64;
            self.signal_failures += outcome.signal_failures as u64;
            self.actuator_failures += outcome.actuator_failures as u64;
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickSummary {
    pub rooms: Vec<RoomTickOutcome>,
    pub savings: SavingsEntry,
    pub switched_off: usize,
}

/// Everything one site needs: rooms, their controllers, the ledger and the collaborators.
/// Rooms keep their registration order.
pub struct Installation<S, A, E> {
    config: ControlConfig,
    rooms: Vec<Room>,
    controllers: Vec<RoomController<S>>,
    ledger: EnergyLedger,
    actuator: A,
    sink: E,
    stats: SessionStats,
}

impl<S, A, E> Installation<S, A, E>
where
    S: SignalSource,
    A: Actuator,
    E: EventSink,
{
    pub fn new(config: ControlConfig, actuator: A, sink: E) -> Result<Self, ControlError> {
        config.validate()?;

        Ok(Self {
            ledger: EnergyLedger::new(config.savings_factor, config.history_capacity),
            config,
            rooms: vec![],
            controllers: vec![],
            actuator,
            sink,
            stats: SessionStats::default(),
        })
    }

    /// `automated` lists the appliances driven by a debounced switch and the output each one writes to.
    pub fn add_room(
        &mut self,
        room: Room,
        source: S,
        automated: impl IntoIterator<Item = (ApplianceId, TargetId)>,
    ) -> Result<(), ControlError> {
        if self.rooms.iter().any(|r| r.id() == room.id()) {
            return Err(ControlError::configuration(format!("Room {} registered twice", room.id())));
        }

        let mut controller = RoomController::new(room.id().clone(), source);
        for (appliance, target) in automated {
            if room.appliance(&appliance).is_none() {
                return Err(ControlError::configuration(format!(
                    "Automated appliance {} does not exist in room {}",
                    appliance,
                    room.id()
                )));
            }
            controller.add_switch(appliance, DebouncedSwitch::new(target, self.config.off_delay));
        }

        tracing::info!(room = %room.id(), appliances = room.appliance_count(), "Room registered");
        self.rooms.push(room);
        self.controllers.push(controller);
        Ok(())
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id() == id)
    }

    pub fn controller(&self, id: &RoomId) -> Option<&RoomController<S>> {
        self.controllers.iter().find(|c| c.room() == id)
    }

    pub fn ledger(&self) -> &EnergyLedger {
        &self.ledger
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    /// One pass over all rooms followed by the ledger update. Rooms are ticked concurrently.
    #[tracing::instrument(skip_all)]
    pub async fn tick(&mut self) -> TickSummary {
        let config = &self.config;
        let actuator = &self.actuator;
        let sink = &self.sink;

        let outcomes = join_all(
            self.rooms
                .iter_mut()
                .zip(self.controllers.iter_mut())
                .map(|(room, controller)| controller.tick(room, config, actuator, sink)),
        )
        .await;

        //ledger books the waste before the sweep removes it
        let savings = self.ledger.tick(&self.rooms);
        let switched_off = if self.config.turn_off_when_empty {
            self.switch_off_empty_rooms()
        } else {
            0
        };

        self.stats.record(&outcomes);
        self.stats.switched_off_in_empty_rooms += switched_off as u64;
        self.stats.switch_on_seconds = self.switch_on_time().as_secs_f64();

        TickSummary {
            rooms: outcomes,
            savings,
            switched_off,
        }
    }

    pub fn report(&self) -> EnergyReport {
        self.ledger.report(&self.rooms)
    }

    /// Returns the new state.
    pub async fn toggle_appliance(&mut self, room: &RoomId, appliance: &ApplianceId) -> Option<bool> {
        let new_state = !self.room(room)?.appliance(appliance)?.is_on();
        self.set_appliance(room, appliance, new_state).await?;
        Some(new_state)
    }

    /// Returns the previous state. Automated appliances are switched through their controller
    /// so the switch and the output follow the manual change.
    pub async fn set_appliance(&mut self, room: &RoomId, appliance: &ApplianceId, on: bool) -> Option<bool> {
        let index = self.rooms.iter().position(|r| r.id() == room)?;
        let room = &mut self.rooms[index];
        let controller = &mut self.controllers[index];

        if controller.controls(appliance) {
            return controller
                .set_manually(room, appliance, on, &self.config, &self.actuator, &self.sink)
                .await;
        }

        let previous = room.set_appliance(appliance, on)?;

        if previous != on {
            self.sink.publish(
                EventRecord::system(format!("{appliance} set manually"))
                    .in_room(room.id())
                    .with_state_after(PowerState::from(on)),
            );
        }
        Some(previous)
    }

    pub fn add_appliance(&mut self, room: &RoomId, appliance: Appliance) -> Result<(), ControlError> {
        let room = self
            .rooms
            .iter_mut()
            .find(|r| r.id() == room)
            .ok_or_else(|| ControlError::configuration(format!("Unknown room {room}")))?;

        room.add_appliance(appliance)
    }

    /// Removing an automated appliance also drops its switch.
    pub fn remove_appliance(&mut self, room: &RoomId, appliance: &ApplianceId) -> Option<Appliance> {
        if let Some(controller) = self.controllers.iter_mut().find(|c| c.room() == room) {
            controller.remove_switch(appliance);
        }

        self.rooms.iter_mut().find(|r| r.id() == room)?.remove_appliance(appliance)
    }

    /// Turns off every manually controlled appliance in empty rooms. Automated appliances stay with their switch.
    pub fn switch_off_empty_rooms(&mut self) -> usize {
        let mut switched_off = 0;

        for (room, controller) in self.rooms.iter_mut().zip(self.controllers.iter()) {
            if room.is_occupied() {
                continue;
            }

            let candidates: Vec<ApplianceId> = room
                .appliances()
                .filter(|a| a.is_on() && !controller.controls(a.id()))
                .map(|a| a.id().clone())
                .collect();

            for appliance in candidates {
                room.set_appliance(&appliance, false);
                switched_off += 1;
                self.sink.publish(
                    EventRecord::new(EventType::Idle, format!("{appliance} turned off in empty room"))
                        .in_room(room.id())
                        .with_state_after(PowerState::Off),
                );
            }
        }

        switched_off
    }

    /// Summed on-time of every automated appliance.
    pub fn switch_on_time(&self) -> Duration {
        self.controllers
            .iter()
            .fold(Duration::zero(), |total, controller| total + controller.on_time())
    }

    pub fn publish(&self, record: EventRecord) {
        self.sink.publish(record);
    }

    pub fn publish_session_summary(&self) {
        let stats = &self.stats;
        let saved: KiloWattHours = self.ledger.total_energy_saved();

        self.sink.publish(EventRecord::system(format!(
            "Session summary: {} ticks, {} detections, {} transitions, {} degraded ticks, switches on for {}, energy saved (estimated) {}",
            stats.ticks,
            stats.detections,
            stats.transitions,
            stats.degraded_ticks,
            self.switch_on_time(),
            saved
        )));
    }
}
