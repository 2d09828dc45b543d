use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use super::*;
use crate::core::time::{DateTime, Duration, FIXED_NOW};
use crate::core::unit::{DegreeCelsius, KiloWatt};
use crate::event::{EventType, MemoryEventSink, PowerState};
use crate::home::{Appliance, ApplianceId, OccupancySample, Room, RoomId};
use crate::port::{Actuator, SignalSource};

#[derive(Debug, Clone, Default)]
struct SourceState {
    occupied: bool,
    temperature: Option<f64>,
    occupancy_fails: bool,
    occupancy_hangs: bool,
}

#[derive(Clone, Default)]
struct ScriptedSource(Arc<Mutex<SourceState>>);

impl ScriptedSource {
    fn occupied(&self, occupied: bool) {
        self.0.lock().unwrap().occupied = occupied;
    }

    fn temperature(&self, temperature: Option<f64>) {
        self.0.lock().unwrap().temperature = temperature;
    }

    fn occupancy_fails(&self, fails: bool) {
        self.0.lock().unwrap().occupancy_fails = fails;
    }

    fn occupancy_hangs(&self, hangs: bool) {
        self.0.lock().unwrap().occupancy_hangs = hangs;
    }
}

impl SignalSource for ScriptedSource {
    async fn occupancy_sample(&mut self) -> anyhow::Result<OccupancySample> {
        let state = self.0.lock().unwrap().clone();

        if state.occupancy_hangs {
            std::future::pending::<()>().await;
        }
        if state.occupancy_fails {
            anyhow::bail!("camera disconnected");
        }

        let persons = if state.occupied { 1 } else { 0 };
        Ok(OccupancySample::new(state.occupied, 0.9, persons))
    }

    async fn temperature(&mut self) -> anyhow::Result<Option<DegreeCelsius>> {
        let state = self.0.lock().unwrap().clone();
        Ok(state.temperature.map(DegreeCelsius))
    }
}

#[derive(Clone, Default)]
struct RecordingActuator {
    writes: Arc<Mutex<Vec<(TargetId, bool)>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingActuator {
    fn writes(&self) -> Vec<(TargetId, bool)> {
        self.writes.lock().unwrap().clone()
    }

    fn failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl Actuator for RecordingActuator {
    async fn set_output(&self, target: &TargetId, on: bool) -> anyhow::Result<()> {
        if *self.failing.lock().unwrap() {
            anyhow::bail!("relay not responding");
        }

        self.writes.lock().unwrap().push((target.clone(), on));
        Ok(())
    }
}

type TestInstallation = Installation<ScriptedSource, RecordingActuator, MemoryEventSink>;

fn at(seconds: i64) -> DateTime {
    DateTime::from_iso("2025-06-01T12:00:00Z").unwrap() + Duration::seconds(seconds)
}

fn config(mode: ControlMode) -> ControlConfig {
    ControlConfig {
        tick_interval: Duration::millis(10),
        signal_timeout: Duration::millis(50),
        actuator_timeout: Duration::millis(50),
        off_delay: Duration::seconds(10),
        mode,
        ..ControlConfig::default()
    }
}

fn living_room() -> Room {
    let mut room = Room::new("living_room", "Living Room", 100);
    room.add_appliance(Appliance::new("Fan", KiloWatt(0.075)).unwrap()).unwrap();
    room.add_appliance(Appliance::new("TV", KiloWatt(0.15)).unwrap()).unwrap();
    room
}

fn installation_with(config: ControlConfig) -> (TestInstallation, ScriptedSource, RecordingActuator) {
    let source = ScriptedSource::default();
    let actuator = RecordingActuator::default();
    let mut installation = Installation::new(config, actuator.clone(), MemoryEventSink::new(100)).unwrap();

    installation
        .add_room(
            living_room(),
            source.clone(),
            [(ApplianceId::new("Fan"), TargetId::new("gpio:18"))],
        )
        .unwrap();

    (installation, source, actuator)
}

fn installation(mode: ControlMode) -> (TestInstallation, ScriptedSource, RecordingActuator) {
    installation_with(config(mode))
}

async fn tick_at(installation: &mut TestInstallation, seconds: i64) -> TickSummary {
    FIXED_NOW.scope(at(seconds), installation.tick()).await
}

fn room_id() -> RoomId {
    RoomId::new("living_room")
}

fn fan() -> ApplianceId {
    ApplianceId::new("Fan")
}

fn events_of(installation: &TestInstallation, event_type: EventType) -> Vec<crate::event::EventRecord> {
    installation
        .sink()
        .all()
        .into_iter()
        .filter(|e| e.event_type == event_type)
        .collect()
}

#[tokio::test]
async fn occupied_room_turns_fan_on_and_off_after_delay() {
    let (mut installation, source, actuator) = installation(ControlMode::PresenceOnly);

    source.occupied(true);
    tick_at(&mut installation, 0).await;
    source.occupied(false);
    tick_at(&mut installation, 5).await;
    tick_at(&mut installation, 10).await;
    tick_at(&mut installation, 11).await;

    assert_eq!(
        actuator.writes(),
        vec![(TargetId::new("gpio:18"), true), (TargetId::new("gpio:18"), false)]
    );
    assert!(!installation.room(&room_id()).unwrap().appliance(&fan()).unwrap().is_on());

    let detections = events_of(&installation, EventType::Detection);
    let idles = events_of(&installation, EventType::Idle);
    assert_eq!(detections.len(), 1);
    assert_eq!(idles.len(), 1);
    assert_eq!(detections[0].previous_state, Some(PowerState::Off));
    assert_eq!(detections[0].state_after, Some(PowerState::On));
    assert_eq!(idles[0].timestamp, at(11));
}

#[tokio::test]
async fn staying_occupied_emits_no_further_transitions() {
    let (mut installation, source, actuator) = installation(ControlMode::PresenceOnly);

    source.occupied(true);
    for second in 0..5 {
        tick_at(&mut installation, second * 3).await;
    }

    assert_eq!(actuator.writes().len(), 1);
    assert_eq!(events_of(&installation, EventType::Detection).len(), 1);
    assert_eq!(installation.stats().detections, 5);
    assert_eq!(installation.stats().transitions, 1);
}

#[tokio::test]
async fn missing_temperature_fails_closed() {
    let (mut installation, source, actuator) = installation(ControlMode::PresenceAndTemperature);

    source.occupied(true);
    source.temperature(None);
    let summary = tick_at(&mut installation, 0).await;

    assert!(actuator.writes().is_empty());
    assert_eq!(summary.rooms[0].decision.reason, Reason::TemperatureUnavailable);
    assert_eq!(summary.rooms[0].signal_failures, 1);
    assert_eq!(events_of(&installation, EventType::Error).len(), 1);
    assert_eq!(installation.stats().degraded_ticks, 1);
}

#[tokio::test]
async fn cooling_below_threshold_switches_off_with_temp_event() {
    let (mut installation, source, _) = installation(ControlMode::PresenceAndTemperature);

    source.occupied(true);
    source.temperature(Some(31.0));
    tick_at(&mut installation, 0).await;
    source.temperature(Some(24.0));
    tick_at(&mut installation, 5).await;
    tick_at(&mut installation, 20).await;

    let temp_events = events_of(&installation, EventType::Temp);
    assert_eq!(events_of(&installation, EventType::Detection).len(), 1);
    assert_eq!(temp_events.len(), 1);
    assert_eq!(temp_events[0].state_after, Some(PowerState::Off));
}

#[tokio::test]
async fn failing_detector_keeps_last_known_occupancy() {
    let (mut installation, source, _) = installation(ControlMode::PresenceOnly);

    source.occupied(true);
    tick_at(&mut installation, 0).await;
    source.occupancy_fails(true);
    let summary = tick_at(&mut installation, 30).await;

    assert_eq!(summary.rooms[0].decision.command, Command::TurnOn);
    assert_eq!(summary.rooms[0].signal_failures, 1);
    assert!(installation.room(&room_id()).unwrap().is_occupied());
    assert_eq!(installation.room(&room_id()).unwrap().last_occupancy_check(), at(0));
}

#[tokio::test]
async fn hanging_detector_times_out() {
    let (mut installation, source, _) = installation(ControlMode::PresenceOnly);

    source.occupancy_hangs(true);
    let summary = tick_at(&mut installation, 0).await;

    assert_eq!(summary.rooms[0].signal_failures, 1);
    assert_eq!(summary.rooms[0].decision.command, Command::LetIdle);
    let errors = events_of(&installation, EventType::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].room, Some(room_id()));
}

#[tokio::test]
async fn failed_output_write_is_reconciled_next_tick() {
    let (mut installation, source, actuator) = installation(ControlMode::PresenceOnly);

    source.occupied(true);
    actuator.failing(true);
    let summary = tick_at(&mut installation, 0).await;

    assert_eq!(summary.rooms[0].actuator_failures, 1);
    assert!(installation.controller(&room_id()).unwrap().switch(&fan()).unwrap().is_on());
    assert_eq!(
        installation.controller(&room_id()).unwrap().pending_reconciliation().count(),
        1
    );

    actuator.failing(false);
    tick_at(&mut installation, 1).await;

    assert_eq!(actuator.writes(), vec![(TargetId::new("gpio:18"), true)]);
    assert_eq!(
        installation.controller(&room_id()).unwrap().pending_reconciliation().count(),
        0
    );
    assert_eq!(events_of(&installation, EventType::Detection).len(), 1);
}

#[tokio::test]
async fn ledger_credits_waste_in_empty_rooms() {
    let (mut installation, source, _) = installation(ControlMode::PresenceOnly);

    installation.set_appliance(&room_id(), &ApplianceId::new("TV"), true).await;
    source.occupied(false);

    let first = tick_at(&mut installation, 0).await;
    let second = tick_at(&mut installation, 1).await;

    assert!((first.savings.cumulative_savings.0 - 0.015).abs() < 1e-9);
    assert!(second.savings.cumulative_savings >= first.savings.cumulative_savings);
    assert_eq!(installation.ledger().history().len(), 2);

    let report = installation.report();
    assert_eq!(report.active_alerts.len(), 1);
    assert_eq!(report.active_alerts[0].room, room_id());
}

#[tokio::test]
async fn switch_off_empty_rooms_leaves_automated_appliances_alone() {
    let (mut installation, source, _) = installation(ControlMode::PresenceOnly);

    source.occupied(true);
    tick_at(&mut installation, 0).await;
    installation.set_appliance(&room_id(), &ApplianceId::new("TV"), true).await;
    source.occupied(false);
    tick_at(&mut installation, 1).await;

    let switched_off = installation.switch_off_empty_rooms();

    let room = installation.room(&room_id()).unwrap();
    assert_eq!(switched_off, 1);
    assert!(!room.appliance(&ApplianceId::new("TV")).unwrap().is_on());
    assert!(room.appliance(&fan()).unwrap().is_on());
}

#[tokio::test]
async fn removing_automated_appliance_drops_its_switch() {
    let (mut installation, source, actuator) = installation(ControlMode::PresenceOnly);

    let removed = installation.remove_appliance(&room_id(), &fan());
    source.occupied(true);
    tick_at(&mut installation, 0).await;

    assert!(removed.is_some());
    assert!(!installation.controller(&room_id()).unwrap().controls(&fan()));
    assert!(actuator.writes().is_empty());
}

#[tokio::test]
async fn manual_toggle_publishes_system_event() {
    let (mut installation, _, _) = installation(ControlMode::PresenceOnly);

    let new_state = installation.toggle_appliance(&room_id(), &ApplianceId::new("TV")).await;
    let unknown = installation.toggle_appliance(&room_id(), &ApplianceId::new("Sauna")).await;

    assert_eq!(new_state, Some(true));
    assert_eq!(unknown, None);
    let events = events_of(&installation, EventType::System);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].state_after, Some(PowerState::On));
}

#[test]
fn registration_errors() {
    let (mut installation, source, _) = installation(ControlMode::PresenceOnly);

    let duplicate = installation.add_room(living_room(), source.clone(), Vec::new());
    let unknown_appliance = installation.add_room(
        Room::new("office", "Office", 10),
        source,
        [(ApplianceId::new("Printer"), TargetId::new("office/Printer"))],
    );

    assert!(duplicate.is_err());
    assert!(unknown_appliance.is_err());
    assert_eq!(installation.rooms().len(), 1);
}

#[test]
fn invalid_config_is_rejected() {
    let config = ControlConfig {
        savings_factor: 1.5,
        ..ControlConfig::default()
    };

    let result: Result<TestInstallation, _> =
        Installation::new(config, RecordingActuator::default(), MemoryEventSink::new(10));

    assert!(result.is_err());
}

#[tokio::test]
async fn runner_stops_when_cancelled() {
    let (installation, source, actuator) = installation(ControlMode::PresenceOnly);
    source.occupied(true);

    let stop = CancellationToken::new();
    let runner = tokio::spawn({
        let stop = stop.clone();
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(35)).await;
            stop.cancel();
        }
    });

    let installation = AutomationRunner::new(installation).run(stop).await;
    runner.await.unwrap();

    assert!(installation.stats().ticks >= 1);
    assert_eq!(actuator.writes().len(), 1);

    let system = events_of(&installation, EventType::System);
    assert!(system.first().unwrap().message.starts_with("Control loop started"));
    assert!(system.iter().any(|e| e.message.starts_with("Session summary")));
    assert_eq!(system.last().unwrap().message, "Control loop stopped");
}

#[tokio::test]
async fn runner_with_cancelled_token_does_not_tick() {
    let (installation, _, actuator) = installation(ControlMode::PresenceOnly);
    let stop = CancellationToken::new();
    stop.cancel();

    let installation = AutomationRunner::new(installation).run(stop).await;

    assert_eq!(installation.stats().ticks, 0);
    assert!(actuator.writes().is_empty());
}

#[tokio::test]
async fn manual_on_of_automated_appliance_follows_debounce() {
    let (mut installation, source, actuator) = installation(ControlMode::PresenceOnly);
    source.occupied(false);

    let new_state = FIXED_NOW.scope(at(0), installation.toggle_appliance(&room_id(), &fan())).await;
    assert_eq!(new_state, Some(true));
    assert!(installation.controller(&room_id()).unwrap().switch(&fan()).unwrap().is_on());

    tick_at(&mut installation, 10).await;
    assert!(installation.room(&room_id()).unwrap().appliance(&fan()).unwrap().is_on());

    tick_at(&mut installation, 11).await;

    let room = installation.room(&room_id()).unwrap();
    assert!(!room.appliance(&fan()).unwrap().is_on());
    assert!(!installation.controller(&room_id()).unwrap().switch(&fan()).unwrap().is_on());
    assert_eq!(room.energy_waste(), KiloWatt::zero());
    assert_eq!(
        actuator.writes(),
        vec![(TargetId::new("gpio:18"), true), (TargetId::new("gpio:18"), false)]
    );
    assert!(installation.report().active_alerts.is_empty());
}

#[tokio::test]
async fn manual_off_of_automated_appliance_skips_delay() {
    let (mut installation, source, actuator) = installation(ControlMode::PresenceOnly);
    source.occupied(true);
    tick_at(&mut installation, 0).await;

    let previous = FIXED_NOW.scope(at(1), installation.set_appliance(&room_id(), &fan(), false)).await;

    assert_eq!(previous, Some(true));
    assert!(!installation.controller(&room_id()).unwrap().switch(&fan()).unwrap().is_on());
    assert_eq!(actuator.writes().last(), Some(&(TargetId::new("gpio:18"), false)));
}

#[tokio::test]
async fn failed_manual_write_is_reconciled() {
    let (mut installation, source, actuator) = installation(ControlMode::PresenceOnly);
    source.occupied(true);
    actuator.failing(true);

    FIXED_NOW.scope(at(0), installation.set_appliance(&room_id(), &fan(), true)).await;
    assert_eq!(installation.controller(&room_id()).unwrap().pending_reconciliation().count(), 1);

    actuator.failing(false);
    tick_at(&mut installation, 1).await;

    assert_eq!(actuator.writes(), vec![(TargetId::new("gpio:18"), true)]);
    assert_eq!(installation.controller(&room_id()).unwrap().pending_reconciliation().count(), 0);
}

#[tokio::test]
async fn turn_off_when_empty_sweeps_after_booking_savings() {
    let (mut installation, source, _) = installation_with(ControlConfig {
        turn_off_when_empty: true,
        ..config(ControlMode::PresenceOnly)
    });
    source.occupied(false);
    installation.set_appliance(&room_id(), &ApplianceId::new("TV"), true).await;

    let first = tick_at(&mut installation, 0).await;
    let second = tick_at(&mut installation, 1).await;

    assert_eq!(first.switched_off, 1);
    assert_eq!(second.switched_off, 0);
    assert!((second.savings.cumulative_savings.0 - 0.015).abs() < 1e-9);
    assert!(!installation.room(&room_id()).unwrap().appliance(&ApplianceId::new("TV")).unwrap().is_on());
    assert_eq!(installation.stats().switched_off_in_empty_rooms, 1);
}

#[tokio::test]
async fn rooms_follow_their_own_sources() {
    let actuator = RecordingActuator::default();
    let mut installation: TestInstallation =
        Installation::new(config(ControlMode::PresenceOnly), actuator.clone(), MemoryEventSink::new(100)).unwrap();

    let mut sources = vec![];
    for (id, appliance, power) in [
        ("living_room", "Fan", 0.075),
        ("bedroom_1", "Air Conditioner", 1.2),
        ("office", "Computer", 0.25),
    ] {
        let mut room = Room::new(id, id, 10);
        room.add_appliance(Appliance::new(appliance, KiloWatt(power)).unwrap()).unwrap();
        room.add_appliance(Appliance::new("Lights", KiloWatt(0.05)).unwrap()).unwrap();

        let source = ScriptedSource::default();
        installation
            .add_room(room, source.clone(), [(ApplianceId::new("Lights"), TargetId::new(format!("{id}/Lights")))])
            .unwrap();
        sources.push((RoomId::new(id), ApplianceId::new(appliance), source));
    }

    sources[0].2.occupied(true);
    for (room, appliance, _) in &sources[1..] {
        installation.set_appliance(room, appliance, true).await;
    }

    let summary = tick_at(&mut installation, 0).await;

    let lights = ApplianceId::new("Lights");
    let switched: Vec<bool> = sources
        .iter()
        .map(|(room, _, _)| installation.controller(room).unwrap().switch(&lights).unwrap().is_on())
        .collect();
    assert_eq!(switched, vec![true, false, false]);
    assert_eq!(actuator.writes(), vec![(TargetId::new("living_room/Lights"), true)]);

    assert!((summary.savings.waste_prevented.0 - 1.45).abs() < 1e-9);
    assert_eq!(summary.rooms.iter().map(|o| o.room.as_str()).collect::<Vec<_>>(), vec!["living_room", "bedroom_1", "office"]);

    let alerts: Vec<RoomId> = installation.report().active_alerts.into_iter().map(|a| a.room).collect();
    assert_eq!(alerts, vec![RoomId::new("bedroom_1"), RoomId::new("office")]);
}

#[tokio::test]
async fn installations_do_not_share_state() {
    let (mut first, first_source, first_actuator) = installation(ControlMode::PresenceOnly);
    let (mut second, second_source, second_actuator) = installation(ControlMode::PresenceOnly);
    first_source.occupied(true);
    second_source.occupied(false);

    FIXED_NOW
        .scope(at(0), async {
            tokio::join!(first.tick(), second.tick());
        })
        .await;

    assert_eq!(first_actuator.writes().len(), 1);
    assert!(second_actuator.writes().is_empty());
    assert_eq!(events_of(&first, EventType::Detection).len(), 1);
    assert!(events_of(&second, EventType::Detection).is_empty());
    assert_eq!(first.stats().detections, 1);
    assert_eq!(second.stats().detections, 0);
}

#[tokio::test]
async fn unavailable_temperature_in_empty_room_is_idle() {
    let (mut installation, source, _) = installation(ControlMode::PresenceAndTemperature);

    source.occupied(true);
    source.temperature(Some(31.0));
    tick_at(&mut installation, 0).await;
    source.occupied(false);
    source.temperature(None);
    tick_at(&mut installation, 20).await;

    let idles = events_of(&installation, EventType::Idle);
    assert_eq!(idles.len(), 1);
    assert_eq!(idles[0].state_after, Some(PowerState::Off));
    assert!(events_of(&installation, EventType::Temp).is_empty());
}

#[tokio::test]
async fn unavailable_temperature_in_occupied_room_is_temp() {
    let (mut installation, source, _) = installation(ControlMode::PresenceAndTemperature);

    source.occupied(true);
    source.temperature(Some(31.0));
    tick_at(&mut installation, 0).await;
    source.temperature(None);
    tick_at(&mut installation, 20).await;

    assert_eq!(events_of(&installation, EventType::Temp).len(), 1);
    assert!(events_of(&installation, EventType::Idle).is_empty());
}

#[tokio::test]
async fn session_summary_reports_switch_on_time() {
    let (mut installation, source, _) = installation(ControlMode::PresenceOnly);

    source.occupied(true);
    tick_at(&mut installation, 0).await;
    source.occupied(false);
    tick_at(&mut installation, 11).await;
    tick_at(&mut installation, 40).await;
    FIXED_NOW.sync_scope(at(40), || installation.publish_session_summary());

    assert_eq!(installation.stats().switch_on_seconds, 11.0);
    let summary = events_of(&installation, EventType::System).pop().unwrap();
    assert!(summary.message.contains("switches on for 11s"), "{}", summary.message);
}
