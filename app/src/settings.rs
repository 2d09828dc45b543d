use std::collections::HashSet;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File, FileFormat};
use infrastructure::MonitoringConfig;
use serde::Deserialize;

use crate::automation::{ControlConfig, ControlMode, TargetId};
use crate::core::time::Duration;
use crate::core::unit::{DegreeCelsius, KiloWatt};
use crate::error::ControlError;
use crate::home::{Appliance, ApplianceId, Room};

#[derive(Debug, Deserialize)]
#[allow(unused)]
pub struct Settings {
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub control: ControlSettings,
    #[serde(default)]
    pub event_log: EventLogSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub rooms: Vec<RoomSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config.toml"))
            .add_source(Environment::with_prefix("OCCUPANCY").separator("__"));

        let s = builder.build()?;
        s.try_deserialize()
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn control_config(&self) -> Result<ControlConfig, ControlError> {
        ControlConfig::try_from(&self.control)
    }

    /// Rooms in configuration order, each with the appliances that get a debounced switch.
    pub fn rooms(&self, history_capacity: usize) -> Result<Vec<(Room, Vec<(ApplianceId, TargetId)>)>, ControlError> {
        let mut seen = HashSet::new();
        let mut rooms = vec![];

        for room_settings in &self.rooms {
            if !seen.insert(room_settings.id.as_str()) {
                return Err(ControlError::configuration(format!(
                    "Duplicate room id {}",
                    room_settings.id
                )));
            }
            rooms.push(room_settings.build(history_capacity)?);
        }

        Ok(rooms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub tick_interval_millis: u64,
    pub signal_timeout_millis: u64,
    pub actuator_timeout_millis: u64,
    pub off_delay_seconds: f64,
    pub temperature_threshold_celsius: f64,
    pub mode: ControlMode,
    pub savings_factor: f64,
    pub history_capacity: usize,
    pub turn_off_when_empty: bool,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            tick_interval_millis: 1000,
            signal_timeout_millis: 500,
            actuator_timeout_millis: 500,
            off_delay_seconds: 10.0,
            temperature_threshold_celsius: 28.0,
            mode: ControlMode::PresenceOnly,
            savings_factor: 0.1,
            history_capacity: 100,
            turn_off_when_empty: false,
        }
    }
}

impl TryFrom<&ControlSettings> for ControlConfig {
    type Error = ControlError;

    fn try_from(settings: &ControlSettings) -> Result<Self, Self::Error> {
        if !settings.off_delay_seconds.is_finite() || settings.off_delay_seconds < 0.0 {
            return Err(ControlError::configuration(format!(
                "off_delay_seconds must be a non-negative number, got {}",
                settings.off_delay_seconds
            )));
        }

        let config = ControlConfig {
            tick_interval: Duration::millis(settings.tick_interval_millis as i64),
            signal_timeout: Duration::millis(settings.signal_timeout_millis as i64),
            actuator_timeout: Duration::millis(settings.actuator_timeout_millis as i64),
            off_delay: Duration::from_secs_f64(settings.off_delay_seconds),
            temperature_threshold: DegreeCelsius(settings.temperature_threshold_celsius),
            mode: settings.mode,
            savings_factor: settings.savings_factor,
            history_capacity: settings.history_capacity,
            turn_off_when_empty: settings.turn_off_when_empty,
        };

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventLogSettings {
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub console: bool,
    #[serde(default = "default_recent_events")]
    pub recent_events: usize,
}

impl Default for EventLogSettings {
    fn default() -> Self {
        Self {
            path: None,
            console: false,
            recent_events: default_recent_events(),
        }
    }
}

fn default_recent_events() -> usize {
    100
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationSettings {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSettings {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub appliances: Vec<ApplianceSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplianceSettings {
    pub name: String,
    pub nominal_power_kw: f64,
    #[serde(default)]
    pub automated: bool,
    pub output: Option<String>,
}

impl RoomSettings {
    fn build(&self, history_capacity: usize) -> Result<(Room, Vec<(ApplianceId, TargetId)>), ControlError> {
        let name = self.name.clone().unwrap_or_else(|| display_name(&self.id));
        let mut room = Room::new(self.id.as_str(), name, history_capacity);
        let mut automated = vec![];

        for appliance in &self.appliances {
            room.add_appliance(Appliance::new(appliance.name.as_str(), KiloWatt(appliance.nominal_power_kw))?)?;

            if appliance.automated {
                let target = appliance
                    .output
                    .clone()
                    .unwrap_or_else(|| format!("{}/{}", self.id, appliance.name));
                automated.push((ApplianceId::new(appliance.name.as_str()), TargetId::new(target)));
            }
        }

        Ok((room, automated))
    }
}

//living_room -> Living Room
fn display_name(id: &str) -> String {
    id.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
