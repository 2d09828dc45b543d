use serde::Serialize;

use super::{EnergyAlert, EnergyLedger, SavingsEntry};
use crate::core::unit::KiloWattHours;
use crate::home::Room;

/// Read model for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyReport {
    pub total_energy_saved_kwh: KiloWattHours,
    pub recent_history: Vec<SavingsEntry>,
    pub active_alerts: Vec<EnergyAlert>,
    pub summary: HomeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeSummary {
    pub occupied_rooms: usize,
    pub total_rooms: usize,
    pub appliances_on: usize,
    pub total_appliances: usize,
    pub efficiency_rate_percent: f64,
}

impl EnergyReport {
    pub(super) fn new(ledger: &EnergyLedger, rooms: &[Room]) -> Self {
        Self {
            total_energy_saved_kwh: ledger.total_energy_saved(),
            recent_history: ledger.history().iter().cloned().collect(),
            active_alerts: ledger.alerts(rooms),
            summary: HomeSummary::from_rooms(rooms),
        }
    }
}

impl HomeSummary {
    pub fn from_rooms(rooms: &[Room]) -> Self {
        let total_appliances: usize = rooms.iter().map(Room::appliance_count).sum();
        let appliances_on: usize = rooms.iter().map(Room::appliances_on_count).sum();

        let efficiency_rate_percent = if total_appliances > 0 {
            (total_appliances - appliances_on) as f64 / total_appliances as f64 * 100.0
        } else {
            0.0
        };

        Self {
            occupied_rooms: rooms.iter().filter(|r| r.is_occupied()).count(),
            total_rooms: rooms.len(),
            appliances_on,
            total_appliances,
            efficiency_rate_percent,
        }
    }
}
