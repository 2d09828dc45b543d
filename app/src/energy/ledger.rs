use serde::{Deserialize, Serialize};

use super::EnergyReport;
use crate::core::BoundedHistory;
use crate::core::time::DateTime;
use crate::core::unit::{KiloWatt, KiloWattHours};
use crate::home::{Room, RoomId};
use crate::t;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsEntry {
    pub timestamp: DateTime,
    pub cumulative_savings: KiloWattHours,
    pub waste_prevented: KiloWattHours,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyAlert {
    pub room: RoomId,
    pub room_name: String,
    pub waste: KiloWatt,
    pub appliances_on_count: usize,
    pub timestamp: DateTime,
}

/// Accumulates savings from the waste observed across rooms. The total never decreases.
///
/// One tick counts as one unit of time: the instantaneous waste in kW is booked as kWh per tick.
#[derive(Debug, Clone)]
pub struct EnergyLedger {
    savings_factor: f64,
    total_energy_saved: KiloWattHours,
    history: BoundedHistory<SavingsEntry>,
}

impl EnergyLedger {
    pub fn new(savings_factor: f64, history_capacity: usize) -> Self {
        Self {
            savings_factor,
            total_energy_saved: KiloWattHours::zero(),
            history: BoundedHistory::new(history_capacity),
        }
    }

    pub fn total_energy_saved(&self) -> KiloWattHours {
        self.total_energy_saved
    }

    pub fn history(&self) -> &BoundedHistory<SavingsEntry> {
        &self.history
    }

    pub fn tick(&mut self, rooms: &[Room]) -> SavingsEntry {
        let total_waste: KiloWatt = rooms.iter().map(Room::energy_waste).sum();

        let credited = total_waste.scaled(self.savings_factor);
        if credited.is_positive() {
            self.total_energy_saved = self.total_energy_saved + credited;
        } else if credited != KiloWattHours::zero() {
            tracing::warn!(total_waste = total_waste.0, credited = credited.0, "Ignoring invalid savings credit");
        }

        let entry = SavingsEntry {
            timestamp: t!(now),
            cumulative_savings: self.total_energy_saved,
            waste_prevented: total_waste.scaled(1.0),
        };

        tracing::debug!(
            total_waste = total_waste.0,
            total_saved = self.total_energy_saved.0,
            "Energy ledger updated"
        );

        self.history.push(entry.clone());
        entry
    }

    /// One alert per wasting room, in the order the rooms are given.
    pub fn alerts(&self, rooms: &[Room]) -> Vec<EnergyAlert> {
        rooms
            .iter()
            .filter_map(|room| {
                let waste = room.energy_waste();
                (waste.0 > 0.0).then(|| EnergyAlert {
                    room: room.id().clone(),
                    room_name: room.name().to_string(),
                    waste,
                    appliances_on_count: room.appliances_on_count(),
                    timestamp: room.last_occupancy_check(),
                })
            })
            .collect()
    }

    pub fn report(&self, rooms: &[Room]) -> EnergyReport {
        EnergyReport::new(self, rooms)
    }
}
