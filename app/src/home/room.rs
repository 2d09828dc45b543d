use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Appliance, ApplianceId};
use crate::core::BoundedHistory;
use crate::core::time::DateTime;
use crate::core::unit::{KiloWatt, Probability};
use crate::error::ControlError;
use crate::t;

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display, derive_more::From,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum OccupancyState {
    Occupied,
    Empty,
}

impl OccupancyState {
    pub fn from_detection(is_occupied: bool) -> Self {
        if is_occupied { Self::Occupied } else { Self::Empty }
    }
}

/// One reading of the occupancy detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancySample {
    pub is_occupied: bool,
    pub confidence: Probability,
    pub person_count: u32,
    pub timestamp: DateTime,
}

impl OccupancySample {
    pub fn new(is_occupied: bool, confidence: impl Into<Probability>, person_count: u32) -> Self {
        Self {
            is_occupied,
            confidence: confidence.into(),
            person_count,
            timestamp: t!(now),
        }
    }

    pub fn empty() -> Self {
        Self::new(false, 0.0, 0)
    }

    /// Occupied iff at least one person was counted, confidence within [0, 1].
    pub fn is_consistent(&self) -> bool {
        self.is_occupied == (self.person_count > 0) && self.confidence.is_within_bounds()
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    name: String,
    appliances: BTreeMap<ApplianceId, Appliance>,
    occupancy_state: OccupancyState,
    occupancy_confidence: Probability,
    person_count: u32,
    last_occupancy_check: DateTime,
    occupancy_history: BoundedHistory<OccupancySample>,
}

impl Room {
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>, history_capacity: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            appliances: BTreeMap::new(),
            occupancy_state: OccupancyState::Empty,
            occupancy_confidence: Probability::default(),
            person_count: 0,
            last_occupancy_check: t!(now),
            occupancy_history: BoundedHistory::new(history_capacity),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn occupancy_state(&self) -> OccupancyState {
        self.occupancy_state
    }

    pub fn is_occupied(&self) -> bool {
        self.occupancy_state == OccupancyState::Occupied
    }

    pub fn occupancy_confidence(&self) -> Probability {
        self.occupancy_confidence
    }

    pub fn person_count(&self) -> u32 {
        self.person_count
    }

    pub fn last_occupancy_check(&self) -> DateTime {
        self.last_occupancy_check
    }

    pub fn occupancy_history(&self) -> &BoundedHistory<OccupancySample> {
        &self.occupancy_history
    }

    /// The latest sample as the room knows it, used when the detector does not answer.
    pub fn current_sample(&self) -> OccupancySample {
        OccupancySample {
            is_occupied: self.is_occupied(),
            confidence: self.occupancy_confidence,
            person_count: self.person_count,
            timestamp: self.last_occupancy_check,
        }
    }

    pub fn update_occupancy(&mut self, is_occupied: bool, confidence: impl Into<Probability>, person_count: u32) {
        let sample = OccupancySample::new(is_occupied, confidence, person_count);

        if !sample.is_consistent() {
            tracing::warn!(
                room = %self.id,
                is_occupied,
                person_count,
                "Occupancy sample disagrees with its person count, storing as given"
            );
        }

        self.occupancy_state = OccupancyState::from_detection(sample.is_occupied);
        self.occupancy_confidence = sample.confidence;
        self.person_count = sample.person_count;
        self.last_occupancy_check = sample.timestamp;
        self.occupancy_history.push(sample);
    }

    pub fn appliances(&self) -> impl Iterator<Item = &Appliance> {
        self.appliances.values()
    }

    pub fn appliance(&self, id: &ApplianceId) -> Option<&Appliance> {
        self.appliances.get(id)
    }

    pub fn appliance_count(&self) -> usize {
        self.appliances.len()
    }

    pub fn appliances_on_count(&self) -> usize {
        self.appliances.values().filter(|a| a.is_on()).count()
    }

    pub fn add_appliance(&mut self, appliance: Appliance) -> Result<(), ControlError> {
        if self.appliances.contains_key(appliance.id()) {
            return Err(ControlError::configuration(format!(
                "Appliance {} already exists in room {}",
                appliance.id(),
                self.id
            )));
        }

        self.appliances.insert(appliance.id().clone(), appliance);
        Ok(())
    }

    pub fn remove_appliance(&mut self, id: &ApplianceId) -> Option<Appliance> {
        self.appliances.remove(id)
    }

    /// Returns the new state, `None` for unknown appliances.
    pub fn toggle_appliance(&mut self, id: &ApplianceId) -> Option<bool> {
        let appliance = self.appliances.get_mut(id)?;
        let new_state = !appliance.is_on();
        appliance.set(new_state);
        Some(new_state)
    }

    /// Returns the previous state, `None` for unknown appliances. Setting the current state again is a no-op.
    pub fn set_appliance(&mut self, id: &ApplianceId, on: bool) -> Option<bool> {
        self.appliances.get_mut(id).map(|appliance| appliance.set(on))
    }

    /// Instantaneous waste proxy: everything switched on while nobody is in the room.
    pub fn energy_waste(&self) -> KiloWatt {
        if self.is_occupied() || self.appliances_on_count() == 0 {
            return KiloWatt::zero();
        }

        self.appliances
            .values()
            .filter(|a| a.is_on())
            .map(|a| a.nominal_power())
            .sum()
    }
}
