use serde::{Deserialize, Serialize};

use crate::core::unit::KiloWatt;
use crate::error::ControlError;

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display, derive_more::From,
)]
#[serde(transparent)]
pub struct ApplianceId(String);

impl ApplianceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ApplianceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appliance {
    id: ApplianceId,
    is_on: bool,
    nominal_power: KiloWatt,
}

impl Appliance {
    pub fn new(id: impl Into<ApplianceId>, nominal_power: KiloWatt) -> Result<Self, ControlError> {
        let id = id.into();

        if !nominal_power.is_valid() {
            return Err(ControlError::configuration(format!(
                "Nominal power of appliance {} must be a non-negative number, got {}",
                id, nominal_power.0
            )));
        }

        Ok(Self {
            id,
            is_on: false,
            nominal_power,
        })
    }

    pub fn id(&self) -> &ApplianceId {
        &self.id
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn nominal_power(&self) -> KiloWatt {
        self.nominal_power
    }

    pub(super) fn set(&mut self, on: bool) -> bool {
        let previous = self.is_on;
        self.is_on = on;
        previous
    }
}
