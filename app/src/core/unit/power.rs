use std::fmt::Display;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Nominal power draw of a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize, derive_more::From)]
#[serde(transparent)]
pub struct KiloWatt(pub f64);

/// Accumulated estimate. Never compared against metered consumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize, derive_more::From)]
#[serde(transparent)]
pub struct KiloWattHours(pub f64);

impl KiloWatt {
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }

    /// Energy attributed to one control tick, weighted by `factor`.
    pub fn scaled(self, factor: f64) -> KiloWattHours {
        KiloWattHours(self.0 * factor)
    }
}

impl KiloWattHours {
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

impl Add for KiloWatt {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::iter::Sum for KiloWatt {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl Add for KiloWattHours {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Display for KiloWatt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kW", self.0)
    }
}

impl Display for KiloWattHours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kWh", self.0)
    }
}
