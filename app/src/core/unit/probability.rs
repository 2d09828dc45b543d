use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Stored as given, the producer is expected to stay within [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Probability(f64);

impl Probability {
    pub fn is_within_bounds(&self) -> bool {
        (0.0..=1.0).contains(&self.0)
    }
}

impl From<Probability> for f64 {
    fn from(value: Probability) -> Self {
        value.0
    }
}

impl From<f64> for Probability {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Display for Probability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0 * 100.0)
    }
}
