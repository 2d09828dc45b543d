use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize, derive_more::From)]
#[serde(transparent)]
pub struct DegreeCelsius(pub f64);

impl DegreeCelsius {
    /// NaN and infinite readings come from broken sensors.
    pub fn is_plausible(&self) -> bool {
        self.0.is_finite()
    }
}

impl Display for DegreeCelsius {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} °C", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_readings_are_implausible() {
        assert!(DegreeCelsius(-12.5).is_plausible());
        assert!(!DegreeCelsius(f64::NAN).is_plausible());
        assert!(!DegreeCelsius(f64::INFINITY).is_plausible());
    }

    #[test]
    fn display_one_decimal() {
        assert_eq!(DegreeCelsius(28.04).to_string(), "28.0 °C");
    }
}
