mod power;
mod probability;
mod temperature;

pub use power::{KiloWatt, KiloWattHours};
pub use probability::Probability;
pub use temperature::DegreeCelsius;
