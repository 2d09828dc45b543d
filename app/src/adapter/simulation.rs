use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::unit::DegreeCelsius;
use crate::home::OccupancySample;
use crate::port::SignalSource;

/// Stand-in for the camera detector and the temperature sensor.
pub struct SimulatedSignalSource {
    rng: StdRng,
}

impl SimulatedSignalSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self { rng }
    }
}

impl SignalSource for SimulatedSignalSource {
    async fn occupancy_sample(&mut self) -> anyhow::Result<OccupancySample> {
        let confidence: f64 = self.rng.gen_range(0.7..0.95);
        let person_count = self.rng.gen_range(0..=3);
        let is_occupied = person_count > 0 && confidence > 0.5;

        Ok(OccupancySample::new(is_occupied, confidence, person_count))
    }

    async fn temperature(&mut self) -> anyhow::Result<Option<DegreeCelsius>> {
        Ok(Some(DegreeCelsius(25.0 + self.rng.gen_range(0.0..10.0))))
    }
}
