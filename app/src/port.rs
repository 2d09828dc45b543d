#![allow(async_fn_in_trait)]

use anyhow::Result;

use crate::automation::TargetId;
use crate::core::unit::DegreeCelsius;
use crate::home::OccupancySample;

/// Pull-based source of the signals driving one room. Calls are wrapped in a timeout by the caller.
pub trait SignalSource {
    async fn occupancy_sample(&mut self) -> Result<OccupancySample>;

    /// `Ok(None)` when the sensor reports no reading.
    async fn temperature(&mut self) -> Result<Option<DegreeCelsius>>;
}

pub trait Actuator {
    async fn set_output(&self, target: &TargetId, on: bool) -> Result<()>;
}
