mod appliance;
mod room;

pub use appliance::{Appliance, ApplianceId};
pub use room::{OccupancySample, OccupancyState, Room, RoomId};
