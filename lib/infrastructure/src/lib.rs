mod bus;
mod monitoring;

pub use bus::{EventBus, EventEmitter, EventListener};
pub use monitoring::{EnvFilterConfig, MonitoringConfig};
