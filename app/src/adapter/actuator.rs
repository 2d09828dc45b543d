use crate::automation::TargetId;
use crate::port::Actuator;

/// Used when no hardware output is attached.
pub struct LoggingActuator;

impl Actuator for LoggingActuator {
    async fn set_output(&self, target: &TargetId, on: bool) -> anyhow::Result<()> {
        tracing::info!(output = %target, on, "Output set");
        Ok(())
    }
}
