mod config;
mod controller;
mod installation;
mod policy;
mod switch;
#[cfg(test)]
mod tests;

pub use config::ControlConfig;
pub use controller::{RoomController, RoomTickOutcome};
pub use installation::{Installation, SessionStats, TickSummary};
pub use policy::{Command, ControlMode, Decision, Reason, decide};
pub use switch::{DebouncedSwitch, SwitchTransition, TargetId};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::event::{EventRecord, EventSink};
use crate::port::{Actuator, SignalSource};

pub struct AutomationRunner<S, A, E> {
    installation: Installation<S, A, E>,
}

impl<S, A, E> AutomationRunner<S, A, E>
where
    S: SignalSource,
    A: Actuator,
    E: EventSink,
{
    pub fn new(installation: Installation<S, A, E>) -> Self {
        Self { installation }
    }

    /// Ticks until `stop` is cancelled. Cancellation is only observed between ticks.
    pub async fn run(mut self, stop: CancellationToken) -> Installation<S, A, E> {
        let tick_interval = self.installation.config().tick_interval;
        let mut timer = tokio::time::interval(tick_interval.into());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(rooms = self.installation.rooms().len(), interval = %tick_interval, "Starting control loop");
        self.installation.publish(EventRecord::system(format!(
            "Control loop started in {} mode with {} rooms",
            self.installation.config().mode,
            self.installation.rooms().len()
        )));

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = timer.tick() => {},
            }

            let summary = self.installation.tick().await;

            for outcome in summary.rooms.iter().filter(|o| o.transitions > 0) {
                tracing::debug!(room = %outcome.room, transitions = outcome.transitions, "Room switched");
            }
            if summary.switched_off > 0 {
                tracing::info!(appliances = summary.switched_off, "Switched off appliances in empty rooms");
            }
            tracing::trace!(saved = %summary.savings.cumulative_savings, "Tick completed");
        }

        tracing::info!("Control loop stopped");
        self.installation.publish_session_summary();
        self.installation.publish(EventRecord::system("Control loop stopped"));

        self.installation
    }
}
