mod actuator;
mod simulation;

pub use actuator::LoggingActuator;
pub use simulation::SimulatedSignalSource;
