pub mod adapter;
pub mod automation;
pub mod core;
pub mod energy;
pub mod error;
pub mod event;
pub mod home;
pub mod port;
pub mod settings;
