pub mod history;
pub mod time;
pub mod unit;

pub use history::BoundedHistory;
