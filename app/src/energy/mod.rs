mod ledger;
mod report;

pub use ledger::{EnergyAlert, EnergyLedger, SavingsEntry};
pub use report::{EnergyReport, HomeSummary};
