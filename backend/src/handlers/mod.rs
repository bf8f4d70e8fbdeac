//! HTTP handlers for the Hospital Waste Tracking API

mod catalog;
mod health;
mod ledger;
mod lot;
mod report;
mod settlement;

pub use catalog::*;
pub use health::*;
pub use ledger::*;
pub use lot::*;
pub use report::*;
pub use settlement::*;
