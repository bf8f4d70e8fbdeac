//! Domain models for the Hospital Waste Tracking system

mod catalog;
mod label;
mod registro;
mod report;
mod scan;

pub use catalog::*;
pub use label::*;
pub use registro::*;
pub use report::*;
pub use scan::*;
