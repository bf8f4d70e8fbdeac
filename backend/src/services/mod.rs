//! Business logic services for the Hospital Waste Tracking backend

pub mod catalog;
pub mod ledger;
pub mod lot;
pub mod report;
pub mod settlement;

pub use catalog::CatalogService;
pub use ledger::LedgerService;
pub use lot::LotService;
pub use report::ReportService;
pub use settlement::SettlementService;
