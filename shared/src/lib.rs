//! Shared types and domain logic for the Hospital Waste Tracking system
//!
//! This crate contains the pure parts of the domain: catalog types and
//! canonical lists, the label lifecycle, the report matrix builder, the
//! scanned QR payload parser, and weight unit conversion. Everything here
//! is I/O-free so it can be tested without a database.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
