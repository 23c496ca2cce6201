//! Shared types and domain logic for the Warehouse Inventory Management Platform
//!
//! This crate contains the models and pure engine logic shared between the
//! backend and other components of the system: status machines, batch
//! sourcing, scan matching and discrepancy classification.

pub mod models;
pub mod reconciliation;
pub mod sourcing;
pub mod validation;

pub use models::*;
pub use reconciliation::*;
pub use sourcing::*;
pub use validation::*;
