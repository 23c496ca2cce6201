//! Domain models for the Warehouse Inventory Management Platform

mod batch;
mod movement;
mod product;
mod transfer;
mod warehouse;

pub use batch::*;
pub use movement::*;
pub use product::*;
pub use transfer::*;
pub use warehouse::*;
