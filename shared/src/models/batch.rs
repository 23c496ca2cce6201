//! Batch models
//!
//! A batch is a quantity of one product at one warehouse. Quantity is a
//! non-negative unit count; a batch that reaches zero stays queryable and
//! is never deleted automatically.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A quantity of one product held at one warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Human-readable code, shared by batches of the same receipt
    pub batch_code: Option<String>,
    pub quantity: i32,
    pub expiration_date: Option<NaiveDate>,
    pub cost_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes carried by stock entering a warehouse
///
/// Used both by entry movements (create-on-receipt) and by transfer
/// completion, which copies the source batch attributes to the
/// destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchAttributes {
    pub batch_code: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub cost_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
}
