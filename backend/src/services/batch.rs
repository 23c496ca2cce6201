//! Batch ledger service: the sole owner of batch quantity mutation
//!
//! Every quantity change in the system goes through this module:
//! deductions via `reserve_and_deduct`, receipts via `increment`
//! (match-or-create on batch code) and transfer-cancel reversals via
//! `restock`. Mutations serialize per batch through `SELECT ... FOR
//! UPDATE` row locks; the `_tx` variants run on a caller-owned
//! connection so multi-batch operations share one transaction boundary.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{Batch, BatchAttributes};

/// Batch ledger service
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

/// Database row for a batch
#[derive(Debug, sqlx::FromRow)]
struct BatchRow {
    id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    batch_code: Option<String>,
    quantity: i32,
    expiration_date: Option<NaiveDate>,
    cost_price: Option<Decimal>,
    sell_price: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            batch_code: row.batch_code,
            quantity: row.quantity,
            expiration_date: row.expiration_date,
            cost_price: row.cost_price,
            sell_price: row.sell_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const BATCH_COLUMNS: &str = "id, product_id, warehouse_id, batch_code, quantity, \
     expiration_date, cost_price, sell_price, created_at, updated_at";

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Atomically deduct `quantity` units from a batch
    ///
    /// Returns the post-deduction quantity. Fails with `InsufficientStock`
    /// when the batch holds fewer units than requested, leaving the batch
    /// untouched.
    pub async fn reserve_and_deduct(&self, batch_id: Uuid, quantity: i32) -> AppResult<i32> {
        let mut tx = self.db.begin().await?;
        let remaining = reserve_and_deduct_tx(&mut *tx, batch_id, quantity).await?;
        tx.commit().await?;
        Ok(remaining)
    }

    /// Receive `quantity` units of a product into a warehouse
    ///
    /// Increments an existing batch matching (product, warehouse, batch
    /// code) or creates a new one carrying the given attributes.
    pub async fn increment(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        attributes: &BatchAttributes,
    ) -> AppResult<Batch> {
        let mut tx = self.db.begin().await?;
        let batch = increment_tx(&mut *tx, product_id, warehouse_id, quantity, attributes).await?;
        tx.commit().await?;
        Ok(batch)
    }

    /// Read-only snapshot of a batch
    pub async fn peek(&self, batch_id: Uuid) -> AppResult<Batch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        Ok(row.into())
    }

    /// List batches, optionally filtered by product and/or warehouse
    pub async fn list(
        &self,
        product_id: Option<Uuid>,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            SELECT {}
            FROM batches
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            ORDER BY created_at DESC
            "#,
            BATCH_COLUMNS
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Transaction-scoped deduction, composable into larger operations
pub(crate) async fn reserve_and_deduct_tx(
    conn: &mut PgConnection,
    batch_id: Uuid,
    quantity: i32,
) -> AppResult<i32> {
    if let Err(msg) = shared::validate_quantity(quantity) {
        return Err(AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_pt: "A quantidade deve ser positiva".to_string(),
        });
    }

    let current = sqlx::query_scalar::<_, i32>("SELECT quantity FROM batches WHERE id = $1 FOR UPDATE")
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

    if current < quantity {
        return Err(AppError::InsufficientStock {
            batch_id: Some(batch_id),
            requested: quantity,
            available: current as i64,
        });
    }

    let remaining = sqlx::query_scalar::<_, i32>(
        "UPDATE batches SET quantity = quantity - $1, updated_at = now() WHERE id = $2 RETURNING quantity",
    )
    .bind(quantity)
    .bind(batch_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(remaining)
}

/// Transaction-scoped receipt, composable into larger operations
pub(crate) async fn increment_tx(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
    attributes: &BatchAttributes,
) -> AppResult<Batch> {
    if let Err(msg) = shared::validate_quantity(quantity) {
        return Err(AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_pt: "A quantidade deve ser positiva".to_string(),
        });
    }

    // Match-or-create on (product, warehouse, batch code); NULL codes
    // match NULL-coded batches
    let existing = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id FROM batches
        WHERE product_id = $1 AND warehouse_id = $2 AND batch_code IS NOT DISTINCT FROM $3
        ORDER BY created_at
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .bind(&attributes.batch_code)
    .fetch_optional(&mut *conn)
    .await?;

    let row = match existing {
        Some(batch_id) => {
            sqlx::query_as::<_, BatchRow>(&format!(
                "UPDATE batches SET quantity = quantity + $1, updated_at = now() WHERE id = $2 RETURNING {}",
                BATCH_COLUMNS
            ))
            .bind(quantity)
            .bind(batch_id)
            .fetch_one(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, BatchRow>(&format!(
                r#"
                INSERT INTO batches (product_id, warehouse_id, batch_code, quantity,
                                     expiration_date, cost_price, sell_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {}
                "#,
                BATCH_COLUMNS
            ))
            .bind(product_id)
            .bind(warehouse_id)
            .bind(&attributes.batch_code)
            .bind(quantity)
            .bind(attributes.expiration_date)
            .bind(attributes.cost_price)
            .bind(attributes.sell_price)
            .fetch_one(&mut *conn)
            .await?
        }
    };

    Ok(row.into())
}

/// Transaction-scoped restock of an exact batch
///
/// Used only to reverse a transfer deduction when an in-transit transfer
/// is cancelled; unlike `increment_tx` it must hit the batch the stock
/// came out of.
pub(crate) async fn restock_tx(
    conn: &mut PgConnection,
    batch_id: Uuid,
    quantity: i32,
) -> AppResult<i32> {
    let restored = sqlx::query_scalar::<_, i32>(
        "UPDATE batches SET quantity = quantity + $1, updated_at = now() WHERE id = $2 RETURNING quantity",
    )
    .bind(quantity)
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

    Ok(restored)
}
