//! Sourcing policy: which batches supply an undirected exit
//!
//! Callers removing stock without naming a batch get oldest-expiring
//! stock first. The SQL here only fetches and locks the eligible rows;
//! the consume walk itself is the pure `shared::sourcing::plan_draws`,
//! so ordering and all-or-nothing semantics are testable without a
//! database. Runs inside the caller's transaction: the `FOR UPDATE`
//! locks hold until the movement commits or rolls back.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::sourcing::{plan_draws, AvailableBatch, BatchDraw, SourcingError};

/// Lock and return the batches eligible to source (product, warehouse)
///
/// Rows come back already in consumption order; `plan_draws` re-sorts
/// defensively but the database does the heavy lifting.
pub(crate) async fn lock_available_batches(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> AppResult<Vec<AvailableBatch>> {
    let rows = sqlx::query_as::<_, (Uuid, i32, Option<chrono::NaiveDate>, chrono::DateTime<chrono::Utc>)>(
        r#"
        SELECT id, quantity, expiration_date, created_at
        FROM batches
        WHERE product_id = $1 AND warehouse_id = $2 AND quantity > 0
        ORDER BY expiration_date ASC NULLS LAST, created_at ASC
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(batch_id, quantity, expiration_date, created_at)| AvailableBatch {
            batch_id,
            quantity,
            expiration_date,
            created_at,
        })
        .collect())
}

/// Plan an undirected exit of `quantity` units inside the caller's
/// transaction
pub(crate) async fn plan_exit(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) -> AppResult<Vec<BatchDraw>> {
    let batches = lock_available_batches(conn, product_id, warehouse_id).await?;

    plan_draws(&batches, quantity).map_err(|e| match e {
        SourcingError::Insufficient {
            requested,
            available,
        } => AppError::InsufficientStock {
            batch_id: None,
            requested,
            available,
        },
        SourcingError::NonPositiveRequest => AppError::Validation {
            field: "quantity".to_string(),
            message: "Quantity must be positive".to_string(),
            message_pt: "A quantidade deve ser positiva".to_string(),
        },
    })
}
