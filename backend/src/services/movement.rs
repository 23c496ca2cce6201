//! Movement processor service
//!
//! Movements are the undirected quantity changes of a single warehouse:
//! entries, exits and adjustments. A movement is created pending and
//! later executed or cancelled, both terminal. Execution applies every
//! line through the batch ledger inside one transaction, so a failing
//! line leaves every batch at its pre-call quantity.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{batch, sourcing};
use shared::{
    BatchAttributes, Movement, MovementItem, MovementStatus, MovementType, MovementWithItems,
};

/// Movement processor service
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
}

/// Database row for a movement header
#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: Uuid,
    movement_type: String,
    status: String,
    warehouse_id: Uuid,
    notes: Option<String>,
    notes_pt: Option<String>,
    created_by: Uuid,
    executed_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    executed_at: Option<DateTime<Utc>>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = MovementType::from_str(&row.movement_type)
            .ok_or_else(|| AppError::Internal(format!("Unknown movement type: {}", row.movement_type)))?;
        let status = MovementStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown movement status: {}", row.status)))?;

        Ok(Movement {
            id: row.id,
            movement_type,
            status,
            warehouse_id: row.warehouse_id,
            notes: row.notes,
            notes_pt: row.notes_pt,
            created_by: row.created_by,
            executed_by: row.executed_by,
            created_at: row.created_at,
            executed_at: row.executed_at,
        })
    }
}

/// Database row for a movement line
#[derive(Debug, sqlx::FromRow)]
struct MovementItemRow {
    id: Uuid,
    movement_id: Uuid,
    product_id: Uuid,
    batch_id: Option<Uuid>,
    quantity: i32,
    reason: Option<String>,
    batch_code: Option<String>,
    expiration_date: Option<NaiveDate>,
    cost_price: Option<Decimal>,
    sell_price: Option<Decimal>,
}

impl From<MovementItemRow> for MovementItem {
    fn from(row: MovementItemRow) -> Self {
        MovementItem {
            id: row.id,
            movement_id: row.movement_id,
            product_id: row.product_id,
            batch_id: row.batch_id,
            quantity: row.quantity,
            reason: row.reason,
            attributes: BatchAttributes {
                batch_code: row.batch_code,
                expiration_date: row.expiration_date,
                cost_price: row.cost_price,
                sell_price: row.sell_price,
            },
        }
    }
}

const MOVEMENT_COLUMNS: &str = "id, movement_type, status, warehouse_id, notes, notes_pt, \
     created_by, executed_by, created_at, executed_at";

const ITEM_COLUMNS: &str = "id, movement_id, product_id, batch_id, quantity, reason, \
     batch_code, expiration_date, cost_price, sell_price";

/// Input for creating a movement
#[derive(Debug, Deserialize)]
pub struct CreateMovementInput {
    pub movement_type: MovementType,
    pub warehouse_id: Uuid,
    pub items: Vec<MovementItemInput>,
    pub notes: Option<String>,
    pub notes_pt: Option<String>,
}

/// One line of a movement being created
#[derive(Debug, Deserialize)]
pub struct MovementItemInput {
    pub product_id: Uuid,
    /// Explicit batch for outbound lines; omitted lines are sourced
    /// FIFO-by-expiration at execution time
    pub batch_id: Option<Uuid>,
    pub quantity: i32,
    pub reason: Option<String>,
    #[serde(flatten)]
    pub attributes: BatchAttributes,
}

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a pending movement
    pub async fn create_movement(
        &self,
        created_by: Uuid,
        input: CreateMovementInput,
    ) -> AppResult<MovementWithItems> {
        if input.movement_type.is_transfer_audit() {
            return Err(AppError::Validation {
                field: "movement_type".to_string(),
                message: "Transfer movements are created by the transfer engine".to_string(),
                message_pt: "Movimentações de transferência são criadas pelo motor de transferências"
                    .to_string(),
            });
        }

        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A movement requires at least one item".to_string(),
                message_pt: "Uma movimentação requer ao menos um item".to_string(),
            });
        }

        let warehouse_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
                .bind(input.warehouse_id)
                .fetch_one(&self.db)
                .await?;

        if !warehouse_exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        for item in &input.items {
            if let Err(msg) = shared::validate_quantity(item.quantity) {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: msg.to_string(),
                    message_pt: "A quantidade deve ser positiva".to_string(),
                });
            }

            if input.movement_type.is_inbound() && item.batch_id.is_some() {
                return Err(AppError::Validation {
                    field: "batch_id".to_string(),
                    message: "Inbound lines receive into a batch chosen by the ledger".to_string(),
                    message_pt: "Linhas de entrada recebem em um lote escolhido pelo razão de lotes"
                        .to_string(),
                });
            }

            // Explicit batches must live in this warehouse and carry this product
            if let Some(batch_id) = item.batch_id {
                let batch = sqlx::query_as::<_, (Uuid, Uuid)>(
                    "SELECT product_id, warehouse_id FROM batches WHERE id = $1",
                )
                .bind(batch_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Batch {}", batch_id)))?;

                if batch.0 != item.product_id || batch.1 != input.warehouse_id {
                    return Err(AppError::Validation {
                        field: "batch_id".to_string(),
                        message: format!(
                            "Batch {} does not hold this product in this warehouse",
                            batch_id
                        ),
                        message_pt: format!(
                            "O lote {} não contém este produto neste armazém",
                            batch_id
                        ),
                    });
                }
            }
        }

        let mut tx = self.db.begin().await?;

        let movement_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO movements (movement_type, status, warehouse_id, notes, notes_pt, created_by)
            VALUES ($1, 'pending', $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.movement_type.as_str())
        .bind(input.warehouse_id)
        .bind(&input.notes)
        .bind(&input.notes_pt)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for item in &input.items {
            sqlx::query(
                r#"
                INSERT INTO movement_items (movement_id, product_id, batch_id, quantity, reason,
                                            batch_code, expiration_date, cost_price, sell_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(movement_id)
            .bind(item.product_id)
            .bind(item.batch_id)
            .bind(item.quantity)
            .bind(&item.reason)
            .bind(&item.attributes.batch_code)
            .bind(item.attributes.expiration_date)
            .bind(item.attributes.cost_price)
            .bind(item.attributes.sell_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_movement(movement_id).await
    }

    /// Execute a pending movement, applying every line atomically
    pub async fn execute_movement(
        &self,
        movement_id: Uuid,
        executed_by: Uuid,
    ) -> AppResult<MovementWithItems> {
        let mut tx = self.db.begin().await?;

        let header = sqlx::query_as::<_, (String, String, Uuid)>(
            "SELECT movement_type, status, warehouse_id FROM movements WHERE id = $1 FOR UPDATE",
        )
        .bind(movement_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;

        let movement_type = MovementType::from_str(&header.0)
            .ok_or_else(|| AppError::Internal(format!("Unknown movement type: {}", header.0)))?;
        let status = MovementStatus::from_str(&header.1)
            .ok_or_else(|| AppError::Internal(format!("Unknown movement status: {}", header.1)))?;
        let warehouse_id = header.2;

        if !status.can_execute() {
            return Err(AppError::InvalidState(format!(
                "Movement {} is {} and cannot be executed",
                movement_id,
                status.as_str()
            )));
        }

        if movement_type.is_transfer_audit() {
            return Err(AppError::InvalidState(
                "Transfer movements are executed by the transfer engine".to_string(),
            ));
        }

        let items = sqlx::query_as::<_, MovementItemRow>(&format!(
            "SELECT {} FROM movement_items WHERE movement_id = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(movement_id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            if movement_type.is_inbound() {
                let attributes = BatchAttributes {
                    batch_code: item.batch_code.clone(),
                    expiration_date: item.expiration_date,
                    cost_price: item.cost_price,
                    sell_price: item.sell_price,
                };
                batch::increment_tx(&mut *tx, item.product_id, warehouse_id, item.quantity, &attributes)
                    .await?;
            } else if let Some(batch_id) = item.batch_id {
                batch::reserve_and_deduct_tx(&mut *tx, batch_id, item.quantity).await?;
            } else {
                let draws =
                    sourcing::plan_exit(&mut *tx, item.product_id, warehouse_id, item.quantity)
                        .await?;
                for draw in draws {
                    batch::reserve_and_deduct_tx(&mut *tx, draw.batch_id, draw.quantity).await?;
                }
            }
        }

        sqlx::query(
            "UPDATE movements SET status = 'completed', executed_by = $1, executed_at = now() WHERE id = $2",
        )
        .bind(executed_by)
        .bind(movement_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%movement_id, movement_type = movement_type.as_str(), "movement executed");

        self.get_movement(movement_id).await
    }

    /// Cancel a pending movement
    pub async fn cancel_movement(&self, movement_id: Uuid) -> AppResult<MovementWithItems> {
        let mut tx = self.db.begin().await?;

        let status_str = sqlx::query_scalar::<_, String>(
            "SELECT status FROM movements WHERE id = $1 FOR UPDATE",
        )
        .bind(movement_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;

        let status = MovementStatus::from_str(&status_str)
            .ok_or_else(|| AppError::Internal(format!("Unknown movement status: {}", status_str)))?;

        if !status.can_cancel() {
            return Err(AppError::InvalidState(format!(
                "Movement {} is {} and cannot be cancelled",
                movement_id,
                status.as_str()
            )));
        }

        sqlx::query("UPDATE movements SET status = 'cancelled' WHERE id = $1")
            .bind(movement_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_movement(movement_id).await
    }

    /// Get a movement with its lines
    pub async fn get_movement(&self, movement_id: Uuid) -> AppResult<MovementWithItems> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM movements WHERE id = $1",
            MOVEMENT_COLUMNS
        ))
        .bind(movement_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;

        let items = sqlx::query_as::<_, MovementItemRow>(&format!(
            "SELECT {} FROM movement_items WHERE movement_id = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(movement_id)
        .fetch_all(&self.db)
        .await?;

        Ok(MovementWithItems {
            movement: row.try_into()?,
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    /// List movement headers, optionally for one warehouse
    pub async fn list_movements(&self, warehouse_id: Option<Uuid>) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {}
            FROM movements
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
            ORDER BY created_at DESC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// One line of a transfer audit movement
pub(crate) struct AuditLine {
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub quantity: i32,
}

/// Record a completed transfer audit movement inside an open transaction
///
/// Transfer execution and reception leave a movement trail like any other
/// stock change, but those movements are born completed: the quantity
/// effects happen in the same transaction that writes them.
pub(crate) async fn insert_completed_movement_tx(
    conn: &mut PgConnection,
    movement_type: MovementType,
    warehouse_id: Uuid,
    actor_id: Uuid,
    lines: &[AuditLine],
    notes: Option<String>,
) -> AppResult<Uuid> {
    let movement_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO movements (movement_type, status, warehouse_id, notes, created_by,
                               executed_by, executed_at)
        VALUES ($1, 'completed', $2, $3, $4, $4, now())
        RETURNING id
        "#,
    )
    .bind(movement_type.as_str())
    .bind(warehouse_id)
    .bind(&notes)
    .bind(actor_id)
    .fetch_one(&mut *conn)
    .await?;

    for line in lines {
        sqlx::query(
            "INSERT INTO movement_items (movement_id, product_id, batch_id, quantity) VALUES ($1, $2, $3, $4)",
        )
        .bind(movement_id)
        .bind(line.product_id)
        .bind(line.batch_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(movement_id)
}
