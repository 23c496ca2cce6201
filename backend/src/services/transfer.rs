//! Transfer state machine service
//!
//! A transfer relocates explicitly chosen batch quantities between two
//! warehouses: draft -> in_transit (source executes, stock leaves the
//! source batches) -> in_validation (destination scans) -> completed
//! (reconciler credits the destination). Cancellation is possible up to
//! and including in_transit, restoring the source batches exactly.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::{batch, movement};
use shared::{MovementType, Transfer, TransferItem, TransferStatus, TransferWithItems};

/// Transfer state machine service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
}

/// Database row for a transfer header
#[derive(Debug, sqlx::FromRow)]
struct TransferRow {
    id: Uuid,
    code: String,
    source_warehouse_id: Uuid,
    destination_warehouse_id: Uuid,
    status: String,
    notes: Option<String>,
    notes_pt: Option<String>,
    cancel_reason: Option<String>,
    created_by: Uuid,
    executed_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    executed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransferRow> for Transfer {
    type Error = AppError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        let status = TransferStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown transfer status: {}", row.status)))?;

        Ok(Transfer {
            id: row.id,
            code: row.code,
            source_warehouse_id: row.source_warehouse_id,
            destination_warehouse_id: row.destination_warehouse_id,
            status,
            notes: row.notes,
            notes_pt: row.notes_pt,
            cancel_reason: row.cancel_reason,
            created_by: row.created_by,
            executed_by: row.executed_by,
            created_at: row.created_at,
            executed_at: row.executed_at,
            completed_at: row.completed_at,
            updated_at: row.updated_at,
        })
    }
}

const TRANSFER_COLUMNS: &str = "id, code, source_warehouse_id, destination_warehouse_id, status, \
     notes, notes_pt, cancel_reason, created_by, executed_by, created_at, executed_at, \
     completed_at, updated_at";

/// Fields of a transfer needed by the state-changing operations
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LockedTransfer {
    pub code: String,
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    status: String,
}

impl LockedTransfer {
    pub fn status(&self) -> AppResult<TransferStatus> {
        TransferStatus::from_str(&self.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown transfer status: {}", self.status)))
    }
}

/// Lock a transfer header row for a state change
pub(crate) async fn lock_transfer_tx(
    conn: &mut sqlx::PgConnection,
    transfer_id: Uuid,
) -> AppResult<LockedTransfer> {
    sqlx::query_as::<_, LockedTransfer>(
        "SELECT code, source_warehouse_id, destination_warehouse_id, status \
         FROM transfers WHERE id = $1 FOR UPDATE",
    )
    .bind(transfer_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Transfer".to_string()))
}

/// Input for creating a transfer
#[derive(Debug, Deserialize)]
pub struct CreateTransferInput {
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    pub items: Vec<TransferItemInput>,
    pub notes: Option<String>,
    pub notes_pt: Option<String>,
}

/// One line of a transfer being created
#[derive(Debug, Deserialize)]
pub struct TransferItemInput {
    pub source_batch_id: Uuid,
    pub quantity: i32,
}

/// Input for cancelling a transfer
#[derive(Debug, Deserialize)]
pub struct CancelTransferInput {
    pub reason: String,
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a draft transfer with explicitly chosen source batches
    pub async fn create_transfer(
        &self,
        created_by: Uuid,
        input: CreateTransferInput,
    ) -> AppResult<TransferWithItems> {
        if input.source_warehouse_id == input.destination_warehouse_id {
            return Err(AppError::Validation {
                field: "destination_warehouse_id".to_string(),
                message: "Source and destination warehouses must differ".to_string(),
                message_pt: "Os armazéns de origem e destino devem ser diferentes".to_string(),
            });
        }

        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A transfer requires at least one item".to_string(),
                message_pt: "Uma transferência requer ao menos um item".to_string(),
            });
        }

        let source_code = sqlx::query_scalar::<_, String>(
            "SELECT code FROM warehouses WHERE id = $1",
        )
        .bind(input.source_warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Source warehouse".to_string()))?;

        let destination_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
                .bind(input.destination_warehouse_id)
                .fetch_one(&self.db)
                .await?;

        if !destination_exists {
            return Err(AppError::NotFound("Destination warehouse".to_string()));
        }

        for item in &input.items {
            if let Err(msg) = shared::validate_quantity(item.quantity) {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: msg.to_string(),
                    message_pt: "A quantidade deve ser positiva".to_string(),
                });
            }

            let batch_warehouse = sqlx::query_scalar::<_, Uuid>(
                "SELECT warehouse_id FROM batches WHERE id = $1",
            )
            .bind(item.source_batch_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Batch {}", item.source_batch_id)))?;

            if batch_warehouse != input.source_warehouse_id {
                return Err(AppError::Validation {
                    field: "source_batch_id".to_string(),
                    message: format!(
                        "Batch {} does not belong to the source warehouse",
                        item.source_batch_id
                    ),
                    message_pt: format!(
                        "O lote {} não pertence ao armazém de origem",
                        item.source_batch_id
                    ),
                });
            }
        }

        let code = self.generate_transfer_code(&source_code).await?;

        let mut tx = self.db.begin().await?;

        let transfer_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO transfers (code, source_warehouse_id, destination_warehouse_id,
                                   status, notes, notes_pt, created_by)
            VALUES ($1, $2, $3, 'draft', $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&code)
        .bind(input.source_warehouse_id)
        .bind(input.destination_warehouse_id)
        .bind(&input.notes)
        .bind(&input.notes_pt)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in input.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transfer_items (transfer_id, source_batch_id, position, quantity_sent)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(transfer_id)
            .bind(item.source_batch_id)
            .bind(position as i32)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_transfer(transfer_id).await
    }

    /// Generate unique transfer code: TRF-YYYY-WH-NNNN
    async fn generate_transfer_code(&self, warehouse_code: &str) -> AppResult<String> {
        use chrono::Datelike;
        let year = Utc::now().year();

        let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('transfer_code_seq')")
            .fetch_one(&self.db)
            .await?;

        Ok(format!("TRF-{}-{}-{:04}", year, warehouse_code, sequence))
    }

    /// Execute a draft transfer, deducting every line from its source batch
    ///
    /// Only an operator of the source warehouse may execute. All lines
    /// deduct in one transaction; an under-stocked line aborts the whole
    /// execution and the transfer stays draft.
    pub async fn execute_transfer(
        &self,
        transfer_id: Uuid,
        actor: &AuthUser,
    ) -> AppResult<TransferWithItems> {
        let mut tx = self.db.begin().await?;

        let transfer = lock_transfer_tx(&mut *tx, transfer_id).await?;

        if !actor.operates(transfer.source_warehouse_id) {
            return Err(AppError::Forbidden {
                message: format!(
                    "Only an operator of the source warehouse may execute transfer {}",
                    transfer.code
                ),
                message_pt: format!(
                    "Apenas um operador do armazém de origem pode executar a transferência {}",
                    transfer.code
                ),
            });
        }

        let status = transfer.status()?;
        if !status.can_transition(TransferStatus::InTransit) {
            return Err(AppError::InvalidState(format!(
                "Transfer {} is {} and cannot be executed",
                transfer.code,
                status.as_str()
            )));
        }

        let items = sqlx::query_as::<_, (Uuid, i32, Uuid)>(
            r#"
            SELECT i.source_batch_id, i.quantity_sent, b.product_id
            FROM transfer_items i
            JOIN batches b ON b.id = i.source_batch_id
            WHERE i.transfer_id = $1
            ORDER BY i.position
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&mut *tx)
        .await?;

        if items.is_empty() {
            return Err(AppError::InvalidState(format!(
                "Transfer {} has no items to execute",
                transfer.code
            )));
        }

        let mut audit_lines = Vec::with_capacity(items.len());
        for (source_batch_id, quantity_sent, product_id) in &items {
            batch::reserve_and_deduct_tx(&mut *tx, *source_batch_id, *quantity_sent).await?;
            audit_lines.push(movement::AuditLine {
                product_id: *product_id,
                batch_id: Some(*source_batch_id),
                quantity: *quantity_sent,
            });
        }

        movement::insert_completed_movement_tx(
            &mut *tx,
            MovementType::TransferExecute,
            transfer.source_warehouse_id,
            actor.user_id,
            &audit_lines,
            Some(format!("Transfer {}", transfer.code)),
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE transfers
            SET status = 'in_transit', executed_by = $1, executed_at = now(), updated_at = now()
            WHERE id = $2
            "#,
        )
        .bind(actor.user_id)
        .bind(transfer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(code = %transfer.code, "transfer executed");

        self.get_transfer(transfer_id).await
    }

    /// Cancel a draft or in-transit transfer
    ///
    /// An in-transit cancellation restocks every source batch by its
    /// quantity_sent in the same transaction. Illegal once validation has
    /// begun.
    pub async fn cancel_transfer(
        &self,
        transfer_id: Uuid,
        reason: &str,
        actor: &AuthUser,
    ) -> AppResult<TransferWithItems> {
        if let Err(msg) = shared::validate_reason(reason) {
            return Err(AppError::Validation {
                field: "reason".to_string(),
                message: msg.to_string(),
                message_pt: "É necessário informar um motivo".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let transfer = lock_transfer_tx(&mut *tx, transfer_id).await?;
        let status = transfer.status()?;

        if !status.can_transition(TransferStatus::Cancelled) {
            return Err(AppError::InvalidState(format!(
                "Transfer {} is {} and cannot be cancelled",
                transfer.code,
                status.as_str()
            )));
        }

        if status == TransferStatus::InTransit {
            let items = sqlx::query_as::<_, (Uuid, i32)>(
                "SELECT source_batch_id, quantity_sent FROM transfer_items WHERE transfer_id = $1 ORDER BY position",
            )
            .bind(transfer_id)
            .fetch_all(&mut *tx)
            .await?;

            for (source_batch_id, quantity_sent) in items {
                batch::restock_tx(&mut *tx, source_batch_id, quantity_sent).await?;
            }
        }

        sqlx::query(
            "UPDATE transfers SET status = 'cancelled', cancel_reason = $1, updated_at = now() WHERE id = $2",
        )
        .bind(reason.trim())
        .bind(transfer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(code = %transfer.code, cancelled_by = %actor.user_id, "transfer cancelled");

        self.get_transfer(transfer_id).await
    }

    /// Begin destination-side validation of an in-transit transfer
    ///
    /// Idempotent when validation has already started.
    pub async fn start_validation(
        &self,
        transfer_id: Uuid,
        actor: &AuthUser,
    ) -> AppResult<TransferWithItems> {
        let mut tx = self.db.begin().await?;

        let transfer = lock_transfer_tx(&mut *tx, transfer_id).await?;

        if !actor.operates(transfer.destination_warehouse_id) {
            return Err(AppError::Forbidden {
                message: format!(
                    "Only an operator of the destination warehouse may validate transfer {}",
                    transfer.code
                ),
                message_pt: format!(
                    "Apenas um operador do armazém de destino pode validar a transferência {}",
                    transfer.code
                ),
            });
        }

        let status = transfer.status()?;

        if status == TransferStatus::InValidation {
            tx.commit().await?;
            return self.get_transfer(transfer_id).await;
        }

        if !status.can_transition(TransferStatus::InValidation) {
            return Err(AppError::InvalidState(format!(
                "Transfer {} is {} and validation cannot start",
                transfer.code,
                status.as_str()
            )));
        }

        sqlx::query("UPDATE transfers SET status = 'in_validation', updated_at = now() WHERE id = $1")
            .bind(transfer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_transfer(transfer_id).await
    }

    /// Get a transfer with its lines
    pub async fn get_transfer(&self, transfer_id: Uuid) -> AppResult<TransferWithItems> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {} FROM transfers WHERE id = $1",
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))?;

        let items = sqlx::query_as::<_, (Uuid, Uuid, Uuid, i32, i32, Option<i32>, Uuid, String, DateTime<Utc>)>(
            r#"
            SELECT i.id, i.transfer_id, i.source_batch_id, i.position, i.quantity_sent,
                   i.quantity_received, b.product_id, p.name, i.created_at
            FROM transfer_items i
            JOIN batches b ON b.id = i.source_batch_id
            JOIN products p ON p.id = b.product_id
            WHERE i.transfer_id = $1
            ORDER BY i.position
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(TransferWithItems {
            transfer: row.try_into()?,
            items: items
                .into_iter()
                .map(|r| TransferItem {
                    id: r.0,
                    transfer_id: r.1,
                    source_batch_id: r.2,
                    position: r.3,
                    quantity_sent: r.4,
                    quantity_received: r.5,
                    product_id: r.6,
                    product_name: r.7,
                    created_at: r.8,
                })
                .collect(),
        })
    }

    /// List transfer headers touching a warehouse (as source or
    /// destination), or all transfers
    pub async fn list_transfers(&self, warehouse_id: Option<Uuid>) -> AppResult<Vec<Transfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            SELECT {}
            FROM transfers
            WHERE ($1::uuid IS NULL OR source_warehouse_id = $1 OR destination_warehouse_id = $1)
            ORDER BY created_at DESC
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
