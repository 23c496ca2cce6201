//! Validation log and reconciler
//!
//! Destination-side confirmation of a transfer: operators scan barcodes
//! one physical unit at a time, every attempt lands in an append-only
//! log, and completion credits the destination warehouse with exactly
//! what was scanned. Missing units are reported as shortages and written
//! off; they are never silently added to stock.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::{batch, movement, transfer};
use shared::reconciliation::{carries_product, match_open_item, DiscrepancyEntry, ScanCandidate};
use shared::{BatchAttributes, MovementType, ScanResult, TransferStatus, ValidationLogEntry};

/// Validation log and reconciliation service
#[derive(Clone)]
pub struct ReconciliationService {
    db: PgPool,
}

/// Transfer line as loaded for scan matching
#[derive(Debug, sqlx::FromRow)]
struct ScanItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity_sent: i32,
    quantity_received: Option<i32>,
}

impl ReconciliationService {
    /// Create a new ReconciliationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register one scanned unit against a transfer under validation
    ///
    /// A malformed barcode is a hard error; every well-formed scan, valid
    /// or not, is committed to the validation log and answered with a
    /// `ScanResult` so the operator keeps scanning.
    pub async fn scan(
        &self,
        transfer_id: Uuid,
        barcode: &str,
        actor: &AuthUser,
    ) -> AppResult<ScanResult> {
        if let Err(msg) = shared::validate_barcode(barcode) {
            return Err(AppError::Validation {
                field: "barcode".to_string(),
                message: msg.to_string(),
                message_pt: "Código de barras inválido".to_string(),
            });
        }
        let barcode = barcode.trim();

        let mut tx = self.db.begin().await?;

        let locked = transfer::lock_transfer_tx(&mut *tx, transfer_id).await?;

        if !actor.operates(locked.destination_warehouse_id) {
            return Err(AppError::Forbidden {
                message: format!(
                    "Only an operator of the destination warehouse may scan transfer {}",
                    locked.code
                ),
                message_pt: format!(
                    "Apenas um operador do armazém de destino pode conferir a transferência {}",
                    locked.code
                ),
            });
        }

        let status = locked.status()?;
        if status != TransferStatus::InValidation {
            return Err(AppError::InvalidState(format!(
                "Transfer {} is {}; scanning requires in_validation",
                locked.code,
                status.as_str()
            )));
        }

        let product = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, name FROM products WHERE barcode = $1",
        )
        .bind(barcode)
        .fetch_optional(&mut *tx)
        .await?;

        let (product_id, product_name) = match product {
            Some(p) => p,
            None => {
                let message = format!("Barcode {} does not match any product", barcode);
                let message_pt =
                    format!("Código de barras {} não corresponde a nenhum produto", barcode);
                append_log_tx(&mut *tx, transfer_id, barcode, None, false, &message, &message_pt, actor.user_id)
                    .await?;
                tx.commit().await?;
                return Ok(ScanResult::rejected(None, message, message_pt));
            }
        };

        // Lock only the item rows; the batch/product joins are reads
        let items = sqlx::query_as::<_, ScanItemRow>(
            r#"
            SELECT i.id, b.product_id, i.quantity_sent, i.quantity_received
            FROM transfer_items i
            JOIN batches b ON b.id = i.source_batch_id
            WHERE i.transfer_id = $1
            ORDER BY i.position
            FOR UPDATE OF i
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&mut *tx)
        .await?;

        let candidates: Vec<ScanCandidate> = items
            .iter()
            .map(|i| ScanCandidate {
                product_id: i.product_id,
                quantity_sent: i.quantity_sent,
                quantity_received: i.quantity_received.unwrap_or(0),
            })
            .collect();

        let result = match match_open_item(&candidates, product_id) {
            Some(index) => {
                let item = &items[index];
                let received = sqlx::query_scalar::<_, i32>(
                    "UPDATE transfer_items SET quantity_received = COALESCE(quantity_received, 0) + 1 \
                     WHERE id = $1 RETURNING quantity_received",
                )
                .bind(item.id)
                .fetch_one(&mut *tx)
                .await?;

                let message = format!("{} received ({}/{})", product_name, received, item.quantity_sent);
                let message_pt =
                    format!("{} recebido ({}/{})", product_name, received, item.quantity_sent);
                append_log_tx(&mut *tx, transfer_id, barcode, Some(product_id), true, &message, &message_pt, actor.user_id)
                    .await?;

                ScanResult::matched(product_name, item.quantity_sent, received)
            }
            None => {
                let (message, message_pt) = if carries_product(&candidates, product_id) {
                    (
                        format!("All sent units of {} are already received", product_name),
                        format!("Todas as unidades enviadas de {} já foram recebidas", product_name),
                    )
                } else {
                    (
                        format!("{} is not part of this transfer", product_name),
                        format!("{} não faz parte desta transferência", product_name),
                    )
                };
                append_log_tx(&mut *tx, transfer_id, barcode, Some(product_id), false, &message, &message_pt, actor.user_id)
                    .await?;

                ScanResult::rejected(Some(product_name), message, message_pt)
            }
        };

        tx.commit().await?;

        Ok(result)
    }

    /// Compare sent against received for every line of a transfer
    ///
    /// Available at any point of the lifecycle; lines never scanned count
    /// as zero received.
    pub async fn build_report(&self, transfer_id: Uuid) -> AppResult<Vec<DiscrepancyEntry>> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM transfers WHERE id = $1)")
                .bind(transfer_id)
                .fetch_one(&self.db)
                .await?;

        if !exists {
            return Err(AppError::NotFound("Transfer".to_string()));
        }

        let items = sqlx::query_as::<_, (Uuid, Uuid, String, i32, Option<i32>)>(
            r#"
            SELECT i.id, b.product_id, p.name, i.quantity_sent, i.quantity_received
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

        Ok(items
            .into_iter()
            .filter_map(|(item_id, product_id, product_name, sent, received)| {
                DiscrepancyEntry::for_item(
                    item_id,
                    product_id,
                    product_name,
                    sent,
                    received.unwrap_or(0),
                )
            })
            .collect())
    }

    /// Finish validation: credit received quantities to the destination
    ///
    /// Each line's received quantity enters the destination warehouse
    /// carrying the source batch's code, expiration and prices. Shortage
    /// lines are written off, not restocked at the source.
    pub async fn complete_validation(
        &self,
        transfer_id: Uuid,
        actor: &AuthUser,
    ) -> AppResult<Vec<DiscrepancyEntry>> {
        let mut tx = self.db.begin().await?;

        let locked = transfer::lock_transfer_tx(&mut *tx, transfer_id).await?;

        if !actor.operates(locked.destination_warehouse_id) {
            return Err(AppError::Forbidden {
                message: format!(
                    "Only an operator of the destination warehouse may complete transfer {}",
                    locked.code
                ),
                message_pt: format!(
                    "Apenas um operador do armazém de destino pode concluir a transferência {}",
                    locked.code
                ),
            });
        }

        let status = locked.status()?;
        if !status.can_transition(TransferStatus::Completed) {
            return Err(AppError::InvalidState(format!(
                "Transfer {} is {} and cannot be completed",
                locked.code,
                status.as_str()
            )));
        }

        let items = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT i.quantity_received, b.product_id, b.batch_code,
                   b.expiration_date, b.cost_price, b.sell_price
            FROM transfer_items i
            JOIN batches b ON b.id = i.source_batch_id
            WHERE i.transfer_id = $1
            ORDER BY i.position
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut audit_lines = Vec::new();
        for item in &items {
            let received = item.quantity_received.unwrap_or(0);
            if received == 0 {
                continue;
            }

            let attributes = BatchAttributes {
                batch_code: item.batch_code.clone(),
                expiration_date: item.expiration_date,
                cost_price: item.cost_price,
                sell_price: item.sell_price,
            };

            let credited = batch::increment_tx(
                &mut *tx,
                item.product_id,
                locked.destination_warehouse_id,
                received,
                &attributes,
            )
            .await?;

            audit_lines.push(movement::AuditLine {
                product_id: item.product_id,
                batch_id: Some(credited.id),
                quantity: received,
            });
        }

        if !audit_lines.is_empty() {
            movement::insert_completed_movement_tx(
                &mut *tx,
                MovementType::TransferReceive,
                locked.destination_warehouse_id,
                actor.user_id,
                &audit_lines,
                Some(format!("Transfer {}", locked.code)),
            )
            .await?;
        }

        sqlx::query(
            "UPDATE transfers SET status = 'completed', completed_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(transfer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let report = self.build_report(transfer_id).await?;

        tracing::info!(
            code = %locked.code,
            discrepancies = report.len(),
            "transfer validation completed"
        );

        Ok(report)
    }

    /// Full scan history of a transfer, oldest first
    pub async fn list_log(&self, transfer_id: Uuid) -> AppResult<Vec<ValidationLogEntry>> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM transfers WHERE id = $1)")
                .bind(transfer_id)
                .fetch_one(&self.db)
                .await?;

        if !exists {
            return Err(AppError::NotFound("Transfer".to_string()));
        }

        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, transfer_id, barcode, product_id, is_valid, message, message_pt,
                   scanned_by, created_at
            FROM validation_log
            WHERE transfer_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Source batch attributes carried over to the destination on receipt
#[derive(Debug, sqlx::FromRow)]
struct ReceiptRow {
    quantity_received: Option<i32>,
    product_id: Uuid,
    batch_code: Option<String>,
    expiration_date: Option<chrono::NaiveDate>,
    cost_price: Option<rust_decimal::Decimal>,
    sell_price: Option<rust_decimal::Decimal>,
}

#[derive(Debug, sqlx::FromRow)]
struct LogRow {
    id: Uuid,
    transfer_id: Uuid,
    barcode: String,
    product_id: Option<Uuid>,
    is_valid: bool,
    message: String,
    message_pt: String,
    scanned_by: Uuid,
    created_at: DateTime<Utc>,
}

impl From<LogRow> for ValidationLogEntry {
    fn from(row: LogRow) -> Self {
        ValidationLogEntry {
            id: row.id,
            transfer_id: row.transfer_id,
            barcode: row.barcode,
            product_id: row.product_id,
            is_valid: row.is_valid,
            message: row.message,
            message_pt: row.message_pt,
            scanned_by: row.scanned_by,
            created_at: row.created_at,
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn append_log_tx(
    conn: &mut PgConnection,
    transfer_id: Uuid,
    barcode: &str,
    product_id: Option<Uuid>,
    is_valid: bool,
    message: &str,
    message_pt: &str,
    scanned_by: Uuid,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO validation_log (transfer_id, barcode, product_id, is_valid,
                                    message, message_pt, scanned_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(transfer_id)
    .bind(barcode)
    .bind(product_id)
    .bind(is_valid)
    .bind(message)
    .bind(message_pt)
    .bind(scanned_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
