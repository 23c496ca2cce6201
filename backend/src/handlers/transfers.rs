//! HTTP handlers for transfer and validation endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::transfer::{CancelTransferInput, CreateTransferInput, TransferService};
use crate::services::ReconciliationService;
use crate::AppState;
use shared::reconciliation::DiscrepancyEntry;
use shared::{ScanResult, Transfer, TransferWithItems, ValidationLogEntry};

#[derive(Debug, Deserialize)]
pub struct TransferFilter {
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ScanInput {
    pub barcode: String,
}

/// Create a draft transfer
pub async fn create_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<Json<TransferWithItems>> {
    let service = TransferService::new(state.db);
    let transfer = service.create_transfer(current_user.0.user_id, input).await?;
    Ok(Json(transfer))
}

/// List transfers touching a warehouse as source or destination
pub async fn list_transfers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<TransferFilter>,
) -> AppResult<Json<Vec<Transfer>>> {
    let service = TransferService::new(state.db);
    let transfers = service.list_transfers(filter.warehouse_id).await?;
    Ok(Json(transfers))
}

/// Get a transfer with its lines
pub async fn get_transfer(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferWithItems>> {
    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;
    Ok(Json(transfer))
}

/// Execute a draft transfer (source warehouse operators only)
pub async fn execute_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferWithItems>> {
    let service = TransferService::new(state.db);
    let transfer = service.execute_transfer(transfer_id, &current_user.0).await?;
    Ok(Json(transfer))
}

/// Cancel a draft or in-transit transfer
pub async fn cancel_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<CancelTransferInput>,
) -> AppResult<Json<TransferWithItems>> {
    let service = TransferService::new(state.db);
    let transfer = service
        .cancel_transfer(transfer_id, &input.reason, &current_user.0)
        .await?;
    Ok(Json(transfer))
}

/// Begin destination-side validation
pub async fn start_validation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferWithItems>> {
    let service = TransferService::new(state.db);
    let transfer = service.start_validation(transfer_id, &current_user.0).await?;
    Ok(Json(transfer))
}

/// Register one scanned unit
pub async fn scan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ScanInput>,
) -> AppResult<Json<ScanResult>> {
    let service = ReconciliationService::new(state.db);
    let result = service
        .scan(transfer_id, &input.barcode, &current_user.0)
        .await?;
    Ok(Json(result))
}

/// Sent-versus-received discrepancy report
pub async fn get_discrepancies(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<Vec<DiscrepancyEntry>>> {
    let service = ReconciliationService::new(state.db);
    let report = service.build_report(transfer_id).await?;
    Ok(Json(report))
}

/// Finish validation and credit the destination warehouse
pub async fn complete_validation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<Vec<DiscrepancyEntry>>> {
    let service = ReconciliationService::new(state.db);
    let report = service
        .complete_validation(transfer_id, &current_user.0)
        .await?;
    Ok(Json(report))
}

/// Full scan history of a transfer
pub async fn list_validation_log(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<Vec<ValidationLogEntry>>> {
    let service = ReconciliationService::new(state.db);
    let log = service.list_log(transfer_id).await?;
    Ok(Json(log))
}
