//! HTTP handlers for batch ledger endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::BatchService;
use crate::AppState;
use shared::Batch;

#[derive(Debug, Deserialize)]
pub struct BatchFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

/// List batches, optionally filtered by product and/or warehouse
pub async fn list_batches(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<BatchFilter>,
) -> AppResult<Json<Vec<Batch>>> {
    let service = BatchService::new(state.db);
    let batches = service.list(filter.product_id, filter.warehouse_id).await?;
    Ok(Json(batches))
}

/// Get a single batch
pub async fn get_batch(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let service = BatchService::new(state.db);
    let batch = service.peek(batch_id).await?;
    Ok(Json(batch))
}
