//! HTTP handlers for movement endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::movement::{CreateMovementInput, MovementService};
use crate::AppState;
use shared::{Movement, MovementWithItems};

#[derive(Debug, Deserialize)]
pub struct MovementFilter {
    pub warehouse_id: Option<Uuid>,
}

/// Create a pending movement
pub async fn create_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMovementInput>,
) -> AppResult<Json<MovementWithItems>> {
    let service = MovementService::new(state.db);
    let movement = service.create_movement(current_user.0.user_id, input).await?;
    Ok(Json(movement))
}

/// List movement headers
pub async fn list_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<Vec<Movement>>> {
    let service = MovementService::new(state.db);
    let movements = service.list_movements(filter.warehouse_id).await?;
    Ok(Json(movements))
}

/// Get a movement with its lines
pub async fn get_movement(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<MovementWithItems>> {
    let service = MovementService::new(state.db);
    let movement = service.get_movement(movement_id).await?;
    Ok(Json(movement))
}

/// Execute a pending movement
pub async fn execute_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<MovementWithItems>> {
    let service = MovementService::new(state.db);
    let movement = service
        .execute_movement(movement_id, current_user.0.user_id)
        .await?;
    Ok(Json(movement))
}

/// Cancel a pending movement
pub async fn cancel_movement(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<MovementWithItems>> {
    let service = MovementService::new(state.db);
    let movement = service.cancel_movement(movement_id).await?;
    Ok(Json(movement))
}
