//! HTTP handlers for label lot endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::lot::{IssueLotInput, LabelStatus, LotService, LotSummary, LotWithLabels};
use crate::AppState;

/// Issue a new lot of labels
pub async fn issue_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<IssueLotInput>,
) -> AppResult<Json<LotWithLabels>> {
    let service = LotService::new(state.db);
    let lot = service.issue_lot(current_user.0.user_id, input).await?;
    Ok(Json(lot))
}

/// List all lots
pub async fn list_lots(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<LotSummary>>> {
    let service = LotService::new(state.db);
    Ok(Json(service.list_lots().await?))
}

/// Get a lot with its labels and print geometry
pub async fn get_lot(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<LotWithLabels>> {
    let service = LotService::new(state.db);
    Ok(Json(service.get_lot(lot_id).await?))
}

/// Delete a lot (blocked while any label is used)
pub async fn delete_lot(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = LotService::new(state.db);
    service.delete_lot(lot_id).await?;
    Ok(Json(()))
}

/// Look up a label by scanned code
pub async fn get_label(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<LabelStatus>> {
    let service = LotService::new(state.db);
    Ok(Json(service.get_label_by_code(&code).await?))
}
