//! HTTP handlers for the open ledger (registro) endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::models::Registro;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ledger::{AppendLineInput, AppendLineResult, LedgerService, RegistroDetail};
use crate::AppState;

/// Append a weighed scan to the open registro (created lazily)
pub async fn append_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AppendLineInput>,
) -> AppResult<Json<AppendLineResult>> {
    let service = LedgerService::new(state.db);
    let result = service.append_line(&current_user.0, input).await?;
    Ok(Json(result))
}

/// Remove a línea, reverting its label to active
pub async fn remove_line(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(linea_id): Path<Uuid>,
) -> AppResult<Json<Registro>> {
    let service = LedgerService::new(state.db);
    let registro = service.remove_line(linea_id).await?;
    Ok(Json(registro))
}

/// Get the currently open registro with its líneas
pub async fn current_registro(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<RegistroDetail>> {
    let service = LedgerService::new(state.db);
    Ok(Json(service.current_open().await?))
}

/// Get a registro by id with its líneas
pub async fn get_registro(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(registro_id): Path<Uuid>,
) -> AppResult<Json<RegistroDetail>> {
    let service = LedgerService::new(state.db);
    Ok(Json(service.get_registro(registro_id).await?))
}

/// List registros, newest first
pub async fn list_registros(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Registro>>> {
    let service = LedgerService::new(state.db);
    Ok(Json(service.list_registros().await?))
}
