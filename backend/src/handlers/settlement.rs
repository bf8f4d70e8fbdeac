//! HTTP handlers for settlement (close) endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::types::WeightUnit;

use crate::error::{AppError, AppResult};
use crate::external::ArtifactStore;
use crate::middleware::CurrentUser;
use crate::services::settlement::{CloseResult, SettlementService};
use crate::AppState;

/// Query parameters for closing a registro
#[derive(Debug, Deserialize)]
pub struct CloseParams {
    pub unidad: Option<WeightUnit>,
    pub solo_con_datos: Option<bool>,
}

/// Close the registro: multipart upload of the signed settlement PDF
pub async fn close_registro(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(registro_id): Path<Uuid>,
    Query(params): Query<CloseParams>,
    mut multipart: Multipart,
) -> AppResult<Json<CloseResult>> {
    let mut pdf_bytes = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("documento") {
            pdf_bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?
                .to_vec();
            break;
        }
    }

    let store = ArtifactStore::new(state.config.storage.root.clone());
    let service = SettlementService::new(state.db, store);
    let result = service
        .close(
            &current_user.0,
            registro_id,
            pdf_bytes,
            params.unidad.unwrap_or_default(),
            params.solo_con_datos.unwrap_or(false),
        )
        .await?;
    Ok(Json(result))
}

/// Download the stored settlement document
pub async fn get_settlement_document(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(registro_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let store = ArtifactStore::new(state.config.storage.root.clone());
    let service = SettlementService::new(state.db, store);
    let bytes = service.fetch_document(registro_id).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}
