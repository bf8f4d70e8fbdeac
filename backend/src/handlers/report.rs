//! HTTP handlers for reporting endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::models::WasteReport;
use shared::types::{DateRange, WeightUnit};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ReportService;
use crate::AppState;

/// Common report query parameters
#[derive(Debug, Deserialize)]
pub struct ReportParams {
    pub unidad: Option<WeightUnit>,
    pub solo_con_datos: Option<bool>,
}

/// Date-window report query parameters
#[derive(Debug, Deserialize)]
pub struct DailyReportParams {
    pub desde: NaiveDate,
    /// Defaults to `desde` (single-day report)
    pub hasta: Option<NaiveDate>,
    pub unidad: Option<WeightUnit>,
    pub solo_con_datos: Option<bool>,
}

/// Report for one registro
pub async fn report_by_registro(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(registro_id): Path<Uuid>,
    Query(params): Query<ReportParams>,
) -> AppResult<Json<WasteReport>> {
    let service = ReportService::new(state.db);
    let report = service
        .by_registro(
            registro_id,
            params.unidad.unwrap_or_default(),
            params.solo_con_datos.unwrap_or(true),
        )
        .await?;
    Ok(Json(report))
}

/// Report over a day or date range of closed registros
pub async fn report_by_day(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(params): Query<DailyReportParams>,
) -> AppResult<Json<WasteReport>> {
    let service = ReportService::new(state.db);
    let unidad = params.unidad.unwrap_or_default();
    let solo_con_datos = params.solo_con_datos.unwrap_or(true);
    let report = match params.hasta {
        Some(hasta) => {
            let range = DateRange {
                start: params.desde,
                end: hasta,
            };
            service.by_range(range, unidad, solo_con_datos).await?
        }
        None => service.by_day(params.desde, unidad, solo_con_datos).await?,
    };
    Ok(Json(report))
}

/// Report for one registro as CSV
pub async fn report_by_registro_csv(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(registro_id): Path<Uuid>,
    Query(params): Query<ReportParams>,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(state.db);
    let report = service
        .by_registro(
            registro_id,
            params.unidad.unwrap_or_default(),
            params.solo_con_datos.unwrap_or(true),
        )
        .await?;
    let csv_data = ReportService::export_to_csv(&report)?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv_data))
}
