//! HTTP handlers for the read-only catalog endpoints

use axum::{extract::State, Json};

use shared::models::{Area, Bag, WasteCategory};

use crate::error::AppResult;
use crate::services::CatalogService;
use crate::AppState;

/// List hospital areas
pub async fn list_areas(State(state): State<AppState>) -> AppResult<Json<Vec<Area>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_areas().await?))
}

/// List bag presets
pub async fn list_bags(State(state): State<AppState>) -> AppResult<Json<Vec<Bag>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_bags().await?))
}

/// List waste categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<WasteCategory>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_categories().await?))
}
