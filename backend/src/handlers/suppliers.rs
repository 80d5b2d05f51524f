//! HTTP handlers for supplier endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::Supplier;
use crate::services::{CatalogService, ReplenishmentPolicy};
use crate::AppState;
use shared::types::DataEnvelope;

/// List suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<DataEnvelope<Vec<Supplier>>>> {
    let policy = ReplenishmentPolicy::from(&state.config.replenishment);
    let service = CatalogService::new(state.db, policy);
    let suppliers = service.list_suppliers().await?;
    Ok(Json(DataEnvelope::new(suppliers)))
}
