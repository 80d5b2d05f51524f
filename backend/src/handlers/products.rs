//! HTTP handlers for catalog endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{Product, StockMovement};
use crate::services::{CatalogService, ReplenishmentPolicy};
use crate::AppState;
use shared::types::DataEnvelope;

fn catalog(state: AppState) -> CatalogService {
    let policy = ReplenishmentPolicy::from(&state.config.replenishment);
    CatalogService::new(state.db, policy)
}

/// List active products
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<DataEnvelope<Vec<Product>>>> {
    let products = catalog(state).list().await?;
    Ok(Json(DataEnvelope::new(products)))
}

/// Get a product by id
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<Product>>> {
    let product = catalog(state).get(product_id).await?;
    Ok(Json(DataEnvelope::new(product)))
}

/// List products at or below their threshold, most critical first
pub async fn list_below_threshold(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<DataEnvelope<Vec<Product>>>> {
    let products = catalog(state).list_below_threshold().await?;
    Ok(Json(DataEnvelope::new(products)))
}

/// Stock adjustment request
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustStockRequest {
    /// Signed stock delta; positive receives, negative dispatches
    pub delta: i32,
    #[validate(length(min = 1, message = "Reason cannot be empty"))]
    pub reason: Option<String>,
}

/// Apply a stock adjustment to a product
pub async fn adjust_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> AppResult<Json<DataEnvelope<Product>>> {
    if !current_user.0.has_permission("inventory", "adjust") {
        return Err(AppError::InsufficientPermissions);
    }
    request.validate()?;
    if request.delta == 0 {
        return Err(AppError::Validation {
            field: "delta".to_string(),
            message: "Delta must be non-zero".to_string(),
        });
    }

    let reason = request
        .reason
        .unwrap_or_else(|| "manual-adjustment".to_string());
    let product = catalog(state)
        .adjust_stock(product_id, request.delta, &reason)
        .await?;
    Ok(Json(DataEnvelope::new(product)))
}

/// List the stock movement audit trail for a product
pub async fn list_stock_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<Vec<StockMovement>>>> {
    let movements = catalog(state).list_movements(product_id).await?;
    Ok(Json(DataEnvelope::new(movements)))
}
