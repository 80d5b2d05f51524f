//! HTTP handlers for purchase-order draft endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::PurchasingClient;
use crate::middleware::CurrentUser;
use crate::models::PurchaseOrderDraft;
use crate::services::planner::CreateDraftInput;
use crate::services::{PlannerService, ReplenishmentPolicy};
use crate::AppState;
use shared::types::DataEnvelope;

fn planner(state: &AppState) -> PlannerService {
    let policy = ReplenishmentPolicy::from(&state.config.replenishment);
    PlannerService::new(state.db.clone(), policy)
}

/// Create a purchase-order draft from an alert or manually
pub async fn create_draft(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateDraftInput>,
) -> AppResult<Json<DataEnvelope<PurchaseOrderDraft>>> {
    if !current_user.0.has_permission("purchasing", "create") {
        return Err(AppError::InsufficientPermissions);
    }
    input.validate()?;

    let draft = planner(&state).create(input).await?;
    Ok(Json(DataEnvelope::new(draft)))
}

/// List purchase-order drafts
pub async fn list_drafts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<DataEnvelope<Vec<PurchaseOrderDraft>>>> {
    let drafts = planner(&state).list().await?;
    Ok(Json(DataEnvelope::new(drafts)))
}

/// Get a purchase-order draft by id
pub async fn get_draft(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(draft_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<PurchaseOrderDraft>>> {
    let draft = planner(&state).get(draft_id).await?;
    Ok(Json(DataEnvelope::new(draft)))
}

/// Submit a draft to the external Purchasing system
pub async fn submit_draft(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(draft_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<PurchaseOrderDraft>>> {
    if !current_user.0.has_permission("purchasing", "create") {
        return Err(AppError::InsufficientPermissions);
    }

    let client = PurchasingClient::from_config(&state.config.purchasing);
    let draft = planner(&state).submit(draft_id, &client).await?;
    Ok(Json(DataEnvelope::new(draft)))
}

/// Refresh a submitted draft's status from the Purchasing system
pub async fn sync_draft(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(draft_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<PurchaseOrderDraft>>> {
    if !current_user.0.has_permission("purchasing", "create") {
        return Err(AppError::InsufficientPermissions);
    }

    let client = PurchasingClient::from_config(&state.config.purchasing);
    let draft = planner(&state).sync(draft_id, &client).await?;
    Ok(Json(DataEnvelope::new(draft)))
}
