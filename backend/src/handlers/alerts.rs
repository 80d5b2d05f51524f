//! HTTP handlers for alert ledger endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{Alert, AlertKind, AlertStatus};
use crate::services::alerts::CreateManualAlertInput;
use crate::services::monitor::SweepSummary;
use crate::services::{AlertService, MonitorService, ReplenishmentPolicy};
use crate::AppState;
use shared::types::DataEnvelope;

/// Alert list filters
#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    #[serde(rename = "type")]
    pub kind: Option<AlertKind>,
    pub status: Option<AlertStatus>,
}

/// List alerts, optionally filtered by kind and status
pub async fn list_alerts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<AlertListQuery>,
) -> AppResult<Json<DataEnvelope<Vec<Alert>>>> {
    let service = AlertService::new(state.db);
    let alerts = service.list(query.kind, query.status).await?;
    Ok(Json(DataEnvelope::new(alerts)))
}

/// Get an alert by id
pub async fn get_alert(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<Alert>>> {
    let service = AlertService::new(state.db);
    let alert = service.get(alert_id).await?;
    Ok(Json(DataEnvelope::new(alert)))
}

/// Acknowledge an active alert
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<Alert>>> {
    if !current_user.0.has_permission("alerts", "manage") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = AlertService::new(state.db);
    let alert = service.acknowledge(alert_id).await?;
    Ok(Json(DataEnvelope::new(alert)))
}

/// Resolve an alert
pub async fn resolve_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<Alert>>> {
    if !current_user.0.has_permission("alerts", "manage") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = AlertService::new(state.db);
    let alert = service.resolve(alert_id).await?;
    Ok(Json(DataEnvelope::new(alert)))
}

/// Trigger a threshold sweep immediately instead of waiting for the next
/// scheduled one
pub async fn trigger_sweep(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DataEnvelope<SweepSummary>>> {
    if !current_user.0.has_permission("alerts", "manage") {
        return Err(AppError::InsufficientPermissions);
    }

    let policy = ReplenishmentPolicy::from(&state.config.replenishment);
    let monitor = MonitorService::new(state.db, policy);
    let summary = monitor.sweep().await?;
    Ok(Json(DataEnvelope::new(summary)))
}

/// Create a manual alert
pub async fn create_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateManualAlertInput>,
) -> AppResult<Json<DataEnvelope<Alert>>> {
    if !current_user.0.has_permission("alerts", "manage") {
        return Err(AppError::InsufficientPermissions);
    }
    input.validate()?;
    if input.message.trim().is_empty() {
        return Err(AppError::Validation {
            field: "message".to_string(),
            message: "Message is required".to_string(),
        });
    }

    let service = AlertService::new(state.db);
    let alert = service.create_manual(input).await?;
    Ok(Json(DataEnvelope::new(alert)))
}
