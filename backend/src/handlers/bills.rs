//! HTTP handlers for scanned-bill endpoints
//!
//! The flow is scan -> review -> confirm. Scanning runs extraction and
//! returns suggested catalog mappings for human review; nothing is stored.
//! Confirming folds the reviewer's adjustments in and reconciles the bill as
//! one all-or-nothing stock batch.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::extraction::ExtractBillRequest;
use crate::external::ExtractionClient;
use crate::middleware::CurrentUser;
use crate::models::{apply_adjustments, ExtractionResult, LineAdjustment, ReconciledBill};
use crate::services::reconciliation::{
    MappingSuggestion, ReconcileBillInput, ReconcileOutcome, ReconciliationService,
};
use crate::services::ReplenishmentPolicy;
use crate::AppState;
use shared::types::DataEnvelope;

fn reconciliation(state: &AppState) -> ReconciliationService {
    let policy = ReplenishmentPolicy::from(&state.config.replenishment);
    ReconciliationService::new(state.db.clone(), policy)
}

/// Scan request: a base64-encoded bill document
#[derive(Debug, Deserialize, Validate)]
pub struct ScanBillRequest {
    #[validate(length(min = 1, message = "Document is required"))]
    pub document_base64: String,
    pub content_type: Option<String>,
}

/// Scan response: extraction output plus suggested catalog mappings
#[derive(Debug, Serialize)]
pub struct ScanBillResponse {
    pub extraction: ExtractionResult,
    pub suggestions: Vec<MappingSuggestion>,
}

/// Run extraction on a scanned bill and suggest catalog mappings
pub async fn scan_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ScanBillRequest>,
) -> AppResult<Json<DataEnvelope<ScanBillResponse>>> {
    if !current_user.0.has_permission("bills", "reconcile") {
        return Err(AppError::InsufficientPermissions);
    }
    request.validate()?;

    let client = ExtractionClient::from_config(&state.config.extraction);
    let extraction = client
        .extract_bill(ExtractBillRequest {
            document_base64: request.document_base64,
            content_type: request.content_type,
        })
        .await?;

    let lines = apply_adjustments(&extraction, &[]);
    let suggestions = reconciliation(&state).suggest_mappings(&lines).await?;

    Ok(Json(DataEnvelope::new(ScanBillResponse {
        extraction,
        suggestions,
    })))
}

/// Reconcile request: the reviewed extraction with adjustments to fold in
#[derive(Debug, Deserialize, Validate)]
pub struct ReconcileBillRequest {
    pub extraction: ExtractionResult,
    #[serde(default)]
    pub adjustments: Vec<LineAdjustment>,
    /// Reviewer-confirmed supplier name; falls back to the extraction guess
    #[validate(length(min = 1, message = "Supplier name cannot be empty"))]
    pub supplier_name: Option<String>,
    pub bill_date: Option<NaiveDate>,
}

/// Reconcile a reviewed bill and apply it to the catalog
pub async fn reconcile_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ReconcileBillRequest>,
) -> AppResult<Json<DataEnvelope<ReconcileOutcome>>> {
    if !current_user.0.has_permission("bills", "reconcile") {
        return Err(AppError::InsufficientPermissions);
    }
    request.validate()?;

    let lines = apply_adjustments(&request.extraction, &request.adjustments);
    let input = ReconcileBillInput {
        bill_number: request.extraction.bill_number.clone(),
        supplier_name: request
            .supplier_name
            .or(request.extraction.supplier_guess.clone()),
        bill_date: request.bill_date.or(request.extraction.bill_date),
        lines,
    };

    let outcome = reconciliation(&state).reconcile(input).await?;
    Ok(Json(DataEnvelope::new(outcome)))
}

/// List reconciled bills
pub async fn list_bills(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<DataEnvelope<Vec<ReconciledBill>>>> {
    let bills = reconciliation(&state).list().await?;
    Ok(Json(DataEnvelope::new(bills)))
}

/// Get a reconciled bill with its lines
pub async fn get_bill(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(bill_id): Path<Uuid>,
) -> AppResult<Json<DataEnvelope<ReconciledBill>>> {
    let bill = reconciliation(&state).get(bill_id).await?;
    Ok(Json(DataEnvelope::new(bill)))
}
