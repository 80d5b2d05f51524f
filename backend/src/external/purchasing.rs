//! Purchasing System Client
//!
//! Client for the external Purchasing system. Submitting a draft hands the
//! order over: the Purchasing system assigns the order number and owns the
//! status lifecycle from then on; this service only reads it back.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::models::PurchaseOrderDraft;

use crate::config::PurchasingConfig;
use crate::error::{AppError, AppResult};

/// Client for the external Purchasing system
#[derive(Clone)]
pub struct PurchasingClient {
    api_endpoint: String,
    api_key: String,
    http_client: Client,
}

/// Order submission payload
#[derive(Debug, Serialize)]
pub struct SubmitOrderRequest {
    pub supplier_id: uuid::Uuid,
    pub expected_delivery: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub lines: Vec<SubmitOrderLine>,
}

/// One line of the submission payload
#[derive(Debug, Serialize)]
pub struct SubmitOrderLine {
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: rust_decimal::Decimal,
}

/// Confirmation returned by the Purchasing system
#[derive(Debug, Deserialize)]
pub struct OrderConfirmation {
    pub order_number: String,
    pub status: String,
}

/// Remote order status
#[derive(Debug, Deserialize)]
pub struct OrderStatusResponse {
    pub order_number: String,
    pub status: String,
}

impl PurchasingClient {
    /// Create a new purchasing client
    pub fn new(api_endpoint: String, api_key: String) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_endpoint,
            api_key,
            http_client,
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &PurchasingConfig) -> Self {
        Self::new(config.api_endpoint.clone(), config.api_key.clone())
    }

    /// Submit a draft as a purchase order
    pub async fn submit_order(&self, draft: &PurchaseOrderDraft) -> AppResult<OrderConfirmation> {
        let request = SubmitOrderRequest {
            supplier_id: draft.supplier_id,
            expected_delivery: draft.expected_delivery,
            notes: draft.notes.clone(),
            lines: draft
                .lines
                .iter()
                .map(|line| SubmitOrderLine {
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        };

        let url = format!("{}/orders", self.api_endpoint);
        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::PurchasingError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::PurchasingError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let confirmation: OrderConfirmation = response
            .json()
            .await
            .map_err(|e| AppError::PurchasingError(format!("Failed to parse response: {}", e)))?;

        Ok(confirmation)
    }

    /// Fetch the current status of a submitted order
    pub async fn get_order_status(&self, order_number: &str) -> AppResult<OrderStatusResponse> {
        let url = format!("{}/orders/{}", self.api_endpoint, order_number);

        let response = self
            .http_client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::PurchasingError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::PurchasingError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let result: OrderStatusResponse = response
            .json()
            .await
            .map_err(|e| AppError::PurchasingError(format!("Failed to parse response: {}", e)))?;

        Ok(result)
    }
}
