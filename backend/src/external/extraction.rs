//! Bill Text-Extraction Client
//!
//! Client for the hosted bill text-extraction microservice. It takes a
//! scanned bill document and returns structured line items with confidence
//! scores. Extraction is best effort; everything it returns goes through
//! human review before any stock is touched.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::models::{ExtractedLineItem, ExtractionResult};

use crate::config::ExtractionConfig;
use crate::error::{AppError, AppResult};

/// Client for the bill text-extraction microservice
#[derive(Clone)]
pub struct ExtractionClient {
    api_endpoint: String,
    api_key: String,
    http_client: Client,
}

/// Request to extract line items from a scanned bill
#[derive(Debug, Serialize)]
pub struct ExtractBillRequest {
    pub document_base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Response from the extraction API
#[derive(Debug, Deserialize)]
pub struct ExtractBillResponse {
    pub bill_number: Option<String>,
    pub supplier_guess: Option<String>,
    pub bill_date: Option<chrono::NaiveDate>,
    pub lines: Vec<ExtractedLineResponse>,
}

/// One extracted line from the API
#[derive(Debug, Deserialize)]
pub struct ExtractedLineResponse {
    pub raw_name: String,
    pub quantity: i32,
    pub unit_price: rust_decimal::Decimal,
    pub confidence: f32,
}

impl From<ExtractBillResponse> for ExtractionResult {
    fn from(r: ExtractBillResponse) -> Self {
        ExtractionResult {
            // a bill the service could not number still needs review
            bill_number: r.bill_number.unwrap_or_default(),
            supplier_guess: r.supplier_guess,
            bill_date: r.bill_date,
            lines: r
                .lines
                .into_iter()
                .map(|line| ExtractedLineItem {
                    raw_name: line.raw_name,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    confidence: line.confidence.clamp(0.0, 1.0),
                })
                .collect(),
        }
    }
}

impl ExtractionClient {
    /// Create a new extraction client
    pub fn new(api_endpoint: String, api_key: String) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_endpoint,
            api_key,
            http_client,
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.api_endpoint.clone(), config.api_key.clone())
    }

    /// Send a scanned bill for text extraction
    pub async fn extract_bill(&self, request: ExtractBillRequest) -> AppResult<ExtractionResult> {
        let response = self
            .http_client
            .post(&self.api_endpoint)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExtractionError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExtractionError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let result: ExtractBillResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExtractionError(format!("Failed to parse response: {}", e)))?;

        Ok(result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn response_conversion_clamps_confidence() {
        let response = ExtractBillResponse {
            bill_number: Some("INV-77".to_string()),
            supplier_guess: None,
            bill_date: None,
            lines: vec![ExtractedLineResponse {
                raw_name: "tape".to_string(),
                quantity: 3,
                unit_price: Decimal::from_str("1.50").unwrap(),
                confidence: 1.2,
            }],
        };

        let result: ExtractionResult = response.into();
        assert_eq!(result.bill_number, "INV-77");
        assert_eq!(result.lines[0].confidence, 1.0);
    }

    #[test]
    fn missing_bill_number_becomes_empty() {
        let response = ExtractBillResponse {
            bill_number: None,
            supplier_guess: Some("Acme".to_string()),
            bill_date: None,
            lines: vec![],
        };
        let result: ExtractionResult = response.into();
        assert_eq!(result.bill_number, "");
    }
}
