//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Fixed response envelope for API list and detail payloads.
///
/// Every endpoint that returns records wraps them in `{"data": ...}` so the
/// wire schema is a stable contract rather than a shape the client has to
/// probe for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_under_data_key() {
        let envelope = DataEnvelope::new(vec![1, 2, 3]);
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"data":[1,2,3]}"#);
    }
}
