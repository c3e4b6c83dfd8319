//! NATS message envelopes

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Error codes returned in `ErrorResponse`
pub mod codes {
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const LOCATION_NOT_FOUND: &str = "LOCATION_NOT_FOUND";
    pub const SCHEDULE_FAILED: &str = "SCHEDULE_FAILED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Generic request wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<T> {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

#[cfg(test)]
impl<T> Request<T> {
    pub fn new(payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Generic success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse<T> {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(request_id: Uuid, payload: T) -> Self {
        Self {
            id: request_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(request_id: Uuid, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: request_id,
            timestamp: Utc::now(),
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_omits_missing_details() {
        let response = ErrorResponse::new(Uuid::nil(), codes::INVALID_REQUEST, "bad");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn error_response_carries_details() {
        let response = ErrorResponse::new(Uuid::nil(), codes::INVALID_REQUEST, "bad")
            .with_details(serde_json::json!([{"field": "current_cycle_used"}]));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["details"][0]["field"], "current_cycle_used");
    }

    #[test]
    fn request_parses_camel_case_envelope() {
        let raw = r#"{
            "id": "00000000-0000-0000-0000-000000000000",
            "timestamp": "2026-02-22T06:00:00Z",
            "payload": {}
        }"#;
        let request: Request<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(request.id.is_nil());
        assert!(request.payload.is_object());
    }

    #[test]
    fn success_response_echoes_request_id() {
        let request = Request::new(serde_json::json!({}));
        let response = SuccessResponse::new(request.id, 42);
        assert_eq!(response.id, request.id);
        assert_eq!(response.payload, 42);
    }
}
