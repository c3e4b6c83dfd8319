//! Ping handler for health checks

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{codes, ErrorResponse, Request, SuccessResponse};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PingRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PongResponse {
    pub message: String,
    pub version: String,
    /// Name of the geocoder and routing service in use
    pub geocoder: String,
    pub routing: String,
}

/// Build the reply for one ping payload
pub fn respond(payload: &[u8], geocoder: &str, routing: &str) -> Result<Vec<u8>> {
    let request: Request<PingRequest> = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => {
            warn!("Failed to parse ping request: {}", e);
            let error = ErrorResponse::new(
                Uuid::nil(),
                codes::INVALID_REQUEST,
                format!("Failed to parse request: {}", e),
            );
            return Ok(serde_json::to_vec(&error)?);
        }
    };

    let response = PongResponse {
        message: request
            .payload
            .message
            .map(|m| format!("Pong: {}", m))
            .unwrap_or_else(|| "Pong".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        geocoder: geocoder.to_string(),
        routing: routing.to_string(),
    };

    Ok(serde_json::to_vec(&SuccessResponse::new(request.id, response))?)
}

/// Handle ping messages
pub async fn handle_ping(
    client: Client,
    mut subscriber: Subscriber,
    geocoder: String,
    routing: String,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received ping message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Ping message without reply subject");
                continue;
            }
        };

        let response = respond(&msg.payload, &geocoder, &routing)?;
        client.publish(reply, response.into()).await?;

        debug!("Sent pong response");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_echoes_message_and_request_id() {
        let request = Request::new(PingRequest {
            message: Some("hello".to_string()),
        });
        let bytes = respond(&serde_json::to_vec(&request).unwrap(), "city-table", "estimate").unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["id"], request.id.to_string());
        assert_eq!(json["payload"]["message"], "Pong: hello");
        assert_eq!(json["payload"]["geocoder"], "city-table");
        assert_eq!(json["payload"]["routing"], "estimate");
    }

    #[test]
    fn pong_without_message() {
        let request = Request::new(PingRequest::default());
        let bytes = respond(&serde_json::to_vec(&request).unwrap(), "mock", "osrm").unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["payload"]["message"], "Pong");
    }

    #[test]
    fn garbage_payload_gets_invalid_request() {
        let bytes = respond(b"not json", "mock", "estimate").unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    }
}
