use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Body of every error response: `{"error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonError {
    pub error: String,
}

impl JsonError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let error = if message.trim().is_empty() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        Self { error }
    }

    pub fn respond(self, status: StatusCode) -> HttpResponse {
        tracing::debug!(status = %status, error = %self.error, "Responding with error");
        HttpResponse::build(status).json(self)
    }

    pub fn bad_request(message: impl Into<String>) -> HttpResponse {
        Self::new(message).respond(StatusCode::BAD_REQUEST)
    }
}
