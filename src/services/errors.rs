use super::extractor::ExtractionError;
use crate::connectors::ConnectorError;
use crate::helpers::{JsonError, INTERNAL_ERROR_MESSAGE};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

/// Failure of a whole pipeline invocation. This is the boundary where every
/// error is logged and turned into a response; internals never reach the
/// caller for server-side failures.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("Instance catalog unavailable: {0}")]
    Catalog(#[source] ConnectorError),
    #[error("Object storage failure: {0}")]
    Storage(#[source] ConnectorError),
    #[error("Malformed spreadsheet: {0}")]
    Spreadsheet(#[from] csv::Error),
    #[error("Malformed workbook: {0}")]
    Workbook(String),
    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => INTERNAL_ERROR_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

impl ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::Spreadsheet(_) | Self::Workbook(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Extraction(ExtractionError::Provider(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Extraction(_) => StatusCode::BAD_REQUEST,
            Self::Storage(ConnectorError::NotFound(_)) => StatusCode::BAD_REQUEST,
            Self::Catalog(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, detail = ?self, "Pipeline failed");
        } else {
            tracing::warn!(error = %self, "Rejected request");
        }
        JsonError::new(self.public_message()).respond(status)
    }
}
