use actix_web::{http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Errors surfaced by the matching engine
#[derive(Debug, Error)]
pub enum MatchError {
    /// Malformed or missing required preference fields. Surfaced to the
    /// caller, never retried.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Referenced requester history absent when history use was
    /// explicitly requested.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failure in the backing data store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::Validation(_) => StatusCode::BAD_REQUEST,
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MatchError::Validation(_) => "validation_error",
            MatchError::NotFound(_) => "not_found",
            MatchError::Store(_) => "store_error",
        }
    }
}

impl actix_web::error::ResponseError for MatchError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// Errors that can occur loading fixture data
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            MatchError::Validation("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MatchError::NotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
