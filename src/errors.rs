use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispenserEngineError>;

/// No-op tap transitions (open an open tap, close a closed one) are not
/// errors; they surface as `Ok(false)` from the service and only the
/// transport layer turns them into 404 responses. This enum covers the
/// failures that are genuinely exceptional.
#[derive(Error, Debug)]
pub enum DispenserEngineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for DispenserEngineError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            DispenserEngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispenserEngineError::Validation(_) => StatusCode::BAD_REQUEST,
            DispenserEngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl DispenserEngineError {
    fn error_type(&self) -> &str {
        match self {
            DispenserEngineError::Database(_) => "database_error",
            DispenserEngineError::Validation(_) => "validation_error",
            DispenserEngineError::Internal(_) => "internal_error",
        }
    }
}
