use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Poll not found")]
    PollNotFound,
    #[error("Option not found")]
    OptionNotFound,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl PollError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PollError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PollError::PollNotFound | PollError::OptionNotFound => StatusCode::NOT_FOUND,
            PollError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let error_message = match &self {
            PollError::InvalidRequest(_) => "Invalid request",
            PollError::PollNotFound => "Poll not found",
            PollError::OptionNotFound => "Option not found",
            PollError::DatabaseError(_) => "Database error",
        };

        if let PollError::DatabaseError(msg) = &self {
            tracing::error!("database error: {}", msg);
        }

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (self.status_code(), body).into_response()
    }
}

impl From<sqlx::Error> for PollError {
    fn from(error: sqlx::Error) -> Self {
        PollError::DatabaseError(error.to_string())
    }
}
