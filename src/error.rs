use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{repository::RepositoryError, response, validation::ValidationFailure};

pub const TODO_NOT_FOUND: &str = "todo_not_found";
pub const INVALID_TODO_PROVIDED: &str = "invalid_todo_provided";
pub const MISSING_ARGUMENT: &str = "missing_argument";
pub const MISSING_VALIDATION: &str = "missing_validation";
pub const INTERNAL_SERVER_ERROR: &str = "internal_server_error";
pub const REQUEST_TIMEOUT: &str = "request_timeout";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body is not a decodable todo.
    #[error("request body could not be decoded")]
    MissingArgument,

    #[error("validation failed: {0}")]
    Validation(ValidationFailure),

    #[error("todo not found")]
    NotFound,

    /// No usable id, or storage refused the row.
    #[error("invalid todo provided")]
    InvalidTodo,

    #[error("internal server error")]
    Internal,

    #[error("request timed out")]
    Timeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingArgument | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::InvalidTodo => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingArgument => MISSING_ARGUMENT,
            Self::Validation(_) => MISSING_VALIDATION,
            Self::NotFound => TODO_NOT_FOUND,
            Self::InvalidTodo => INVALID_TODO_PROVIDED,
            Self::Internal => INTERNAL_SERVER_ERROR,
            Self::Timeout => REQUEST_TIMEOUT,
        }
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => {
                tracing::debug!(id, "todo vanished before write");
                Self::NotFound
            }
            RepositoryError::Rejected(reason) => {
                tracing::warn!(%reason, "storage rejected todo");
                Self::InvalidTodo
            }
            RepositoryError::Storage(source) => {
                tracing::error!(error = %source, "storage failure");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let warn = match self {
            Self::Validation(failure) => Some(failure.to_string()),
            _ => None,
        };
        response::error(status, code, warn).into_response()
    }
}
