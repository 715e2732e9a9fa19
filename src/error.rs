use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by handlers. Every variant renders as `{"error": ...}`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Username or email already taken.
    #[error("{0}")]
    Duplicate(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Usuário não autenticado")]
    Unauthenticated,

    /// Missing entity, or one owned by somebody else.
    #[error("{0}")]
    NotFound(String),

    /// Lifecycle transition not allowed from the current status.
    #[error("{0}")]
    InvalidState(String),

    #[error("Erro interno do servidor")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Duplicate(_) | AppError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(anyhow::Error::new(e).context("database"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(ref e) = self {
            error!(error = ?e, "internal error");
        }
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
