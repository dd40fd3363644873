//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` for every failure an export request can hit and
//! implements Axum's `IntoResponse` so handlers can return it directly as a
//! JSON error body.
//!
//! Error mappings:
//! - `Input` → 400
//! - `UpstreamFetch`, `Git` → 502
//! - `RenderEngine` → 500 (504 on timeout)
//! - `Serialization` → 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Required input missing or empty; the caller can fix it.
    #[error("Invalid input: {0}")]
    Input(String),

    /// A collaborator (path listing, file content, history) failed.
    #[error("{0}")]
    UpstreamFetch(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// The headless layout engine failed to launch or render.
    #[error("Render engine error: {0}")]
    RenderEngine(String),

    #[error("Render engine timed out after {0} seconds")]
    RenderTimeout(u64),

    /// Encoding the target format failed after composition succeeded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    pub fn input(msg: impl Into<String>) -> Self {
        AppError::Input(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        AppError::UpstreamFetch(msg.into())
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        AppError::RenderEngine(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        AppError::Serialization(msg.into())
    }

    /// Whether retrying the same collaborator call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::UpstreamFetch(_) | AppError::Git(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamFetch(_) | AppError::Git(_) => StatusCode::BAD_GATEWAY,
            AppError::RenderEngine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RenderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(e: zip::result::ZipError) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
