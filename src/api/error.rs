// src/api/error.rs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::bidding::engine::ResolveError;
use crate::model::bid::ValidationError;

/// 对外的错误类型，每种错误对应一个 HTTP 状态码
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("render incomplete: {0}")]
    RenderIncomplete(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("timeout: {0}")]
    Timeout(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::RenderIncomplete(_) => "render_incomplete",
            ApiError::StoreUnavailable(_) => "store_unavailable",
            ApiError::Timeout(_) => "timeout",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RenderIncomplete(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ResolveError::RenderIncomplete(_) => ApiError::RenderIncomplete(err.to_string()),
            ResolveError::StoreUnavailable(_) => ApiError::StoreUnavailable(err.to_string()),
            ResolveError::Timeout(_) => ApiError::Timeout(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Unauthorized => None,
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => Some(msg.clone()),
            ApiError::RenderIncomplete(msg) => {
                error!(error = %msg, "creative template missing");
                Some(msg.clone())
            }
            ApiError::StoreUnavailable(msg) | ApiError::Timeout(msg) => {
                warn!(error = %msg, "creative store failure");
                Some(msg.clone())
            }
        };

        let body = ErrorResponse {
            error: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
