// src/api/auth.rs

//! Bearer token 校验中间件

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::debug;

use crate::api::error::ApiError;
use crate::AppState;

/// 要求 `Authorization: Bearer <token>` 与配置的共享密钥一致，
/// 校验失败直接返回 401，请求体不会被读取
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if tokens_match(token.as_bytes(), state.config.auth_token.as_bytes()) => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            debug!("invalid bearer token");
            Err(ApiError::Unauthorized)
        }
        None => {
            debug!("missing or malformed authorization header");
            Err(ApiError::Unauthorized)
        }
    }
}

/// 比较耗时只取决于长度，不会因第一个不同字节提前返回
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
