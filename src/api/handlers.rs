// src/api/handlers.rs

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::logging::bid_log::BidLog;
use crate::model::bid::BidRequest;
use crate::model::creative::RenderedResponse;
use crate::AppState;

/// **处理 /bid 请求**
///
/// 解析请求体 → 校验 → 解析模板，任何一步失败都直接返回错误响应。
/// 请求体按 JSON 解析，不检查请求的 Content-Type。
pub async fn handle_bid(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let start = Instant::now();
    let mut bid_log = BidLog::new(&request_id);

    let result = render_bid(&state, &body, &mut bid_log)
        .instrument(info_span!("bid", request_id = %request_id))
        .await;
    bid_log.set_elapsed(start.elapsed());

    let mut response = match result {
        Ok(rendered) => {
            bid_log.set_success(rendered.content_type, rendered.body.len());
            ([(CONTENT_TYPE, rendered.content_type)], rendered.body).into_response()
        }
        Err(err) => {
            bid_log.set_failure(err.kind(), err.status().as_u16());
            // 服务端故障同时记入运行日志
            if err.status().is_server_error() {
                state
                    .runtime_logger
                    .log("ERROR", &format!("request {} failed: {}", request_id, err))
                    .await;
            }
            err.into_response()
        }
    };
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }

    state.log_manager.log(&bid_log);
    response
}

async fn render_bid(state: &AppState, body: &[u8], bid_log: &mut BidLog) -> Result<RenderedResponse, ApiError> {
    let request: BidRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
    bid_log.set_request(&request);

    let bid = request.validate()?;
    debug!(
        creative_id = %bid.id,
        banner_type = %bid.banner_type,
        width = bid.width,
        height = bid.height,
        "bid request validated"
    );

    Ok(state.resolver.resolve(&bid.id, bid.banner_type).await?)
}

/// 健康检查，不需要鉴权
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
    }))
}
