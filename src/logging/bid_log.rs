// src/logging/bid_log.rs

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::model::bid::BidRequest;

/// **单次 /bid 请求的日志**
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BidLog {
    pub timestamp: String,          // 记录时间
    pub log_type: String,           // 固定为 "bid_render"
    pub request_id: String,         // 服务端生成的请求 uuid
    pub creative_id: String,        // 请求中的创意 id
    pub banner_type: i64,           // 原始 banner.type
    pub width: u32,
    pub height: u32,
    pub status: String,             // "success" 或错误类型
    pub http_status: u16,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub elapsed_ms: u128,
}

impl BidLog {
    /// **创建请求日志**，默认状态为失败，后续更新
    pub fn new(request_id: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            log_type: "bid_render".to_string(),
            request_id: request_id.to_string(),
            creative_id: String::new(),
            banner_type: 0,
            width: 0,
            height: 0,
            status: "failure".to_string(),
            http_status: 0,
            content_type: None,
            body_len: 0,
            elapsed_ms: 0,
        }
    }

    /// **记录请求参数**
    pub fn set_request(&mut self, request: &BidRequest) {
        self.creative_id = request.id.clone();
        self.banner_type = request.banner.kind;
        self.width = request.width;
        self.height = request.height;
    }

    /// **记录渲染成功**
    pub fn set_success(&mut self, content_type: &str, body_len: usize) {
        self.status = "success".to_string();
        self.http_status = 200;
        self.content_type = Some(content_type.to_string());
        self.body_len = body_len;
    }

    /// **记录失败**
    pub fn set_failure(&mut self, kind: &str, http_status: u16) {
        self.status = kind.to_string();
        self.http_status = http_status;
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bid::Banner;

    #[test]
    fn test_bid_log_lifecycle() {
        let mut log = BidLog::new("req-1");
        assert_eq!(log.status, "failure");

        log.set_request(&BidRequest {
            id: "id_123".to_string(),
            width: 600,
            height: 328,
            banner: Banner { kind: 2 },
        });
        log.set_success("text/xml", 42);
        log.set_elapsed(Duration::from_millis(7));

        let json: serde_json::Value = serde_json::to_value(&log).unwrap();
        assert_eq!(json["creative_id"], "id_123");
        assert_eq!(json["banner_type"], 2);
        assert_eq!(json["status"], "success");
        assert_eq!(json["http_status"], 200);
        assert_eq!(json["content_type"], "text/xml");
        assert_eq!(json["elapsed_ms"], 7);
    }
}
