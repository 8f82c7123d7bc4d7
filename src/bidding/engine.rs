// src/bidding/engine.rs

use std::sync::Arc;
use thiserror::Error;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::bidding::template::render_template;
use crate::model::bid::BannerType;
use crate::model::creative::{RenderedResponse, TrackingRecord};
use crate::store::{CreativeStore, StoreError};

/// 模板解析失败的原因
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no tracking record for creative {0}")]
    NotFound(String),
    #[error("template {0} is missing or empty")]
    RenderIncomplete(String),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
    #[error("creative resolution exceeded {0:?}")]
    Timeout(Duration),
}

/// **模板解析器**
///
/// 1. `HGETALL <id>` 取 tracking 记录，记录为空直接返回 NotFound，不再读模板
/// 2. `GET <id>_js` / `GET <id>_xml` 取模板
/// 3. 按 banner 类型替换占位符，选择 Content-Type
///
/// 整个过程受 `deadline` 约束，超时后两次读取都会被取消。
#[derive(Clone)]
pub struct TemplateResolver {
    store: Arc<dyn CreativeStore>,
    deadline: Duration,
}

impl TemplateResolver {
    pub fn new(store: Arc<dyn CreativeStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    pub async fn resolve(&self, creative_id: &str, banner_type: BannerType) -> Result<RenderedResponse, ResolveError> {
        timeout(self.deadline, self.resolve_inner(creative_id, banner_type))
            .await
            .map_err(|_| ResolveError::Timeout(self.deadline))?
    }

    async fn resolve_inner(&self, creative_id: &str, banner_type: BannerType) -> Result<RenderedResponse, ResolveError> {
        let record = TrackingRecord::from(self.store.hash_get_all(creative_id).await?);
        if record.is_empty() {
            return Err(ResolveError::NotFound(creative_id.to_string()));
        }

        let template_key = banner_type.template_key(creative_id);
        let template = match self.store.get(&template_key).await? {
            Some(template) if !template.is_empty() => template,
            _ => return Err(ResolveError::RenderIncomplete(template_key)),
        };
        debug!(creative_id, %banner_type, template_len = template.len(), "template fetched");

        Ok(RenderedResponse {
            body: render_template(&template, &record, banner_type.placeholders()),
            content_type: banner_type.content_type(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 带调用计数的内存存储，可以模拟故障和慢响应
    #[derive(Default)]
    pub(crate) struct CountingStore {
        pub hashes: HashMap<String, HashMap<String, Vec<u8>>>,
        pub strings: HashMap<String, Vec<u8>>,
        pub hash_calls: AtomicUsize,
        pub get_calls: AtomicUsize,
        pub get_keys: Mutex<Vec<String>>,
        pub fail: bool,
        pub delay: Option<Duration>,
    }

    impl CountingStore {
        pub fn with_creative(mut self, id: &str, fields: &[(&str, &str)]) -> Self {
            self.hashes.insert(
                id.to_string(),
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
            );
            self
        }

        pub fn with_string(self, key: &str, value: &str) -> Self {
            self.with_bytes(key, value.as_bytes())
        }

        pub fn with_bytes(mut self, key: &str, value: &[u8]) -> Self {
            self.strings.insert(key.to_string(), value.to_vec());
            self
        }
    }

    #[async_trait]
    impl CreativeStore for CountingStore {
        async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, StoreError> {
            self.hash_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(StoreError::Connection("connection refused".to_string()));
            }
            Ok(self.hashes.get(key).cloned().unwrap_or_default())
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.get_keys.lock().unwrap().push(key.to_string());
            Ok(self.strings.get(key).cloned())
        }
    }

    fn resolver(store: Arc<CountingStore>) -> TemplateResolver {
        TemplateResolver::new(store, Duration::from_millis(250))
    }

    #[tokio::test]
    async fn test_display_scenario() {
        let store = Arc::new(
            CountingStore::default()
                .with_creative("c", &[("click", "c1"), ("impression", "i1")])
                .with_string("c_js", "<a href={click}>{impression}</a>"),
        );
        let rendered = resolver(store.clone()).resolve("c", BannerType::Display).await.unwrap();

        assert_eq!(rendered.body, b"<a href=c1>i1</a>");
        assert_eq!(rendered.content_type, "text/json");
        assert_eq!(*store.get_keys.lock().unwrap(), vec!["c_js".to_string()]);
    }

    #[tokio::test]
    async fn test_partial_record_renders_empty_fields() {
        let store = Arc::new(
            CountingStore::default()
                .with_creative("c", &[("click", "c1")])
                .with_string("c_js", "{click}-{impression}"),
        );
        let rendered = resolver(store).resolve("c", BannerType::Display).await.unwrap();
        assert_eq!(rendered.body, b"c1-");
    }

    #[tokio::test]
    async fn test_video_scenario() {
        let store = Arc::new(
            CountingStore::default()
                .with_creative(
                    "v",
                    &[
                        ("click", "C"),
                        ("impression", "I"),
                        ("video_url", "U"),
                        ("video_start", "S"),
                        ("video_end", "E"),
                    ],
                )
                .with_string("v_xml", "<VAST>{video_url}|{video_start}|{video_end}|{impression}|{click}</VAST>"),
        );
        let rendered = resolver(store.clone()).resolve("v", BannerType::Video).await.unwrap();

        assert_eq!(rendered.body, b"<VAST>U|S|E|I|C</VAST>");
        assert_eq!(rendered.content_type, "text/xml");
        assert_eq!(*store.get_keys.lock().unwrap(), vec!["v_xml".to_string()]);
    }

    #[tokio::test]
    async fn test_non_utf8_template_renders() {
        let store = Arc::new(
            CountingStore::default()
                .with_creative("c", &[("click", "c1")])
                .with_bytes("c_js", b"\xb9\xe3{click}\xb8\xe6"),
        );
        let rendered = resolver(store).resolve("c", BannerType::Display).await.unwrap();

        assert_eq!(rendered.body, b"\xb9\xe3c1\xb8\xe6");
        assert_eq!(rendered.content_type, "text/json");
    }

    #[tokio::test]
    async fn test_missing_record_skips_template_lookup() {
        let store = Arc::new(CountingStore::default().with_string("ghost_js", "{click}"));
        let err = resolver(store.clone()).resolve("ghost", BannerType::Display).await.unwrap_err();

        assert!(matches!(err, ResolveError::NotFound(ref id) if id == "ghost"));
        assert_eq!(store.hash_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_or_empty_template_is_render_incomplete() {
        let store = Arc::new(
            CountingStore::default()
                .with_creative("c", &[("click", "c1")])
                .with_string("c_xml", ""),
        );
        let resolver = resolver(store);

        let err = resolver.resolve("c", BannerType::Display).await.unwrap_err();
        assert!(matches!(err, ResolveError::RenderIncomplete(ref key) if key == "c_js"));

        let err = resolver.resolve("c", BannerType::Video).await.unwrap_err();
        assert!(matches!(err, ResolveError::RenderIncomplete(ref key) if key == "c_xml"));
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let store = Arc::new(CountingStore { fail: true, ..Default::default() });
        let err = resolver(store.clone()).resolve("c", BannerType::Display).await.unwrap_err();

        assert!(matches!(err, ResolveError::StoreUnavailable(StoreError::Connection(_))));
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = Arc::new(
            CountingStore {
                delay: Some(Duration::from_secs(5)),
                ..Default::default()
            }
            .with_creative("c", &[("click", "c1")])
            .with_string("c_js", "{click}"),
        );
        let err = resolver(store.clone()).resolve("c", BannerType::Display).await.unwrap_err();

        assert!(matches!(err, ResolveError::Timeout(d) if d == Duration::from_millis(250)));
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_content_type_follows_banner_type_only() {
        let store = Arc::new(
            CountingStore::default()
                .with_creative("c", &[("unrelated", "x")])
                .with_string("c_js", "js")
                .with_string("c_xml", "xml"),
        );
        let resolver = resolver(store);

        let display = resolver.resolve("c", BannerType::Display).await.unwrap();
        let video = resolver.resolve("c", BannerType::Video).await.unwrap();
        assert_eq!((display.body.as_slice(), display.content_type), (&b"js"[..], "text/json"));
        assert_eq!((video.body.as_slice(), video.content_type), (&b"xml"[..], "text/xml"));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let store = Arc::new(
            CountingStore::default()
                .with_creative("c", &[("click", "c1"), ("impression", "i1")])
                .with_string("c_js", "{impression}:{click}"),
        );
        let resolver = resolver(store);

        let first = resolver.resolve("c", BannerType::Display).await.unwrap();
        let second = resolver.resolve("c", BannerType::Display).await.unwrap();
        assert_eq!(first, second);
    }
}
