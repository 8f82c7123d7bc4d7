// src/model/creative.rs

use std::collections::HashMap;

/// 模板中可以出现的 tracking 占位符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Click,
    Impression,
    VideoUrl,
    VideoStart,
    VideoEnd,
}

impl Placeholder {
    /// 对应的 hash 字段名
    pub fn field(self) -> &'static str {
        match self {
            Placeholder::Click => "click",
            Placeholder::Impression => "impression",
            Placeholder::VideoUrl => "video_url",
            Placeholder::VideoStart => "video_start",
            Placeholder::VideoEnd => "video_end",
        }
    }

    /// 模板中的字面 token，例如 `{click}`
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Click => "{click}",
            Placeholder::Impression => "{impression}",
            Placeholder::VideoUrl => "{video_url}",
            Placeholder::VideoStart => "{video_start}",
            Placeholder::VideoEnd => "{video_end}",
        }
    }
}

/// **创意的 tracking 记录**，存储为以创意 id 为 key 的 hash
///
/// 字段值按原始字节保存，不要求是 UTF-8。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingRecord {
    fields: HashMap<String, Vec<u8>>,
}

impl TrackingRecord {
    pub fn new(fields: HashMap<String, Vec<u8>>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 缺失的字段按空值处理
    pub fn value(&self, placeholder: Placeholder) -> &[u8] {
        self.fields
            .get(placeholder.field())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl From<HashMap<String, Vec<u8>>> for TrackingRecord {
    fn from(fields: HashMap<String, Vec<u8>>) -> Self {
        Self::new(fields)
    }
}

/// 渲染结果：响应体 + Content-Type，响应体原样透传模板字节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_is_empty() {
        let mut fields = HashMap::new();
        fields.insert("click".to_string(), b"c1".to_vec());
        let record = TrackingRecord::from(fields);

        assert!(!record.is_empty());
        assert_eq!(record.value(Placeholder::Click), b"c1");
        assert_eq!(record.value(Placeholder::Impression), b"");
    }

    #[test]
    fn test_token_wraps_field_name() {
        for p in [
            Placeholder::Click,
            Placeholder::Impression,
            Placeholder::VideoUrl,
            Placeholder::VideoStart,
            Placeholder::VideoEnd,
        ] {
            assert_eq!(p.token(), format!("{{{}}}", p.field()));
        }
    }
}
