// src/model/bid.rs

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

use crate::model::creative::Placeholder;

/// **广告位类型**
/// 只接受 1 = Display, 2 = Video，其余值一律视为无效请求
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "i64", into = "i64")]
pub enum BannerType {
    Display = 1,
    Video = 2,
}

impl TryFrom<i64> for BannerType {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(BannerType::Display),
            2 => Ok(BannerType::Video),
            other => Err(ValidationError::UnknownBannerType(other)),
        }
    }
}

impl From<BannerType> for i64 {
    fn from(banner: BannerType) -> Self {
        banner as i64
    }
}

impl BannerType {
    /// 模板在存储中的 key 后缀
    pub fn template_suffix(self) -> &'static str {
        match self {
            BannerType::Display => "_js",
            BannerType::Video => "_xml",
        }
    }

    /// 响应的 Content-Type
    pub fn content_type(self) -> &'static str {
        match self {
            BannerType::Display => "text/json",
            BannerType::Video => "text/xml",
        }
    }

    /// 该类型需要替换的占位符，按固定顺序
    pub fn placeholders(self) -> &'static [Placeholder] {
        match self {
            BannerType::Display => &[Placeholder::Click, Placeholder::Impression],
            BannerType::Video => &[
                Placeholder::Click,
                Placeholder::Impression,
                Placeholder::VideoUrl,
                Placeholder::VideoStart,
                Placeholder::VideoEnd,
            ],
        }
    }

    /// 模板 key：`<id>_js` 或 `<id>_xml`
    pub fn template_key(self, creative_id: &str) -> String {
        format!("{}{}", creative_id, self.template_suffix())
    }
}

impl fmt::Display for BannerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BannerType::Display => f.write_str("display"),
            BannerType::Video => f.write_str("video"),
        }
    }
}

/// 请求校验失败的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("creative id must not be empty")]
    EmptyId,
    #[error("unrecognized banner type: {0}")]
    UnknownBannerType(i64),
}

/// 请求体中的 banner 对象，`type` 保留原始整数，由校验阶段转换
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Banner {
    #[serde(rename = "type", default)]
    pub kind: i64,
}

/// **竞价请求（线上格式）**
///
/// ```json
/// { "id": "id_123", "width": 600, "height": 328, "banner": { "type": 1 } }
/// ```
///
/// 缺失字段按零值处理，交给 [`BidRequest::validate`] 判断是否可用。
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BidRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub banner: Banner,
}

/// 校验通过的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBid {
    pub id: String,
    /// 广告位尺寸目前只透传到日志，不参与 key 的拼接
    pub width: u32,
    pub height: u32,
    pub banner_type: BannerType,
}

impl BidRequest {
    /// 校验请求：id 非空、banner type 可识别
    pub fn validate(self) -> Result<ValidBid, ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        let banner_type = BannerType::try_from(self.banner.kind)?;
        Ok(ValidBid {
            id: self.id,
            width: self.width,
            height: self.height,
            banner_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, kind: i64) -> BidRequest {
        BidRequest {
            id: id.to_string(),
            width: 600,
            height: 328,
            banner: Banner { kind },
        }
    }

    #[test]
    fn test_validate_display_and_video() {
        let display = request("id_123", 1).validate().unwrap();
        assert_eq!(display.banner_type, BannerType::Display);
        assert_eq!(display.width, 600);
        assert_eq!(display.height, 328);

        let video = request("id_123", 2).validate().unwrap();
        assert_eq!(video.banner_type, BannerType::Video);
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        assert_eq!(request("", 1).validate(), Err(ValidationError::EmptyId));
        assert_eq!(request("   ", 2).validate(), Err(ValidationError::EmptyId));
    }

    #[test]
    fn test_validate_rejects_unknown_banner_type() {
        for kind in [0, 3, -1, 99] {
            assert_eq!(
                request("id_123", kind).validate(),
                Err(ValidationError::UnknownBannerType(kind))
            );
        }
    }

    #[test]
    fn test_empty_id_checked_before_banner_type() {
        assert_eq!(request("", 7).validate(), Err(ValidationError::EmptyId));
    }

    #[test]
    fn test_decode_wire_format() {
        let body = r#"{"id":"id_123","width":600,"height":328,"banner":{"type":2}}"#;
        let req: BidRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.id, "id_123");
        assert_eq!(req.banner.kind, 2);
    }

    #[test]
    fn test_decode_missing_banner_is_unrecognized() {
        let req: BidRequest = serde_json::from_str(r#"{"id":"id_123"}"#).unwrap();
        assert_eq!(req.validate(), Err(ValidationError::UnknownBannerType(0)));
    }

    #[test]
    fn test_template_key_and_content_type() {
        assert_eq!(BannerType::Display.template_key("abc"), "abc_js");
        assert_eq!(BannerType::Video.template_key("abc"), "abc_xml");
        assert_eq!(BannerType::Display.content_type(), "text/json");
        assert_eq!(BannerType::Video.content_type(), "text/xml");
    }

    #[test]
    fn test_banner_type_serde_uses_integer() {
        assert_eq!(serde_json::to_string(&BannerType::Video).unwrap(), "2");
        let parsed: BannerType = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, BannerType::Display);
        assert!(serde_json::from_str::<BannerType>("5").is_err());
    }
}
