// src/bidding/template.rs

use crate::model::creative::{Placeholder, TrackingRecord};

/// 将模板中的占位符替换为 tracking 字段值
///
/// 单次扫描、字面替换：替换进去的值不会再被扫描，
/// 不在 `placeholders` 中的 `{...}` 原样保留。
/// 模板按字节处理，非 UTF-8 内容原样输出。
pub fn render_template(template: &[u8], record: &TrackingRecord, placeholders: &[Placeholder]) -> Vec<u8> {
    let mut out = Vec::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.iter().position(|&b| b == b'{') {
        out.extend_from_slice(&rest[..pos]);
        let tail = &rest[pos..];
        match placeholders.iter().find(|p| tail.starts_with(p.token().as_bytes())) {
            Some(placeholder) => {
                out.extend_from_slice(record.value(*placeholder));
                rest = &tail[placeholder.token().len()..];
            }
            None => {
                out.push(b'{');
                rest = &tail[1..];
            }
        }
    }
    out.extend_from_slice(rest);
    out
}
