//! 信封编解码
//!
//! 线上格式为 JSON 文本。积压列表按文本精确匹配删除条目，
//! 因此回放路径始终保留原始文本而不是重新编码。
//!
use crate::envelope::Envelope;
use crate::error::{EventError, EventResult};

pub fn encode(envelope: &Envelope) -> EventResult<String> {
    Ok(serde_json::to_string(envelope)?)
}

pub fn decode(raw: &str) -> EventResult<Envelope> {
    serde_json::from_str(raw).map_err(|e| EventError::decode(e.to_string()))
}
