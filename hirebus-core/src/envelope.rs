//! 消息信封（Envelope）
//!
//! 发布出去的业务事件的不可变包装：`{ id, type, payload, timestamp }`。
//! 由发布者创建并持有，交给共享存储后即归广播频道/积压列表所有。
//!
use crate::event_type::EventType;
use bon::Builder;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct Envelope {
    /// 唯一、不透明的信封标识
    #[builder(into)]
    id: String,
    /// 事件类型（封闭分类）
    #[serde(rename = "type")]
    event_type: EventType,
    /// 业务负载，由调用方定义
    payload: Value,
    /// 创建时间，线上格式为毫秒精度的 ISO-8601
    #[serde(with = "iso8601")]
    timestamp: DateTime<Utc>,
}

impl Envelope {
    /// 以新的 id 与当前时间创建信封
    pub fn new(event_type: EventType, payload: Value) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            event_type,
            payload,
            timestamp: Utc::now().trunc_subsecs(3),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// 将负载反序列化为处理器需要的具体类型
    pub fn payload_as<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(&self.payload)
    }
}

mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}
