//! 事件子系统统一错误定义
//!
//! 三类错误对应三条传播路径：
//! - `Connectivity`：共享存储不可达；发布路径同步返回给调用方，本层不重试；
//! - `Decode`：信封格式错误；丢弃并记录日志，不重试；
//! - `Handler`：处理器内部失败；按处理器隔离，仅记录日志。
//!
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    #[error("connectivity error: {reason}")]
    Connectivity { reason: String },

    #[error("decode error: {reason}")]
    Decode { reason: String },

    #[error("encode error: {source}")]
    Encode {
        #[from]
        source: serde_json::Error,
    },

    #[error("event handler error: handler={handler}, reason={reason}")]
    Handler { handler: String, reason: String },

    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

impl EventError {
    pub fn connectivity(reason: impl Into<String>) -> Self {
        EventError::Connectivity {
            reason: reason.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        EventError::Decode {
            reason: reason.into(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, EventError::Connectivity { .. })
    }
}

/// 统一 Result 类型别名
pub type EventResult<T> = Result<T, EventError>;

#[cfg(feature = "redis")]
impl From<redis::RedisError> for EventError {
    fn from(err: redis::RedisError) -> Self {
        EventError::Connectivity {
            reason: err.to_string(),
        }
    }
}
