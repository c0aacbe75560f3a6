//! 跨组件事件分发骨干（hirebus-core）
//!
//! 让招聘平台中可独立更新的部分（职位发布、投递、面试评分、通知）异步通信而互不耦合：
//! - 多消费者的发布/订阅广播（`events:<type>`）；
//! - 叠加“至少一次”的有界积压列表（`queue:<type>`，保留最新 1000 条）；
//! - 按事件类型注册、顺序执行、故障隔离的幂等处理器；
//! - 启动时（以及可选的周期性）回放积压列表，补上发布时无订阅者在线的消息。
//!
//! 本 crate 只定义对共享存储的最小契约（`substrate`）与对发布者、订阅者、
//! 处理器作者暴露的契约；内置内存实现，Redis 实现位于 `redis` 特性之后。
//!
//! 典型用法：
//! 1. 构建 `HandlerRegistry` 并为每个事件类型注册处理器；
//! 2. 选择 `MessageSubstrate` 实现；
//! 3. 调用 `init` 得到 `Publisher` 与 `EngineHandle`；
//! 4. 业务代码通过 `Publisher::publish` 发布事件。
//!
pub mod codec;
pub mod envelope;
pub mod error;
pub mod event_type;
pub mod eventing;
pub mod substrate;

pub use envelope::Envelope;
pub use error::{EventError, EventResult};
pub use event_type::EventType;
pub use eventing::{
    EngineHandle, EventHandler, EventSystem, EventSystemConfig, HandlerRegistry, Publisher, init,
};
pub use substrate::{InMemorySubstrate, MessageSubstrate};
