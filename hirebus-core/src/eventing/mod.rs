//! 事件子系统（eventing）
//!
//! - `Publisher`：广播 + 追加积压列表；
//! - `EventHandler` / `HandlerRegistry`：按事件类型注册的有序处理器；
//! - `Dispatcher`：消费广播并逐个执行处理器；
//! - `Reconciler`：回放积压列表，全部成功才删除；
//! - `EventSystem`：启动编排（订阅、启动回放、可选周期回放）与关闭句柄。
//!
pub mod dispatcher;
pub mod engine;
pub mod handler;
pub mod publisher;
pub mod reconciler;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use engine::{
    DEFAULT_BACKLOG_MAX_LEN, EngineHandle, EventSystem, EventSystemConfig, init,
};
pub use handler::{DeliveryPath, EventHandler, FnHandler, HandlerOutcome};
pub use publisher::Publisher;
pub use reconciler::{DEFAULT_DRAIN_BATCH_SIZE, DrainReport, Reconciler};
pub use registry::HandlerRegistry;
