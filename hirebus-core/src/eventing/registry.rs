//! 处理器注册表（HandlerRegistry）
//!
//! 事件类型到有序处理器列表的映射。启动时由固定表一次性构建，
//! 分发期间只读；不提供注销。
//!
use super::handler::{EventHandler, FnHandler};
use crate::envelope::Envelope;
use crate::event_type::EventType;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    by_type: BTreeMap<EventType, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器；同一类型的多个处理器按注册顺序执行
    pub fn register(&mut self, event_type: EventType, handler: Arc<dyn EventHandler>) -> &mut Self {
        self.by_type.entry(event_type).or_default().push(handler);
        self
    }

    pub fn register_fn<F, Fut>(
        &mut self,
        event_type: EventType,
        name: impl Into<String>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(event_type, Arc::new(FnHandler::new(name, f)))
    }

    pub fn handlers_for(&self, event_type: EventType) -> &[Arc<dyn EventHandler>] {
        self.by_type
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 至少注册了一个处理器的事件类型（按分类顺序）
    pub fn event_types(&self) -> impl Iterator<Item = EventType> + '_ {
        self.by_type
            .iter()
            .filter(|(_, handlers)| !handlers.is_empty())
            .map(|(t, _)| *t)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_registration_order_per_type() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_fn(EventType::ProblemSolved, "log-activity", |_| async { anyhow::Ok(()) })
            .register_fn(EventType::JobCreated, "notify", |_| async { anyhow::Ok(()) })
            .register_fn(EventType::ProblemSolved, "recount", |_| async { anyhow::Ok(()) });

        let names: Vec<&str> = registry
            .handlers_for(EventType::ProblemSolved)
            .iter()
            .map(|h| h.handler_name())
            .collect();
        assert_eq!(names, vec!["log-activity", "recount"]);

        let types: Vec<EventType> = registry.event_types().collect();
        assert_eq!(types, vec![EventType::JobCreated, EventType::ProblemSolved]);
        assert!(registry.handlers_for(EventType::JobDeleted).is_empty());
    }

    #[test]
    fn empty_registry() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.event_types().count(), 0);
    }
}
