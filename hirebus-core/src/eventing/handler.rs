//! 事件处理器（EventHandler）
//!
//! 处理器对某一事件类型执行一个副作用。投递语义为“至少一次”且本层不去重，
//! 因此处理器必须幂等。
//!
//! `run_handlers` 是广播分发与积压回放共用的执行路径：严格按注册顺序逐个 await，
//! 单个处理器的错误或 panic 被捕获并记录，不影响其后的处理器。
//!
use crate::envelope::Envelope;
use async_trait::async_trait;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// 处理器名称（用于日志与失败记录）
    fn handler_name(&self) -> &str;
    /// 处理事件
    async fn handle(&self, envelope: &Envelope) -> anyhow::Result<()>;
}

/// 以异步闭包实现的处理器
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn handler_name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, envelope: &Envelope) -> anyhow::Result<()> {
        (self.f)(envelope.clone()).await
    }
}

/// 处理器运行路径，仅用于日志区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    Dispatch,
    Drain,
}

impl DeliveryPath {
    fn as_str(&self) -> &'static str {
        match self {
            DeliveryPath::Dispatch => "dispatch",
            DeliveryPath::Drain => "drain",
        }
    }
}

/// 单个信封上全部处理器的执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl HandlerOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub(crate) async fn run_handlers(
    envelope: &Envelope,
    handlers: &[Arc<dyn EventHandler>],
    path: DeliveryPath,
) -> HandlerOutcome {
    let mut outcome = HandlerOutcome::default();

    for handler in handlers {
        let name = handler.handler_name().to_string();
        let result = AssertUnwindSafe(handler.handle(envelope))
            .catch_unwind()
            .await;

        let reason = match result {
            Ok(Ok(())) => {
                outcome.succeeded.push(name);
                continue;
            }
            Ok(Err(err)) => format!("{err:#}"),
            Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
        };

        tracing::error!(
            path = path.as_str(),
            handler = %name,
            event_type = %envelope.event_type(),
            envelope_id = envelope.id(),
            error = %reason,
            "event handler failed"
        );
        outcome.failed.push(name);
    }

    outcome
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_type::EventType;
    use std::sync::Mutex;

    fn recorder(
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn EventHandler> {
        Arc::new(FnHandler::new(name, move |_env: Envelope| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name);
                if fail {
                    anyhow::bail!("{name} refused");
                }
                Ok(())
            }
        }))
    }

    #[tokio::test]
    async fn runs_in_registration_order_and_isolates_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = vec![
            recorder("first", log.clone(), false),
            recorder("second", log.clone(), true),
            recorder("third", log.clone(), false),
        ];
        let env = Envelope::new(EventType::JobCreated, serde_json::json!({}));

        let outcome = run_handlers(&env, &handlers, DeliveryPath::Dispatch).await;

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(outcome.succeeded, vec!["first", "third"]);
        assert_eq!(outcome.failed, vec!["second"]);
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let boom: Arc<dyn EventHandler> =
            Arc::new(FnHandler::new("boom", |_env: Envelope| async move {
                let explode = true;
                if explode {
                    panic!("handler exploded");
                }
                Ok::<(), anyhow::Error>(())
            }));
        let handlers = vec![boom, recorder("after", log.clone(), false)];
        let env = Envelope::new(EventType::JobCreated, serde_json::json!({}));

        let outcome = run_handlers(&env, &handlers, DeliveryPath::Drain).await;

        assert_eq!(outcome.failed, vec!["boom"]);
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }
}
