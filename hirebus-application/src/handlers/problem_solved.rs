use crate::payloads::ProblemSolved;
use crate::store::RecruitingStore;
use async_trait::async_trait;
use hirebus_core::{Envelope, EventHandler};
use std::sync::Arc;

/// activity.problem_solved：记录当日活动并重算已解决题目数
///
/// 活动日取信封时间戳的 UTC 日期，跨天重放也落在同一行上。
pub struct LogSolvedProblem {
    store: Arc<dyn RecruitingStore>,
}

impl LogSolvedProblem {
    pub fn new(store: Arc<dyn RecruitingStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for LogSolvedProblem {
    fn handler_name(&self) -> &str {
        "log-solved-problem"
    }

    async fn handle(&self, envelope: &Envelope) -> anyhow::Result<()> {
        let payload: ProblemSolved = envelope.payload_as()?;
        let day = envelope.timestamp().date_naive();

        let inserted = self
            .store
            .log_problem_solved(&payload.user_id, &payload.problem_id, day)
            .await?;
        if !inserted {
            tracing::debug!(
                user_id = %payload.user_id,
                problem_id = %payload.problem_id,
                "activity already logged"
            );
        }

        self.store.refresh_problems_solved(&payload.user_id).await?;
        Ok(())
    }
}
