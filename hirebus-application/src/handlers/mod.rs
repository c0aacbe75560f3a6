//! 已交付的事件处理器
//!
//! 每个处理器只做一件幂等的副作用，通过 `RecruitingStore` 落库。
//! 负载格式错误视为处理器失败（条目保留在积压列表中，等待修复后重放）。
//!
mod application_created;
mod interview_completed;
mod job_created;
mod problem_solved;

pub use application_created::NotifyRecruiterOfApplication;
pub use interview_completed::RecordInterviewCompletion;
pub use job_created::NotifyMatchingCandidates;
pub use problem_solved::LogSolvedProblem;

use crate::store::RecruitingStore;
use hirebus_core::{EventType, HandlerRegistry};
use std::sync::Arc;

/// 每个职位最多通知的候选人数
pub const JOB_MATCH_NOTIFY_LIMIT: usize = 100;

/// 启动时的固定处理器表
pub fn default_registry(store: Arc<dyn RecruitingStore>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register(
            EventType::JobCreated,
            Arc::new(NotifyMatchingCandidates::new(store.clone())),
        )
        .register(
            EventType::ApplicationCreated,
            Arc::new(NotifyRecruiterOfApplication::new(store.clone())),
        )
        .register(
            EventType::InterviewCompleted,
            Arc::new(RecordInterviewCompletion::new(store.clone())),
        )
        .register(
            EventType::ProblemSolved,
            Arc::new(LogSolvedProblem::new(store)),
        );
    registry
}
