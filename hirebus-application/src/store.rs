//! 招聘数据存储端口（RecruitingStore）
//!
//! 已交付处理器的全部读写都经由该端口完成。事件投递是“至少一次”，
//! 所以每个写操作都必须可重复执行：插入按业务键冲突忽略，统计字段一律重算而非累加。
//!
use crate::error::AppResult;
use crate::payloads::InterviewScores;
use async_trait::async_trait;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    NewJobMatch,
    NewApplication,
    InterviewCompleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewJobMatch => "new_job_match",
            NotificationKind::NewApplication => "new_application",
            NotificationKind::InterviewCompleted => "interview_completed",
        }
    }
}

/// 待写入的通知；(user_id, kind, source_event_id) 唯一
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub source_event_id: String,
}

/// 投递通知所需的职位与候选人信息
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationContext {
    pub job_title: String,
    pub recruiter_id: String,
    pub candidate_name: Option<String>,
}

#[async_trait]
pub trait RecruitingStore: Send + Sync {
    /// 职位要求的技能；职位不存在时返回 `None`
    async fn job_required_skills(&self, job_id: &str) -> AppResult<Option<Vec<String>>>;

    /// 技能与 `skills` 有交集的候选人，最多 `limit` 个
    async fn candidates_with_any_skill(
        &self,
        skills: &[String],
        limit: usize,
    ) -> AppResult<Vec<String>>;

    async fn application_context(
        &self,
        candidate_id: &str,
        job_id: &str,
    ) -> AppResult<Option<ApplicationContext>>;

    /// 冲突忽略的插入，返回是否真正写入
    async fn insert_notification(&self, notification: &NewNotification) -> AppResult<bool>;

    /// 写入 AI 面试得分并把申请推进到 `hr_review`
    async fn record_interview_scores(
        &self,
        candidate_id: &str,
        job_id: &str,
        scores: &InterviewScores,
    ) -> AppResult<()>;

    /// 重算候选人的面试完成数与平均分
    async fn refresh_interview_stats(&self, candidate_id: &str) -> AppResult<()>;

    /// 以 (user, problem, day) 为键的冲突忽略插入，返回是否真正写入
    async fn log_problem_solved(
        &self,
        user_id: &str,
        problem_id: &str,
        day: NaiveDate,
    ) -> AppResult<bool>;

    /// 重算已解决题目数
    async fn refresh_problems_solved(&self, user_id: &str) -> AppResult<()>;
}
