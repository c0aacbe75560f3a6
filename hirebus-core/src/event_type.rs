//! 事件类型（封闭分类）与命名约定
//!
//! 频道与积压列表没有显式的创建/销毁接口，完全由命名约定隐式确定：
//! - 广播频道：`events:<type>`
//! - 积压列表：`queue:<type>`
//! - 死信列表：`deadletter:<type>`（仅在启用有限重试时使用）
//!
use crate::error::EventError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "job.created")]
    JobCreated,
    #[serde(rename = "job.updated")]
    JobUpdated,
    #[serde(rename = "job.deleted")]
    JobDeleted,
    #[serde(rename = "job.status_changed")]
    JobStatusChanged,
    #[serde(rename = "application.created")]
    ApplicationCreated,
    #[serde(rename = "application.status_updated")]
    ApplicationStatusUpdated,
    #[serde(rename = "interview.started")]
    InterviewStarted,
    #[serde(rename = "interview.completed")]
    InterviewCompleted,
    #[serde(rename = "interview.score_updated")]
    InterviewScoreUpdated,
    #[serde(rename = "user.registered")]
    UserRegistered,
    #[serde(rename = "user.profile_updated")]
    UserProfileUpdated,
    #[serde(rename = "activity.problem_solved")]
    ProblemSolved,
    #[serde(rename = "activity.streak_updated")]
    StreakUpdated,
    #[serde(rename = "notification.send")]
    NotificationSend,
}

impl EventType {
    pub const ALL: [EventType; 14] = [
        EventType::JobCreated,
        EventType::JobUpdated,
        EventType::JobDeleted,
        EventType::JobStatusChanged,
        EventType::ApplicationCreated,
        EventType::ApplicationStatusUpdated,
        EventType::InterviewStarted,
        EventType::InterviewCompleted,
        EventType::InterviewScoreUpdated,
        EventType::UserRegistered,
        EventType::UserProfileUpdated,
        EventType::ProblemSolved,
        EventType::StreakUpdated,
        EventType::NotificationSend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::JobCreated => "job.created",
            EventType::JobUpdated => "job.updated",
            EventType::JobDeleted => "job.deleted",
            EventType::JobStatusChanged => "job.status_changed",
            EventType::ApplicationCreated => "application.created",
            EventType::ApplicationStatusUpdated => "application.status_updated",
            EventType::InterviewStarted => "interview.started",
            EventType::InterviewCompleted => "interview.completed",
            EventType::InterviewScoreUpdated => "interview.score_updated",
            EventType::UserRegistered => "user.registered",
            EventType::UserProfileUpdated => "user.profile_updated",
            EventType::ProblemSolved => "activity.problem_solved",
            EventType::StreakUpdated => "activity.streak_updated",
            EventType::NotificationSend => "notification.send",
        }
    }

    /// 该类型的广播频道名
    pub fn channel(&self) -> String {
        channel_for(*self)
    }

    /// 该类型的积压列表名
    pub fn backlog(&self) -> String {
        backlog_for(*self)
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EventError::UnknownEventType(s.to_string()))
    }
}

pub fn channel_for(event_type: EventType) -> String {
    format!("events:{event_type}")
}

pub fn backlog_for(event_type: EventType) -> String {
    format!("queue:{event_type}")
}

pub fn dead_letter_for(event_type: EventType) -> String {
    format!("deadletter:{event_type}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_convention() {
        assert_eq!(channel_for(EventType::JobCreated), "events:job.created");
        assert_eq!(
            backlog_for(EventType::ProblemSolved),
            "queue:activity.problem_solved"
        );
        assert_eq!(
            dead_letter_for(EventType::InterviewCompleted),
            "deadletter:interview.completed"
        );
    }

    #[test]
    fn wire_name_matches_serde_name() {
        for t in EventType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().to_string()));
            assert_eq!(t.as_str().parse::<EventType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = "job.exploded".parse::<EventType>().unwrap_err();
        assert!(matches!(err, EventError::UnknownEventType(ref s) if s == "job.exploded"));
    }
}
