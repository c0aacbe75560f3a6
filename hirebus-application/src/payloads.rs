//! 已交付处理器消费的事件负载（线上字段为 camelCase）
//!
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreated {
    pub job_id: String,
    pub title: String,
    #[serde(default)]
    pub company_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCreated {
    #[serde(default)]
    pub application_id: Option<String>,
    pub job_id: String,
    pub candidate_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterviewScores {
    pub total: f64,
    pub technical: f64,
    pub behavioral: f64,
    pub communication: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewCompleted {
    pub session_id: String,
    pub candidate_id: String,
    /// 练习面试没有关联职位
    #[serde(default)]
    pub job_id: Option<String>,
    pub scores: InterviewScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSolved {
    pub user_id: String,
    pub problem_id: String,
}
