//! 基于内存的 RecruitingStore 实现
//! - 用于测试、示例与本地开发
//! - 所有表位于同一把锁之后，单次调用内的读写天然原子
//!
use crate::error::{AppError, AppResult};
use crate::payloads::InterviewScores;
use crate::store::{ApplicationContext, NewNotification, RecruitingStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Candidate,
    Recruiter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub title: String,
    pub recruiter_id: String,
    pub skills_required: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub full_name: Option<String>,
    pub skills: Vec<String>,
    pub problems_solved: usize,
    pub interviews_completed: usize,
    pub total_score_avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub status: String,
    pub ai_interview_completed: bool,
    pub scores: Option<InterviewScores>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredNotification {
    pub user_id: String,
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub source_event_id: String,
    pub read: bool,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, Role>,
    profiles: BTreeMap<String, Profile>,
    jobs: BTreeMap<String, Job>,
    applications: BTreeMap<(String, String), Application>,
    /// (candidate_id, score_total)
    interview_sessions: Vec<(String, Option<f64>)>,
    solved: HashSet<(String, String)>,
    activity_log: BTreeSet<(String, String, NaiveDate)>,
    notifications: Vec<StoredNotification>,
}

#[derive(Clone, Default)]
pub struct InMemoryRecruitingStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRecruitingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| AppError::Store(format!("in-memory store poisoned: {e}")))
    }

    fn seed(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ---- 种子数据 ----

    pub fn add_candidate(&self, user_id: &str, full_name: Option<&str>, skills: &[&str]) {
        let mut t = self.seed();
        t.users.insert(user_id.to_string(), Role::Candidate);
        t.profiles.insert(
            user_id.to_string(),
            Profile {
                full_name: full_name.map(str::to_string),
                skills: skills.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        );
    }

    pub fn add_recruiter(&self, user_id: &str) {
        self.seed()
            .users
            .insert(user_id.to_string(), Role::Recruiter);
    }

    pub fn add_job(&self, job_id: &str, title: &str, recruiter_id: &str, skills: &[&str]) {
        self.seed().jobs.insert(
            job_id.to_string(),
            Job {
                title: title.to_string(),
                recruiter_id: recruiter_id.to_string(),
                skills_required: skills.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn add_application(&self, candidate_id: &str, job_id: &str) {
        self.seed().applications.insert(
            (candidate_id.to_string(), job_id.to_string()),
            Application {
                status: "applied".to_string(),
                ai_interview_completed: false,
                scores: None,
            },
        );
    }

    pub fn add_interview_session(&self, candidate_id: &str, score_total: Option<f64>) {
        self.seed()
            .interview_sessions
            .push((candidate_id.to_string(), score_total));
    }

    /// 对应提交状态为 solved 的解答记录
    pub fn mark_solved(&self, user_id: &str, problem_id: &str) {
        self.seed()
            .solved
            .insert((user_id.to_string(), problem_id.to_string()));
    }

    // ---- 查询 ----

    pub fn notifications(&self) -> Vec<StoredNotification> {
        self.seed().notifications.clone()
    }

    pub fn notifications_for(&self, user_id: &str) -> Vec<StoredNotification> {
        self.seed()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn activity_rows(&self, user_id: &str, problem_id: &str) -> usize {
        self.seed()
            .activity_log
            .iter()
            .filter(|(u, p, _)| u == user_id && p == problem_id)
            .count()
    }

    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        self.seed().profiles.get(user_id).cloned()
    }

    pub fn application(&self, candidate_id: &str, job_id: &str) -> Option<Application> {
        self.seed()
            .applications
            .get(&(candidate_id.to_string(), job_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl RecruitingStore for InMemoryRecruitingStore {
    async fn job_required_skills(&self, job_id: &str) -> AppResult<Option<Vec<String>>> {
        Ok(self
            .tables()?
            .jobs
            .get(job_id)
            .map(|j| j.skills_required.clone()))
    }

    async fn candidates_with_any_skill(
        &self,
        skills: &[String],
        limit: usize,
    ) -> AppResult<Vec<String>> {
        let t = self.tables()?;
        Ok(t.users
            .iter()
            .filter(|(_, role)| **role == Role::Candidate)
            .filter(|(id, _)| {
                t.profiles
                    .get(*id)
                    .is_some_and(|p| p.skills.iter().any(|s| skills.contains(s)))
            })
            .map(|(id, _)| id.clone())
            .take(limit)
            .collect())
    }

    async fn application_context(
        &self,
        candidate_id: &str,
        job_id: &str,
    ) -> AppResult<Option<ApplicationContext>> {
        let t = self.tables()?;
        let (Some(job), true) = (t.jobs.get(job_id), t.users.contains_key(candidate_id)) else {
            return Ok(None);
        };
        Ok(Some(ApplicationContext {
            job_title: job.title.clone(),
            recruiter_id: job.recruiter_id.clone(),
            candidate_name: t
                .profiles
                .get(candidate_id)
                .and_then(|p| p.full_name.clone()),
        }))
    }

    async fn insert_notification(&self, n: &NewNotification) -> AppResult<bool> {
        let mut t = self.tables()?;
        let exists = t.notifications.iter().any(|existing| {
            existing.user_id == n.user_id
                && existing.kind == n.kind.as_str()
                && existing.source_event_id == n.source_event_id
        });
        if exists {
            return Ok(false);
        }
        t.notifications.push(StoredNotification {
            user_id: n.user_id.clone(),
            kind: n.kind.as_str(),
            title: n.title.clone(),
            message: n.message.clone(),
            action_url: n.action_url.clone(),
            source_event_id: n.source_event_id.clone(),
            read: false,
        });
        Ok(true)
    }

    async fn record_interview_scores(
        &self,
        candidate_id: &str,
        job_id: &str,
        scores: &InterviewScores,
    ) -> AppResult<()> {
        let mut t = self.tables()?;
        // 与 UPDATE ... WHERE 一致：没有对应申请时不做任何事
        if let Some(app) = t
            .applications
            .get_mut(&(candidate_id.to_string(), job_id.to_string()))
        {
            app.ai_interview_completed = true;
            app.scores = Some(*scores);
            app.status = "hr_review".to_string();
        }
        Ok(())
    }

    async fn refresh_interview_stats(&self, candidate_id: &str) -> AppResult<()> {
        let mut t = self.tables()?;
        let scores: Vec<f64> = t
            .interview_sessions
            .iter()
            .filter(|(c, _)| c == candidate_id)
            .filter_map(|(_, s)| *s)
            .collect();
        if let Some(profile) = t.profiles.get_mut(candidate_id) {
            profile.interviews_completed = scores.len();
            profile.total_score_avg = if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            };
        }
        Ok(())
    }

    async fn log_problem_solved(
        &self,
        user_id: &str,
        problem_id: &str,
        day: NaiveDate,
    ) -> AppResult<bool> {
        Ok(self.tables()?.activity_log.insert((
            user_id.to_string(),
            problem_id.to_string(),
            day,
        )))
    }

    async fn refresh_problems_solved(&self, user_id: &str) -> AppResult<()> {
        let mut t = self.tables()?;
        let count = t.solved.iter().filter(|(u, _)| u == user_id).count();
        if let Some(profile) = t.profiles.get_mut(user_id) {
            profile.problems_solved = count;
        }
        Ok(())
    }
}
