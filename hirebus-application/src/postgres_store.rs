//! Postgres 版 RecruitingStore（`infra-sqlx` 特性）
//!
//! 幂等依赖 `migrations/0001_event_handler_idempotency.sql` 中的唯一索引：
//! 插入统一使用 `ON CONFLICT DO NOTHING`，统计字段由子查询重算。
//!
use crate::error::AppResult;
use crate::payloads::InterviewScores;
use crate::store::{ApplicationContext, NewNotification, RecruitingStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct PgRecruitingStore {
    pool: PgPool,
}

impl PgRecruitingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl RecruitingStore for PgRecruitingStore {
    async fn job_required_skills(&self, job_id: &str) -> AppResult<Option<Vec<String>>> {
        let row = sqlx::query("SELECT skills_required FROM jobs WHERE id = $1::uuid")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(
                row.try_get::<Option<Vec<String>>, _>("skills_required")?
                    .unwrap_or_default(),
            )),
            None => Ok(None),
        }
    }

    async fn candidates_with_any_skill(
        &self,
        skills: &[String],
        limit: usize,
    ) -> AppResult<Vec<String>> {
        let rows = sqlx::query(
            r#"SELECT u.id::text AS id FROM users u
               JOIN profiles p ON p.user_id = u.id
               WHERE u.role = 'candidate'
               AND p.skills && $1
               ORDER BY u.id
               LIMIT $2"#,
        )
        .bind(skills)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("id").map_err(Into::into))
            .collect()
    }

    async fn application_context(
        &self,
        candidate_id: &str,
        job_id: &str,
    ) -> AppResult<Option<ApplicationContext>> {
        let row = sqlx::query(
            r#"SELECT j.title, j.recruiter_id::text AS recruiter_id, p.full_name AS candidate_name
               FROM jobs j
               JOIN users u ON u.id = $1::uuid
               LEFT JOIN profiles p ON p.user_id = u.id
               WHERE j.id = $2::uuid"#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ApplicationContext {
            job_title: row.try_get("title")?,
            recruiter_id: row.try_get("recruiter_id")?,
            candidate_name: row.try_get("candidate_name")?,
        }))
    }

    async fn insert_notification(&self, n: &NewNotification) -> AppResult<bool> {
        let result = sqlx::query(
            r#"INSERT INTO notifications (user_id, type, title, message, action_url, source_event_id)
               VALUES ($1::uuid, $2, $3, $4, $5, $6)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(&n.user_id)
        .bind(n.kind.as_str())
        .bind(&n.title)
        .bind(&n.message)
        .bind(&n.action_url)
        .bind(&n.source_event_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_interview_scores(
        &self,
        candidate_id: &str,
        job_id: &str,
        scores: &InterviewScores,
    ) -> AppResult<()> {
        sqlx::query(
            r#"UPDATE applications
               SET ai_interview_completed = true,
                   ai_score_total = $1,
                   ai_score_technical = $2,
                   ai_score_behavioral = $3,
                   ai_score_communication = $4,
                   status = 'hr_review',
                   last_activity_at = NOW()
               WHERE candidate_id = $5::uuid AND job_id = $6::uuid"#,
        )
        .bind(scores.total)
        .bind(scores.technical)
        .bind(scores.behavioral)
        .bind(scores.communication)
        .bind(candidate_id)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn refresh_interview_stats(&self, candidate_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"UPDATE profiles
               SET interviews_completed = (
                     SELECT COUNT(*) FROM interview_sessions
                     WHERE candidate_id = $1::uuid AND score_total IS NOT NULL
                   ),
                   total_score_avg = (
                     SELECT AVG(score_total) FROM interview_sessions
                     WHERE candidate_id = $1::uuid AND score_total IS NOT NULL
                   )
               WHERE user_id = $1::uuid"#,
        )
        .bind(candidate_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn log_problem_solved(
        &self,
        user_id: &str,
        problem_id: &str,
        day: NaiveDate,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"INSERT INTO activity_log (user_id, activity_type, problem_id, activity_date)
               VALUES ($1::uuid, 'problem_solved', $2::uuid, $3)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(user_id)
        .bind(problem_id)
        .bind(day)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn refresh_problems_solved(&self, user_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"UPDATE profiles
               SET problems_solved = (
                 SELECT COUNT(DISTINCT problem_id) FROM user_solutions
                 WHERE user_id = $1::uuid AND status = 'solved'
               )
               WHERE user_id = $1::uuid"#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
