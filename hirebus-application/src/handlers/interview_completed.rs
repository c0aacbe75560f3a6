use crate::payloads::InterviewCompleted;
use crate::store::{NewNotification, NotificationKind, RecruitingStore};
use async_trait::async_trait;
use hirebus_core::{Envelope, EventHandler};
use std::sync::Arc;

/// interview.completed：写入得分、通知候选人并重算面试统计
pub struct RecordInterviewCompletion {
    store: Arc<dyn RecruitingStore>,
}

impl RecordInterviewCompletion {
    pub fn new(store: Arc<dyn RecruitingStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for RecordInterviewCompletion {
    fn handler_name(&self) -> &str {
        "record-interview-completion"
    }

    async fn handle(&self, envelope: &Envelope) -> anyhow::Result<()> {
        let payload: InterviewCompleted = envelope.payload_as()?;
        tracing::debug!(session_id = %payload.session_id, "processing interview.completed");

        if let Some(job_id) = payload.job_id.as_deref() {
            self.store
                .record_interview_scores(&payload.candidate_id, job_id, &payload.scores)
                .await?;

            self.store
                .insert_notification(&NewNotification {
                    user_id: payload.candidate_id.clone(),
                    kind: NotificationKind::InterviewCompleted,
                    title: "Interview Completed".to_string(),
                    message: format!(
                        "Your AI interview has been completed. Score: {}%",
                        payload.scores.total
                    ),
                    action_url: "/applications".to_string(),
                    source_event_id: envelope.id().to_string(),
                })
                .await?;
        }

        self.store
            .refresh_interview_stats(&payload.candidate_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory_store::InMemoryRecruitingStore;
    use hirebus_core::EventType;
    use serde_json::{Value, json};

    fn envelope(job_id: Value) -> Envelope {
        Envelope::new(
            EventType::InterviewCompleted,
            json!({
                "sessionId": "s1",
                "candidateId": "u1",
                "jobId": job_id,
                "scores": {"total": 82.0, "technical": 90.0, "behavioral": 75.0, "communication": 80.0}
            }),
        )
    }

    #[tokio::test]
    async fn scores_persisted_and_stats_recalculated_idempotently() {
        let store = InMemoryRecruitingStore::new();
        store.add_candidate("u1", Some("Ada"), &[]);
        store.add_application("u1", "j7");
        store.add_interview_session("u1", Some(70.0));
        store.add_interview_session("u1", Some(82.0));
        let handler = RecordInterviewCompletion::new(Arc::new(store.clone()));

        let env = envelope(json!("j7"));
        handler.handle(&env).await.unwrap();
        let once = (store.profile("u1"), store.application("u1", "j7"), store.notifications());
        handler.handle(&env).await.unwrap();
        let twice = (store.profile("u1"), store.application("u1", "j7"), store.notifications());
        assert_eq!(once, twice);

        let app = store.application("u1", "j7").unwrap();
        assert_eq!(app.status, "hr_review");
        assert!(app.ai_interview_completed);
        assert_eq!(app.scores.unwrap().technical, 90.0);

        let profile = store.profile("u1").unwrap();
        assert_eq!(profile.interviews_completed, 2);
        assert_eq!(profile.total_score_avg, Some(76.0));

        let sent = store.notifications_for("u1");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].message,
            "Your AI interview has been completed. Score: 82%"
        );
    }

    #[tokio::test]
    async fn practice_interview_only_updates_stats() {
        let store = InMemoryRecruitingStore::new();
        store.add_candidate("u1", None, &[]);
        store.add_interview_session("u1", Some(60.0));
        let handler = RecordInterviewCompletion::new(Arc::new(store.clone()));

        handler.handle(&envelope(Value::Null)).await.unwrap();

        assert!(store.notifications().is_empty());
        assert_eq!(store.profile("u1").unwrap().interviews_completed, 1);
    }
}
