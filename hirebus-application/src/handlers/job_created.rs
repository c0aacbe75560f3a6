use super::JOB_MATCH_NOTIFY_LIMIT;
use crate::payloads::JobCreated;
use crate::store::{NewNotification, NotificationKind, RecruitingStore};
use async_trait::async_trait;
use hirebus_core::{Envelope, EventHandler};
use std::sync::Arc;

/// job.created：通知技能匹配的候选人
pub struct NotifyMatchingCandidates {
    store: Arc<dyn RecruitingStore>,
}

impl NotifyMatchingCandidates {
    pub fn new(store: Arc<dyn RecruitingStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for NotifyMatchingCandidates {
    fn handler_name(&self) -> &str {
        "notify-matching-candidates"
    }

    async fn handle(&self, envelope: &Envelope) -> anyhow::Result<()> {
        let payload: JobCreated = envelope.payload_as()?;
        tracing::debug!(job_id = %payload.job_id, "processing job.created");

        let skills = match self.store.job_required_skills(&payload.job_id).await? {
            Some(skills) if !skills.is_empty() => skills,
            _ => return Ok(()),
        };

        let candidates = self
            .store
            .candidates_with_any_skill(&skills, JOB_MATCH_NOTIFY_LIMIT)
            .await?;

        for candidate_id in &candidates {
            self.store
                .insert_notification(&NewNotification {
                    user_id: candidate_id.clone(),
                    kind: NotificationKind::NewJobMatch,
                    title: "New Job Match!".to_string(),
                    message: format!(
                        "A new position \"{}\" matches your skills.",
                        payload.title
                    ),
                    action_url: format!("/jobs/{}", payload.job_id),
                    source_event_id: envelope.id().to_string(),
                })
                .await?;
        }

        tracing::info!(
            job_id = %payload.job_id,
            notified = candidates.len(),
            "notified candidates about new job"
        );
        Ok(())
    }
}
