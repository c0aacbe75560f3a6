use crate::payloads::ApplicationCreated;
use crate::store::{NewNotification, NotificationKind, RecruitingStore};
use async_trait::async_trait;
use hirebus_core::{Envelope, EventHandler};
use std::sync::Arc;

/// application.created：通知职位的招聘者
pub struct NotifyRecruiterOfApplication {
    store: Arc<dyn RecruitingStore>,
}

impl NotifyRecruiterOfApplication {
    pub fn new(store: Arc<dyn RecruitingStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for NotifyRecruiterOfApplication {
    fn handler_name(&self) -> &str {
        "notify-recruiter-of-application"
    }

    async fn handle(&self, envelope: &Envelope) -> anyhow::Result<()> {
        let payload: ApplicationCreated = envelope.payload_as()?;
        tracing::debug!(
            application_id = ?payload.application_id,
            job_id = %payload.job_id,
            "processing application.created"
        );

        let Some(ctx) = self
            .store
            .application_context(&payload.candidate_id, &payload.job_id)
            .await?
        else {
            return Ok(());
        };

        let candidate = ctx.candidate_name.as_deref().unwrap_or("A candidate");
        self.store
            .insert_notification(&NewNotification {
                user_id: ctx.recruiter_id.clone(),
                kind: NotificationKind::NewApplication,
                title: "New Application".to_string(),
                message: format!("{candidate} applied for {}", ctx.job_title),
                action_url: format!("/hr/jobs/{}/candidates", payload.job_id),
                source_event_id: envelope.id().to_string(),
            })
            .await?;
        Ok(())
    }
}
