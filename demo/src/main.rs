use anyhow::{Context, Result};
use hirebus_application::{InMemoryRecruitingStore, RecruitingStore, default_registry};
use hirebus_core::{EventSystemConfig, EventType, InMemorySubstrate, MessageSubstrate, init};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct DemoConfig {
    redis_url: Option<String>,
    database_url: Option<String>,
    drain_interval: Option<Duration>,
    dead_letter_after: Option<u32>,
}

impl DemoConfig {
    fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let drain_interval = match std::env::var("HIREBUS_DRAIN_INTERVAL_SECS") {
            Ok(v) => Some(Duration::from_secs(
                v.parse().context("HIREBUS_DRAIN_INTERVAL_SECS must be an integer")?,
            )),
            Err(_) => None,
        };
        let dead_letter_after = match std::env::var("HIREBUS_DEAD_LETTER_AFTER") {
            Ok(v) => Some(v.parse().context("HIREBUS_DEAD_LETTER_AFTER must be an integer")?),
            Err(_) => None,
        };

        Ok(Self {
            redis_url: std::env::var("REDIS_URL").ok(),
            database_url: std::env::var("DATABASE_URL").ok(),
            drain_interval,
            dead_letter_after,
        })
    }

    fn event_system(&self) -> EventSystemConfig {
        EventSystemConfig::builder()
            .maybe_drain_interval(self.drain_interval)
            .maybe_dead_letter_after(self.dead_letter_after)
            .build()
    }
}

async fn connect_substrate(config: &DemoConfig) -> Result<Arc<dyn MessageSubstrate>> {
    #[cfg(feature = "redis")]
    if let Some(url) = config.redis_url.as_deref() {
        info!("using redis substrate");
        let substrate = hirebus_core::substrate::RedisSubstrate::connect(url).await?;
        return Ok(Arc::new(substrate));
    }

    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL is set but the `redis` feature is disabled");
    }
    info!("using in-memory substrate");
    Ok(Arc::new(InMemorySubstrate::default()))
}

/// 返回处理器使用的存储；内存存储额外返回一份句柄用于打印结果
async fn connect_store(
    config: &DemoConfig,
) -> Result<(Arc<dyn RecruitingStore>, Option<InMemoryRecruitingStore>)> {
    #[cfg(feature = "infra-sqlx")]
    if let Some(url) = config.database_url.as_deref() {
        info!("using postgres store");
        let store = hirebus_application::PgRecruitingStore::connect(url).await?;
        return Ok((Arc::new(store), None));
    }

    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the `infra-sqlx` feature is disabled");
    }
    info!("using seeded in-memory store");
    let store = InMemoryRecruitingStore::new();
    store.add_recruiter("r1");
    store.add_job("j7", "Backend Engineer", "r1", &["rust", "postgres"]);
    store.add_candidate("c1", Some("Ada Lovelace"), &["rust"]);
    store.add_candidate("c2", Some("Grace Hopper"), &["cobol"]);
    store.add_application("c1", "j7");
    store.add_interview_session("c1", Some(88.0));
    store.mark_solved("c1", "p42");
    Ok((Arc::new(store.clone()), Some(store)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hirebus_core=info".parse()?)
                .add_directive("demo=info".parse()?),
        )
        .init();

    let config = DemoConfig::from_env()?;
    info!(?config, "starting hirebus demo");

    let substrate = connect_substrate(&config).await?;
    let (store, seeded) = connect_store(&config).await?;

    let (publisher, handle) =
        init(substrate, default_registry(store), config.event_system()).await?;

    publisher
        .publish(
            EventType::JobCreated,
            json!({"jobId": "j7", "title": "Backend Engineer", "companyId": "c3"}),
        )
        .await?;
    publisher
        .publish(
            EventType::ApplicationCreated,
            json!({"applicationId": "a1", "jobId": "j7", "candidateId": "c1"}),
        )
        .await?;
    publisher
        .publish(
            EventType::InterviewCompleted,
            json!({
                "sessionId": "s1",
                "candidateId": "c1",
                "jobId": "j7",
                "scores": {"total": 88.0, "technical": 90.0, "behavioral": 86.0, "communication": 87.0}
            }),
        )
        .await?;
    publisher
        .publish(
            EventType::ProblemSolved,
            json!({"userId": "c1", "problemId": "p42"}),
        )
        .await?;

    tokio::time::sleep(Duration::from_millis(500)).await;

    if let Some(store) = seeded {
        for n in store.notifications() {
            info!(user_id = %n.user_id, kind = n.kind, title = %n.title, "{}", n.message);
        }
        if let Some(profile) = store.profile("c1") {
            info!(
                problems_solved = profile.problems_solved,
                interviews_completed = profile.interviews_completed,
                "candidate c1 profile"
            );
        }
    }

    handle.shutdown();
    handle.join().await;
    Ok(())
}
