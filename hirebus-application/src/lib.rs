//! 招聘平台的事件处理器（hirebus-application）
//!
//! 在 `hirebus-core` 之上提供已交付的业务处理器与它们依赖的存储端口：
//! - `handlers`：job.created / application.created / interview.completed /
//!   activity.problem_solved 四个幂等处理器与启动时的固定处理器表；
//! - `store`：`RecruitingStore` 端口；
//! - `inmemory_store`：内存实现；`postgres_store`：Postgres 实现（`infra-sqlx`）。
//!
pub mod error;
pub mod handlers;
pub mod inmemory_store;
pub mod payloads;
#[cfg(feature = "infra-sqlx")]
pub mod postgres_store;
pub mod store;

pub use handlers::default_registry;
pub use inmemory_store::InMemoryRecruitingStore;
#[cfg(feature = "infra-sqlx")]
pub use postgres_store::PgRecruitingStore;
pub use store::RecruitingStore;
