//! Persistence contract and adapters.
//!
//! The service talks to storage exclusively through [`DispenserStore`].
//! Adapters assign record identities on insert; callers never pick ids.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::Database;

use crate::errors::Result;
use crate::models::{Dispenser, UsageSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DispenserStore: Send + Sync {
    /// Persist a new dispenser and return it with its assigned id.
    async fn insert_dispenser(&self, flow_volume: f64) -> Result<Dispenser>;

    async fn fetch_all_dispensers(&self) -> Result<Vec<Dispenser>>;

    /// Persist a new open session (`ended_at` absent) and return it with its
    /// assigned id.
    async fn insert_usage_session(
        &self,
        dispenser_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<UsageSession>;

    /// Set the end timestamp on a session. Returns `false` when no session
    /// with that id exists.
    async fn update_usage_session_end_time(
        &self,
        session_id: Uuid,
        ended_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// The session with an absent end timestamp for this dispenser, if any.
    ///
    /// At most one open session per dispenser is expected; if storage ever
    /// holds more, adapters return the earliest by start time and log the
    /// inconsistency rather than failing.
    async fn fetch_open_usage_session(&self, dispenser_id: Uuid) -> Result<Option<UsageSession>>;

    /// Every session ever recorded for this dispenser, chronological by
    /// start time.
    async fn fetch_usage_sessions(&self, dispenser_id: Uuid) -> Result<Vec<UsageSession>>;
}
