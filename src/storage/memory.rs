//! In-memory storage adapter.
//!
//! Default store when no database URL is configured, and the fixture the
//! integration tests run against. Sessions are kept in insertion order,
//! which is chronological because inserts stamp `started_at` at open time.

use crate::errors::Result;
use crate::models::{Dispenser, UsageSession};
use crate::storage::DispenserStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    dispensers: RwLock<Vec<Dispenser>>,
    sessions: RwLock<Vec<UsageSession>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }
}

#[async_trait]
impl DispenserStore for InMemoryStore {
    async fn insert_dispenser(&self, flow_volume: f64) -> Result<Dispenser> {
        let dispenser = Dispenser {
            id: Uuid::new_v4(),
            flow_volume,
            created_at: Utc::now(),
        };

        self.dispensers.write().await.push(dispenser.clone());
        Ok(dispenser)
    }

    async fn fetch_all_dispensers(&self) -> Result<Vec<Dispenser>> {
        Ok(self.dispensers.read().await.clone())
    }

    async fn insert_usage_session(
        &self,
        dispenser_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<UsageSession> {
        let session = UsageSession {
            // v7 keeps session ids time-ordered within this store instance
            id: Uuid::now_v7(),
            dispenser_id,
            started_at,
            ended_at: None,
        };

        self.sessions.write().await.push(session.clone());
        Ok(session)
    }

    async fn update_usage_session_end_time(
        &self,
        session_id: Uuid,
        ended_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut sessions = self.sessions.write().await;

        match sessions.iter_mut().find(|s| s.id == session_id) {
            Some(session) => {
                session.ended_at = Some(ended_at);
                Ok(true)
            }
            None => {
                warn!("Attempted to end usage session {}, but it was not found", session_id);
                Ok(false)
            }
        }
    }

    async fn fetch_open_usage_session(&self, dispenser_id: Uuid) -> Result<Option<UsageSession>> {
        let sessions = self.sessions.read().await;

        let mut open = sessions
            .iter()
            .filter(|s| s.dispenser_id == dispenser_id && s.is_open());

        let first = open.next().cloned();
        let extra = open.count();
        if extra > 0 {
            warn!(
                "Dispenser {} has {} open usage sessions, returning the earliest",
                dispenser_id,
                extra + 1
            );
        }

        Ok(first)
    }

    async fn fetch_usage_sessions(&self, dispenser_id: Uuid) -> Result<Vec<UsageSession>> {
        let sessions = self.sessions.read().await;

        Ok(sessions
            .iter()
            .filter(|s| s.dispenser_id == dispenser_id)
            .cloned()
            .collect())
    }
}
