use crate::errors::{DispenserEngineError, Result};
use crate::metering;
use crate::models::{Dispenser, UsageReport, UsageSession};
use crate::storage::DispenserStore;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::try_join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Dispenser registry and tap usage ledger.
///
/// Each dispenser is an implicit two-state machine (closed/open) derived from
/// its session log: the tap is open exactly when an open session exists.
/// Session-mutating operations are serialized per dispenser id so that at
/// most one open session can ever exist for a dispenser, even under
/// concurrent callers. Listing and report generation take no tap lock.
pub struct DispenserService {
    store: Arc<dyn DispenserStore>,
    tap_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl DispenserService {
    pub fn new(store: Arc<dyn DispenserStore>) -> Self {
        DispenserService {
            store,
            tap_locks: DashMap::new(),
        }
    }

    fn tap_lock(&self, dispenser_id: Uuid) -> Arc<Mutex<()>> {
        self.tap_locks
            .entry(dispenser_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Register a new dispenser with a fixed flow volume.
    pub async fn create_dispenser(&self, flow_volume: f64) -> Result<Dispenser> {
        if !flow_volume.is_finite() || flow_volume <= 0.0 {
            return Err(DispenserEngineError::Validation(
                "Flow volume must be a positive value".to_string(),
            ));
        }

        let dispenser = self.store.insert_dispenser(flow_volume).await?;
        info!(
            "Registered dispenser {} with flow volume {} l/s",
            dispenser.id, dispenser.flow_volume
        );
        Ok(dispenser)
    }

    pub async fn list_dispensers(&self) -> Result<Vec<Dispenser>> {
        self.store.fetch_all_dispensers().await
    }

    /// Open the tap. Returns `false` without mutating anything when the tap
    /// is already open; this is an expected outcome, not an error.
    ///
    /// The dispenser id is deliberately not checked against the registry:
    /// sessions for unknown ids are tracked independently.
    pub async fn open_tap(&self, dispenser_id: Uuid) -> Result<bool> {
        let lock = self.tap_lock(dispenser_id);
        let _guard = lock.lock().await;

        if self.store.fetch_open_usage_session(dispenser_id).await?.is_some() {
            warn!("Attempted to open tap for dispenser {}, but tap is already open", dispenser_id);
            return Ok(false);
        }

        let session = self.store.insert_usage_session(dispenser_id, Utc::now()).await?;
        info!(
            "Tap opened for dispenser {} (session {} at {})",
            dispenser_id, session.id, session.started_at
        );
        Ok(true)
    }

    /// Close the tap. Returns `false` without mutating anything when no open
    /// session exists. Closing twice in a row yields `true` then `false`.
    pub async fn close_tap(&self, dispenser_id: Uuid) -> Result<bool> {
        let lock = self.tap_lock(dispenser_id);
        let _guard = lock.lock().await;

        let session = match self.store.fetch_open_usage_session(dispenser_id).await? {
            Some(session) => session,
            None => {
                warn!(
                    "Attempted to close tap for dispenser {}, but tap is already closed or not in use",
                    dispenser_id
                );
                return Ok(false);
            }
        };

        let ended_at = Utc::now();
        if !self
            .store
            .update_usage_session_end_time(session.id, ended_at)
            .await?
        {
            warn!(
                "Open session {} for dispenser {} disappeared before close",
                session.id, dispenser_id
            );
            return Ok(false);
        }

        info!("Tap closed for dispenser {} (session {} at {})", dispenser_id, session.id, ended_at);
        Ok(true)
    }

    pub async fn list_sessions(&self, dispenser_id: Uuid) -> Result<Vec<UsageSession>> {
        self.store.fetch_usage_sessions(dispenser_id).await
    }

    /// One usage report per registered dispenser, recomputed from the full
    /// session history. All durations are measured against a single `now`
    /// snapshot so open sessions meter consistently across the batch.
    pub async fn usage_reports(&self) -> Result<Vec<UsageReport>> {
        let dispensers = self.store.fetch_all_dispensers().await?;

        let session_lists = try_join_all(
            dispensers
                .iter()
                .map(|dispenser| self.store.fetch_usage_sessions(dispenser.id)),
        )
        .await?;

        let now = Utc::now();
        let reports = dispensers
            .iter()
            .zip(session_lists.iter())
            .map(|(dispenser, sessions)| metering::build_report(dispenser, sessions, now))
            .collect();

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockDispenserStore;
    use chrono::{DateTime, Duration};

    fn open_session(dispenser_id: Uuid, started_at: DateTime<Utc>) -> UsageSession {
        UsageSession {
            id: Uuid::now_v7(),
            dispenser_id,
            started_at,
            ended_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_dispenser_persists_flow_volume() {
        let mut store = MockDispenserStore::new();
        store
            .expect_insert_dispenser()
            .times(1)
            .returning(|flow_volume| {
                Ok(Dispenser {
                    id: Uuid::new_v4(),
                    flow_volume,
                    created_at: Utc::now(),
                })
            });
        let service = DispenserService::new(Arc::new(store));

        let dispenser = service.create_dispenser(0.5).await.unwrap();

        assert_eq!(dispenser.flow_volume, 0.5);
    }

    #[tokio::test]
    async fn test_create_dispenser_rejects_non_positive_flow_volume() {
        let mut store = MockDispenserStore::new();
        store.expect_insert_dispenser().never();
        let service = DispenserService::new(Arc::new(store));

        for flow_volume in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = service.create_dispenser(flow_volume).await;
            assert!(matches!(result, Err(DispenserEngineError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_open_tap_with_open_session_is_a_no_op() {
        let dispenser_id = Uuid::new_v4();
        let mut store = MockDispenserStore::new();
        store
            .expect_fetch_open_usage_session()
            .times(1)
            .returning(move |id| Ok(Some(open_session(id, Utc::now()))));
        store.expect_insert_usage_session().never();
        let service = DispenserService::new(Arc::new(store));

        assert!(!service.open_tap(dispenser_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_open_tap_creates_session() {
        let dispenser_id = Uuid::new_v4();
        let mut store = MockDispenserStore::new();
        store
            .expect_fetch_open_usage_session()
            .times(1)
            .returning(|_| Ok(None));
        store
            .expect_insert_usage_session()
            .times(1)
            .returning(|id, started_at| Ok(open_session(id, started_at)));
        let service = DispenserService::new(Arc::new(store));

        assert!(service.open_tap(dispenser_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_close_tap_ends_open_session() {
        let dispenser_id = Uuid::new_v4();
        let mut store = MockDispenserStore::new();
        store
            .expect_fetch_open_usage_session()
            .times(1)
            .returning(|id| Ok(Some(open_session(id, Utc::now() - Duration::seconds(5)))));
        store
            .expect_update_usage_session_end_time()
            .times(1)
            .returning(|_, _| Ok(true));
        let service = DispenserService::new(Arc::new(store));

        assert!(service.close_tap(dispenser_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_close_tap_without_open_session_is_a_no_op() {
        let dispenser_id = Uuid::new_v4();
        let mut store = MockDispenserStore::new();
        store
            .expect_fetch_open_usage_session()
            .times(1)
            .returning(|_| Ok(None));
        store.expect_update_usage_session_end_time().never();
        let service = DispenserService::new(Arc::new(store));

        assert!(!service.close_tap(dispenser_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_usage_reports_cover_every_registered_dispenser() {
        let mut store = MockDispenserStore::new();
        store.expect_fetch_all_dispensers().times(1).returning(|| {
            Ok(vec![
                Dispenser {
                    id: Uuid::new_v4(),
                    flow_volume: 1.0,
                    created_at: Utc::now(),
                },
                Dispenser {
                    id: Uuid::new_v4(),
                    flow_volume: 2.0,
                    created_at: Utc::now(),
                },
            ])
        });
        store
            .expect_fetch_usage_sessions()
            .times(2)
            .returning(|_| Ok(Vec::new()));
        let service = DispenserService::new(Arc::new(store));

        let reports = service.usage_reports().await.unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.number_of_uses == 0));
        assert!(reports.iter().all(|r| r.sessions.is_empty()));
    }
}
