//! Postgres storage adapter.

use crate::errors::Result;
use crate::models::{Dispenser, UsageSession};
use crate::storage::DispenserStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DispenserStore for Database {
    async fn insert_dispenser(&self, flow_volume: f64) -> Result<Dispenser> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        let dispenser = sqlx::query_as::<_, Dispenser>(
            r#"
            INSERT INTO dispensers (id, flow_volume, created_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(flow_volume)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(dispenser)
    }

    async fn fetch_all_dispensers(&self) -> Result<Vec<Dispenser>> {
        let dispensers = sqlx::query_as::<_, Dispenser>(
            r#"
            SELECT * FROM dispensers
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(dispensers)
    }

    async fn insert_usage_session(
        &self,
        dispenser_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<UsageSession> {
        // v7 keeps session ids time-ordered within this store instance
        let id = Uuid::now_v7();

        let session = sqlx::query_as::<_, UsageSession>(
            r#"
            INSERT INTO usage_sessions (id, dispenser_id, started_at, ended_at)
            VALUES ($1, $2, $3, NULL)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(dispenser_id)
        .bind(started_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn update_usage_session_end_time(
        &self,
        session_id: Uuid,
        ended_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE usage_sessions
            SET ended_at = $1
            WHERE id = $2
            "#,
        )
        .bind(ended_at)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_open_usage_session(&self, dispenser_id: Uuid) -> Result<Option<UsageSession>> {
        let open = sqlx::query_as::<_, UsageSession>(
            r#"
            SELECT * FROM usage_sessions
            WHERE dispenser_id = $1 AND ended_at IS NULL
            ORDER BY started_at
            "#,
        )
        .bind(dispenser_id)
        .fetch_all(&self.pool)
        .await?;

        if open.len() > 1 {
            warn!(
                "Dispenser {} has {} open usage sessions, returning the earliest",
                dispenser_id,
                open.len()
            );
        }

        Ok(open.into_iter().next())
    }

    async fn fetch_usage_sessions(&self, dispenser_id: Uuid) -> Result<Vec<UsageSession>> {
        let sessions = sqlx::query_as::<_, UsageSession>(
            r#"
            SELECT * FROM usage_sessions
            WHERE dispenser_id = $1
            ORDER BY started_at
            "#,
        )
        .bind(dispenser_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}
