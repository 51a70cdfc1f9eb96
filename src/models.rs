use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered dispenser. Flow volume is fixed at creation and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Dispenser {
    pub id: Uuid,
    pub flow_volume: f64,                 // litres per second of open-tap time
    pub created_at: DateTime<Utc>,
}

/// One contiguous open-to-close interval for a dispenser.
///
/// An absent `ended_at` is the single source of truth for "tap is open";
/// there is no stored status flag to drift out of sync with the session log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UsageSession {
    pub id: Uuid,
    pub dispenser_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl UsageSession {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Create dispenser request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateDispenserRequest {
    pub flow_volume: f64,
}

/// Per-session slice of a usage report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUsage {
    pub session_id: Uuid,
    pub seconds_open: f64,
    pub litres: f64,
}

/// Aggregated consumption for one dispenser.
///
/// Derived on every query from the full session history, never persisted.
/// Open sessions contribute their elapsed time so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    pub dispenser_id: Uuid,
    pub number_of_uses: u64,
    pub time_of_use_seconds: f64,
    pub number_of_litres: f64,
    pub sessions: Vec<SessionUsage>,
}
