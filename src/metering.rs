//! Consumption metering: converts recorded sessions into usage metrics.
//!
//! Pure computation, no I/O. Callers pass the observation instant `now`
//! explicitly so every duration inside one report computation is measured
//! against the same clock reading.

use crate::models::{Dispenser, SessionUsage, UsageReport, UsageSession};
use chrono::{DateTime, Utc};

/// Duration of a session in seconds as observed at `now`.
///
/// Closed sessions measure end minus start. Open sessions meter live: they
/// contribute the time elapsed so far, so a report taken while a tap is
/// running reflects consumption up to that instant.
pub fn session_seconds(session: &UsageSession, now: DateTime<Utc>) -> f64 {
    let end = session.ended_at.unwrap_or(now);
    end.signed_duration_since(session.started_at)
        .num_milliseconds() as f64
        / 1000.0
}

/// Build the usage report for one dispenser from its full session history.
///
/// Volume per session is `seconds * flow_volume`; aggregates are the plain
/// sums over the breakdown. A dispenser with no sessions yields an all-zero
/// report with an empty breakdown.
pub fn build_report(
    dispenser: &Dispenser,
    sessions: &[UsageSession],
    now: DateTime<Utc>,
) -> UsageReport {
    let mut report = UsageReport {
        dispenser_id: dispenser.id,
        number_of_uses: 0,
        time_of_use_seconds: 0.0,
        number_of_litres: 0.0,
        sessions: Vec::with_capacity(sessions.len()),
    };

    for session in sessions {
        let seconds_open = session_seconds(session, now);
        let litres = seconds_open * dispenser.flow_volume;

        report.number_of_uses += 1;
        report.time_of_use_seconds += seconds_open;
        report.number_of_litres += litres;
        report.sessions.push(SessionUsage {
            session_id: session.id,
            seconds_open,
            litres,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn dispenser(flow_volume: f64) -> Dispenser {
        Dispenser {
            id: Uuid::new_v4(),
            flow_volume,
            created_at: Utc::now(),
        }
    }

    fn closed_session(dispenser_id: Uuid, started_at: DateTime<Utc>, seconds: i64) -> UsageSession {
        UsageSession {
            id: Uuid::now_v7(),
            dispenser_id,
            started_at,
            ended_at: Some(started_at + Duration::seconds(seconds)),
        }
    }

    #[test]
    fn test_closed_session_ten_seconds_at_two_litres_per_second() {
        let dispenser = dispenser(2.0);
        let now = Utc::now();
        let sessions = vec![closed_session(dispenser.id, now - Duration::seconds(60), 10)];

        let report = build_report(&dispenser, &sessions, now);

        assert_eq!(report.number_of_uses, 1);
        assert_eq!(report.time_of_use_seconds, 10.0);
        assert_eq!(report.number_of_litres, 20.0);
        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.sessions[0].litres, 20.0);
    }

    #[test]
    fn test_open_session_meters_elapsed_time() {
        let dispenser = dispenser(0.5);
        let started_at = Utc::now();
        let session = UsageSession {
            id: Uuid::now_v7(),
            dispenser_id: dispenser.id,
            started_at,
            ended_at: None,
        };

        let now = started_at + Duration::seconds(30);
        let report = build_report(&dispenser, &[session], now);

        assert_eq!(report.time_of_use_seconds, 30.0);
        assert_eq!(report.number_of_litres, 15.0);
    }

    #[test]
    fn test_zero_sessions_yield_zero_report() {
        let dispenser = dispenser(1.5);

        let report = build_report(&dispenser, &[], Utc::now());

        assert_eq!(report.number_of_uses, 0);
        assert_eq!(report.time_of_use_seconds, 0.0);
        assert_eq!(report.number_of_litres, 0.0);
        assert!(report.sessions.is_empty());
    }

    #[test]
    fn test_aggregates_sum_over_sessions() {
        let dispenser = dispenser(2.0);
        let now = Utc::now();
        let base = now - Duration::seconds(600);
        let sessions = vec![
            closed_session(dispenser.id, base, 10),
            closed_session(dispenser.id, base + Duration::seconds(60), 5),
        ];

        let report = build_report(&dispenser, &sessions, now);

        assert_eq!(report.number_of_uses, 2);
        assert_eq!(report.time_of_use_seconds, 15.0);
        assert_eq!(report.number_of_litres, 30.0);
    }

    #[test]
    fn test_sub_second_precision() {
        let dispenser = dispenser(2.0);
        let started_at = Utc::now();
        let session = UsageSession {
            id: Uuid::now_v7(),
            dispenser_id: dispenser.id,
            started_at,
            ended_at: Some(started_at + Duration::milliseconds(1500)),
        };

        let report = build_report(&dispenser, &[session], started_at);

        assert_eq!(report.time_of_use_seconds, 1.5);
        assert_eq!(report.number_of_litres, 3.0);
    }
}
