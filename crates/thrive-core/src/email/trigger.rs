//! Hourly trigger for the daily email job.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::job::{DailyEmailJob, JobOutcome};

const SECS_PER_HOUR: i64 = 3600;

/// First top of the hour strictly after `now`.
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let next = (now.timestamp().div_euclid(SECS_PER_HOUR) + 1) * SECS_PER_HOUR;
    DateTime::from_timestamp(next, 0).unwrap_or(now)
}

/// Run `job` at every top of the hour, forever.
///
/// A run that aborts is logged and the loop carries on with the next hour.
pub async fn run_hourly(job: Arc<DailyEmailJob>) {
    loop {
        let now = Utc::now();
        let next = next_top_of_hour(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(next = %next, "waiting for next hourly run");
        tokio::time::sleep(wait).await;

        let report = job.run_at(next).await;
        match report.outcome {
            JobOutcome::Aborted => warn!(
                error = report.error.as_deref().unwrap_or_default(),
                "hourly run aborted"
            ),
            outcome => info!(
                ?outcome,
                sent = report.sent,
                failed = report.failed,
                "hourly run complete"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rounds_up_to_the_next_hour() {
        let now = Utc.with_ymd_and_hms(2026, 3, 8, 9, 59, 59).unwrap();
        assert_eq!(
            next_top_of_hour(now),
            Utc.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn exact_hour_moves_forward() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            next_top_of_hour(now),
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
