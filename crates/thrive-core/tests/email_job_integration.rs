//! Integration tests for the daily email job.
//!
//! Users, content and templates live in an in-memory `ProgramDb`; the
//! transport is an in-process fake so sends can be inspected and made to
//! fail per recipient.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thrive_core::content::{ContentDose, ContentKey};
use thrive_core::email::{
    DailyEmailJob, DeliveryStatus, EmailTemplate, JobOutcome, JobSettings, MailTransport,
    OutgoingEmail, TemplateStore,
};
use thrive_core::error::{MailError, StoreError};
use thrive_core::storage::ProgramDb;
use thrive_core::users::{User, UserDirectory};

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Default)]
struct FakeTransport {
    sent: Mutex<Vec<OutgoingEmail>>,
    reject: HashSet<String>,
    reject_all: bool,
}

impl FakeTransport {
    fn failing() -> Self {
        Self {
            reject_all: true,
            ..Self::default()
        }
    }

    fn rejecting(addresses: &[&str]) -> Self {
        Self {
            reject: addresses.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn send(&self, message: &OutgoingEmail) -> Result<String, MailError> {
        if self.reject_all || self.reject.contains(&message.to) {
            return Err(MailError::Http {
                status: 500,
                body: "provider down".into(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("msg_{}", sent.len()))
    }
}

struct BrokenDirectory;

impl UserDirectory for BrokenDirectory {
    fn list_email_eligible_users(&self) -> Result<Vec<User>, StoreError> {
        Err(StoreError::Unavailable("directory offline".into()))
    }

    fn get_user(&self, id: &str) -> Result<User, StoreError> {
        Err(StoreError::NotFound {
            kind: "user",
            id: id.into(),
        })
    }

    fn save_onboarding(
        &self,
        _id: &str,
        _labels: &BTreeSet<String>,
        _start: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("directory offline".into()))
    }
}

/// 15:00 UTC on a winter day: 10:00 in New York, 15:00 in London,
/// midnight in Tokyo.
fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
}

fn settings() -> JobSettings {
    JobSettings {
        batch_delay: Duration::ZERO,
        unsubscribe_secret: "test-secret".into(),
        app_url: "https://app.thrive.test".into(),
        ..JobSettings::default()
    }
}

fn opted_in(id: &str, timezone: Option<&str>, start_days_ago: Option<i64>) -> User {
    let mut user = User::new(id, format!("{id}@example.com"));
    user.email_opt_in = true;
    user.timezone = timezone.map(str::to_string);
    user.program_start_date = start_days_ago.map(|d| run_time() - chrono::Duration::days(d));
    user
}

fn seeded_db() -> ProgramDb {
    let db = ProgramDb::open_memory().unwrap();
    db.upsert_template(&EmailTemplate {
        id: "daily".into(),
        subject: "Day {{programDay}}, {{userName}}".into(),
        html_body: "<p>{{doseMessage}}</p><a href=\"{{unsubscribeUrl}}\">unsubscribe</a>".into(),
        text_body: "{{doseMessage}} {{unknownToken}}".into(),
        is_active: true,
    })
    .unwrap();
    for day in 1..=7u8 {
        db.insert_dose(&ContentDose {
            id: format!("week-{day}"),
            title: String::new(),
            message: format!("Week one, day {day}."),
            key: ContentKey::Day(day),
            target_labels: Vec::new(),
            active: true,
        })
        .unwrap();
    }
    db
}

fn job(db: Arc<ProgramDb>, transport: Arc<FakeTransport>, settings: JobSettings) -> DailyEmailJob {
    DailyEmailJob::new(db.clone(), db.clone(), db.clone(), transport, settings)
        .with_delivery_log(db)
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn only_users_at_target_hour_are_attempted_and_failures_are_counted() {
    let db = Arc::new(seeded_db());
    db.upsert_user(&opted_in("ny", None, Some(2))).unwrap();
    db.upsert_user(&opted_in("london", Some("Europe/London"), Some(2)))
        .unwrap();
    db.upsert_user(&opted_in("tokyo", Some("Asia/Tokyo"), Some(2)))
        .unwrap();

    let transport = Arc::new(FakeTransport::failing());
    let report = job(db.clone(), transport.clone(), settings())
        .run_at(run_time())
        .await;

    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.total, 1);
    assert_eq!(report.sent, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(report.deliveries[0].user_id, "ny");
    assert!(report.deliveries[0].error.is_some());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn successful_send_fills_template_and_logs_delivery() {
    let db = Arc::new(seeded_db());
    db.upsert_user(&opted_in("ruth", Some("America/New_York"), Some(2)))
        .unwrap();

    let transport = Arc::new(FakeTransport::default());
    let report = job(db.clone(), transport.clone(), settings())
        .run_at(run_time())
        .await;

    assert_eq!(report.sent, 1);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ruth@example.com");
    assert_eq!(sent[0].subject, "Day 3, ruth");
    assert_eq!(sent[0].text, "Week one, day 3. ");
    assert!(sent[0]
        .html
        .contains("https://app.thrive.test/unsubscribe?uid=ruth&token="));

    let logged = db.deliveries_on("2026-03-02").unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].status, DeliveryStatus::Sent);
    assert_eq!(logged[0].provider_id.as_deref(), Some("msg_1"));
    assert_eq!(logged[0].dose_id.as_deref(), Some("week-3"));
    assert_eq!(logged[0].program_day, 3);
}

#[tokio::test]
async fn users_without_start_date_get_day_one() {
    let db = Arc::new(seeded_db());
    db.upsert_user(&opted_in("fresh", None, None)).unwrap();

    let transport = Arc::new(FakeTransport::default());
    let report = job(db, transport.clone(), settings()).run_at(run_time()).await;

    assert_eq!(report.deliveries[0].program_day, 1);
    assert_eq!(transport.sent()[0].text, "Week one, day 1. ");
}

#[tokio::test]
async fn no_one_at_target_hour_sends_nothing() {
    let db = Arc::new(seeded_db());
    db.upsert_user(&opted_in("tokyo", Some("Asia/Tokyo"), Some(2)))
        .unwrap();

    let transport = Arc::new(FakeTransport::default());
    let report = job(db, transport.clone(), settings()).run_at(run_time()).await;

    assert_eq!(report.outcome, JobOutcome::NoRecipients);
    assert_eq!(report.total, 0);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn missing_or_inactive_template_sends_nothing() {
    let db = Arc::new(seeded_db());
    db.upsert_user(&opted_in("ny", None, Some(2))).unwrap();
    let transport = Arc::new(FakeTransport::default());

    let mut other = settings();
    other.template_id = "does-not-exist".into();
    let report = job(db.clone(), transport.clone(), other)
        .run_at(run_time())
        .await;
    assert_eq!(report.outcome, JobOutcome::NoActiveTemplate);

    let mut template = db.email_template("daily").unwrap().unwrap();
    template.is_active = false;
    db.upsert_template(&template).unwrap();
    let report = job(db, transport.clone(), settings()).run_at(run_time()).await;
    assert_eq!(report.outcome, JobOutcome::NoActiveTemplate);
    assert_eq!(report.sent + report.failed, 0);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn failing_user_directory_aborts_with_error() {
    let db = Arc::new(seeded_db());
    let transport = Arc::new(FakeTransport::default());
    let job = DailyEmailJob::new(
        Arc::new(BrokenDirectory),
        db.clone(),
        db,
        transport.clone(),
        settings(),
    );

    let report = job.run_at(run_time()).await;
    assert_eq!(report.outcome, JobOutcome::Aborted);
    assert_eq!((report.total, report.sent, report.failed), (0, 0, 0));
    assert!(report.error.unwrap().contains("directory offline"));
}

#[tokio::test]
async fn one_failure_does_not_affect_the_rest_of_the_batch() {
    let db = Arc::new(seeded_db());
    for id in ["a", "b", "c", "d", "e"] {
        db.upsert_user(&opted_in(id, None, Some(1))).unwrap();
    }

    let transport = Arc::new(FakeTransport::rejecting(&["c@example.com"]));
    let mut batched = settings();
    batched.batch_size = 2;
    batched.batch_delay = Duration::from_millis(5);
    let report = job(db.clone(), transport.clone(), batched)
        .run_at(run_time())
        .await;

    assert_eq!(report.total, 5);
    assert_eq!(report.sent, 4);
    assert_eq!(report.failed, 1);
    let failed: Vec<&str> = report
        .deliveries
        .iter()
        .filter(|d| d.status == DeliveryStatus::Failed)
        .map(|d| d.user_id.as_str())
        .collect();
    assert_eq!(failed, vec!["c"]);
    assert_eq!(db.deliveries_on("2026-03-02").unwrap().len(), 5);
}

#[tokio::test]
async fn bad_timezone_is_skipped_not_fatal() {
    let db = Arc::new(seeded_db());
    db.upsert_user(&opted_in("ny", None, Some(2))).unwrap();
    db.upsert_user(&opted_in("lost", Some("Atlantis/Capital"), Some(2)))
        .unwrap();

    let transport = Arc::new(FakeTransport::default());
    let report = job(db, transport, settings()).run_at(run_time()).await;

    assert_eq!(report.skipped_timezone, 1);
    assert_eq!(report.sent, 1);
}

#[tokio::test]
async fn welcome_is_day_one_regardless_of_hour() {
    let db = Arc::new(seeded_db());
    db.upsert_user(&opted_in("tokyo", Some("Asia/Tokyo"), Some(20)))
        .unwrap();

    let transport = Arc::new(FakeTransport::default());
    let record = job(db, transport.clone(), settings())
        .send_welcome("tokyo", run_time())
        .await
        .unwrap();

    assert_eq!(record.status, DeliveryStatus::Sent);
    assert_eq!(record.program_day, 1);
    assert_eq!(transport.sent()[0].subject, "Day 1, tokyo");
}

#[tokio::test]
async fn welcome_for_unknown_user_is_an_error() {
    let db = Arc::new(seeded_db());
    let transport = Arc::new(FakeTransport::default());
    let result = job(db, transport, settings())
        .send_welcome("ghost", run_time())
        .await;
    assert!(result.is_err());
}
