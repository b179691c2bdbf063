//! The daily email job.
//!
//! Once an hour the job looks at every opted-in user, keeps the ones
//! whose local clock reads the target hour, resolves their dose for the
//! day and sends it. Each recipient succeeds or fails on its own; only a
//! failure to list users aborts the run.
//!
//! ```text
//! list eligible -> filter by local hour -> load template -> compose
//!   -> dispatch in batches (sleep between) -> report
//! ```

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::delivery::{DeliveryLog, DeliveryRecord, DeliveryStatus};
use super::template::{EmailTemplate, TemplateStore, TemplateVars};
use super::transport::{MailTransport, OutgoingEmail};
use super::unsubscribe::unsubscribe_url;
use crate::content::{ContentSelector, ContentStore};
use crate::error::{ConfigError, CoreError, MailError, ValidationError};
use crate::program::{program_day, ProgramPosition};
use crate::storage::Config;
use crate::users::{User, UserDirectory};

/// Knobs for a job instance.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Local hour (0-23) at which users receive their email.
    pub target_hour: u32,
    pub template_id: String,
    pub welcome_template_id: String,
    /// Messages in flight at once.
    pub batch_size: usize,
    /// Pause between batches.
    pub batch_delay: Duration,
    /// Zone for users without one.
    pub default_timezone: Tz,
    pub app_url: String,
    pub admin_message: String,
    pub unsubscribe_secret: String,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            target_hour: 10,
            template_id: "daily".into(),
            welcome_template_id: "daily".into(),
            batch_size: 10,
            batch_delay: Duration::from_millis(1000),
            default_timezone: chrono_tz::America::New_York,
            app_url: "https://app.thrive.example".into(),
            admin_message: String::new(),
            unsubscribe_secret: String::new(),
        }
    }
}

impl JobSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let default_timezone = parse_timezone(&config.program.default_timezone).map_err(|e| {
            ConfigError::InvalidValue {
                key: "program.default_timezone".into(),
                message: e.to_string(),
            }
        })?;
        if config.email.target_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "email.target_hour".into(),
                message: format!("{} is not an hour of the day", config.email.target_hour),
            });
        }

        Ok(Self {
            target_hour: config.email.target_hour,
            template_id: config.email.template_id.clone(),
            welcome_template_id: config.email.welcome_template_id.clone(),
            batch_size: config.email.batch_size.max(1),
            batch_delay: Duration::from_millis(config.email.batch_delay_ms),
            default_timezone,
            app_url: config.email.app_url.clone(),
            admin_message: config.email.admin_message.clone(),
            unsubscribe_secret: config.unsubscribe.secret.clone(),
        })
    }
}

/// Parse an IANA zone name.
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ValidationError::UnknownTimezone(name.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Recipients were processed (individual sends may still have failed).
    Completed,
    /// Nobody is at the target hour right now.
    NoRecipients,
    /// The configured template is missing or inactive; nothing was sent.
    NoActiveTemplate,
    /// A job-level failure stopped the run before any send.
    Aborted,
}

/// Result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub started_at: DateTime<Utc>,
    pub outcome: JobOutcome,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    /// Eligible users dropped because their timezone could not be parsed.
    pub skipped_timezone: usize,
    pub error: Option<String>,
    pub deliveries: Vec<DeliveryRecord>,
}

impl JobReport {
    fn empty(started_at: DateTime<Utc>, outcome: JobOutcome) -> Self {
        Self {
            started_at,
            outcome,
            total: 0,
            sent: 0,
            failed: 0,
            skipped_timezone: 0,
            error: None,
            deliveries: Vec::new(),
        }
    }

    fn aborted(started_at: DateTime<Utc>, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::empty(started_at, JobOutcome::Aborted)
        }
    }
}

/// A composed message plus what is needed to record its outcome.
#[derive(Debug, Clone)]
struct PreparedEmail {
    record: DeliveryRecord,
    message: OutgoingEmail,
}

/// Scheduler service holding its collaborators.
pub struct DailyEmailJob {
    users: Arc<dyn UserDirectory>,
    content: Arc<dyn ContentStore>,
    templates: Arc<dyn TemplateStore>,
    transport: Arc<dyn MailTransport>,
    delivery_log: Option<Arc<dyn DeliveryLog>>,
    settings: JobSettings,
}

impl DailyEmailJob {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        content: Arc<dyn ContentStore>,
        templates: Arc<dyn TemplateStore>,
        transport: Arc<dyn MailTransport>,
        settings: JobSettings,
    ) -> Self {
        Self {
            users,
            content,
            templates,
            transport,
            delivery_log: None,
            settings,
        }
    }

    pub fn with_delivery_log(mut self, log: Arc<dyn DeliveryLog>) -> Self {
        self.delivery_log = Some(log);
        self
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Run once for the current instant.
    pub async fn run(&self) -> JobReport {
        self.run_at(Utc::now()).await
    }

    /// Run once as if the clock read `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> JobReport {
        info!(at = %now, target_hour = self.settings.target_hour, "daily email run starting");

        let eligible = match self.users.list_email_eligible_users() {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "could not list eligible users, aborting run");
                return JobReport::aborted(now, e.to_string());
            }
        };

        let (due, skipped_timezone) = self.due_recipients(eligible, now);
        if due.is_empty() {
            debug!(skipped_timezone, "no users at target hour");
            return JobReport {
                skipped_timezone,
                ..JobReport::empty(now, JobOutcome::NoRecipients)
            };
        }

        let template = match self.active_template(&self.settings.template_id) {
            Ok(Some(template)) => template,
            Ok(None) => {
                warn!(template = %self.settings.template_id, "no active template, nothing sent");
                return JobReport {
                    skipped_timezone,
                    ..JobReport::empty(now, JobOutcome::NoActiveTemplate)
                };
            }
            Err(e) => {
                error!(error = %e, "template lookup failed, aborting run");
                return JobReport {
                    skipped_timezone,
                    ..JobReport::aborted(now, e.to_string())
                };
            }
        };

        let mut deliveries = Vec::with_capacity(due.len());
        let mut queue = Vec::with_capacity(due.len());
        for user in &due {
            let position = email_position(user, now);
            match self.compose(&template, user, position, now) {
                Ok(prepared) => queue.push(prepared),
                Err(e) => {
                    warn!(user = %user.id, error = %e, "could not compose email");
                    let mut record = DeliveryRecord::new(&user.id, &user.email, now);
                    record.program_day = position.day;
                    record.error = Some(e.to_string());
                    deliveries.push(record);
                }
            }
        }

        deliveries.extend(self.dispatch(queue).await);
        for record in &deliveries {
            self.log_delivery(record);
        }

        let sent = deliveries
            .iter()
            .filter(|r| r.status == DeliveryStatus::Sent)
            .count();
        let report = JobReport {
            started_at: now,
            outcome: JobOutcome::Completed,
            total: deliveries.len(),
            sent,
            failed: deliveries.len() - sent,
            skipped_timezone,
            error: None,
            deliveries,
        };
        info!(
            total = report.total,
            sent = report.sent,
            failed = report.failed,
            "daily email run finished"
        );
        report
    }

    /// Send the day-1 welcome to one user, right now.
    ///
    /// Lookup failures are errors; a failed send is reported in the
    /// returned record.
    pub async fn send_welcome(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DeliveryRecord, CoreError> {
        let user = self.users.get_user(user_id)?;
        let template = self
            .active_template(&self.settings.welcome_template_id)?
            .ok_or_else(|| CoreError::NoActiveTemplate(self.settings.welcome_template_id.clone()))?;

        let prepared = self.compose(&template, &user, ProgramPosition::on_day(1), now)?;
        let mut records = self.dispatch(vec![prepared]).await;
        let record = records
            .pop()
            .ok_or_else(|| CoreError::Custom("welcome dispatch produced no result".into()))?;
        self.log_delivery(&record);

        info!(user = %user.id, status = record.status.as_str(), "welcome email processed");
        Ok(record)
    }

    /// Users whose local hour equals the target hour.
    fn due_recipients(&self, eligible: Vec<User>, now: DateTime<Utc>) -> (Vec<User>, usize) {
        let mut skipped = 0;
        let due = eligible
            .into_iter()
            .filter(|user| match self.local_hour(user, now) {
                Ok(hour) => hour == self.settings.target_hour,
                Err(e) => {
                    warn!(user = %user.id, error = %e, "skipping user with bad timezone");
                    skipped += 1;
                    false
                }
            })
            .collect();
        (due, skipped)
    }

    fn local_hour(&self, user: &User, now: DateTime<Utc>) -> Result<u32, ValidationError> {
        let tz = match user.timezone.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => parse_timezone(name)?,
            _ => self.settings.default_timezone,
        };
        Ok(now.with_timezone(&tz).hour())
    }

    fn active_template(&self, id: &str) -> Result<Option<EmailTemplate>, CoreError> {
        Ok(self.templates.email_template(id)?.filter(|t| t.is_active))
    }

    fn compose(
        &self,
        template: &EmailTemplate,
        user: &User,
        position: ProgramPosition,
        now: DateTime<Utc>,
    ) -> Result<PreparedEmail, CoreError> {
        let dose = ContentSelector::new(self.content.as_ref()).select_dose(position, &user.labels)?;
        if dose.is_none() {
            warn!(user = %user.id, day = position.day, "no dose for recipient, sending without one");
        }

        let vars = TemplateVars {
            user_name: user.greeting_name().to_string(),
            program_day: position.day,
            dose_message: dose.as_ref().map(|d| d.message.clone()).unwrap_or_default(),
            admin_message: self.settings.admin_message.clone(),
            app_url: self.settings.app_url.clone(),
            unsubscribe_url: unsubscribe_url(
                &self.settings.app_url,
                &user.id,
                &self.settings.unsubscribe_secret,
            ),
        };
        let rendered = template.render(&vars);

        let mut record = DeliveryRecord::new(&user.id, &user.email, now);
        record.program_day = position.day;
        record.dose_id = dose.map(|d| d.id);

        Ok(PreparedEmail {
            record,
            message: OutgoingEmail {
                to: user.email.clone(),
                subject: rendered.subject,
                html: rendered.html,
                text: rendered.text,
            },
        })
    }

    /// Send in batches of `batch_size`, pausing between batches.
    async fn dispatch(&self, queue: Vec<PreparedEmail>) -> Vec<DeliveryRecord> {
        let batch_size = self.settings.batch_size.max(1);
        let mut records = Vec::with_capacity(queue.len());

        for (index, batch) in queue.chunks(batch_size).enumerate() {
            if index > 0 && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }

            let handles: Vec<_> = batch
                .iter()
                .cloned()
                .map(|prepared| {
                    let transport = Arc::clone(&self.transport);
                    let message = prepared.message.clone();
                    let handle = tokio::spawn(async move { transport.send(&message).await });
                    (prepared, handle)
                })
                .collect();

            for (prepared, handle) in handles {
                let outcome = match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(MailError::TaskFailed(join_err.to_string())),
                };
                records.push(finish(prepared.record, outcome));
            }
        }

        records
    }

    fn log_delivery(&self, record: &DeliveryRecord) {
        if let Some(log) = &self.delivery_log {
            if let Err(e) = log.record(record) {
                warn!(user = %record.user_id, error = %e, "failed to record delivery");
            }
        }
    }
}

/// Position used for email. Users without a start date, or with one in
/// the future, get day 1.
fn email_position(user: &User, now: DateTime<Utc>) -> ProgramPosition {
    let day = user
        .program_start_date
        .map(|start| program_day(start, now))
        .unwrap_or(1);
    ProgramPosition::on_day(day.max(1))
}

fn finish(mut record: DeliveryRecord, outcome: Result<String, MailError>) -> DeliveryRecord {
    match outcome {
        Ok(provider_id) => {
            debug!(user = %record.user_id, provider_id = %provider_id, "email sent");
            record.status = DeliveryStatus::Sent;
            record.provider_id = Some(provider_id);
        }
        Err(e) => {
            warn!(user = %record.user_id, error = %e, "email send failed");
            record.status = DeliveryStatus::Failed;
            record.error = Some(e.to_string());
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_timezone_accepts_iana_names() {
        assert_eq!(parse_timezone("Europe/Berlin").unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(parse_timezone(" UTC ").unwrap(), chrono_tz::UTC);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn users_without_start_date_get_day_one() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 14, 0, 0).unwrap();
        let user = User::new("u1", "u1@example.com");
        let pos = email_position(&user, now);
        assert_eq!(pos.day, 1);
        assert!(pos.is_started());
    }

    #[test]
    fn future_start_is_clamped_to_day_one() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 14, 0, 0).unwrap();
        let mut user = User::new("u1", "u1@example.com");
        user.program_start_date = Some(now + chrono::Duration::days(3));
        assert_eq!(email_position(&user, now).day, 1);

        user.program_start_date = Some(now - chrono::Duration::days(9));
        assert_eq!(email_position(&user, now).day, 10);
    }

    #[test]
    fn settings_from_default_config() {
        let settings = JobSettings::from_config(&Config::default()).unwrap();
        assert_eq!(settings.target_hour, 10);
        assert_eq!(settings.template_id, "daily");
        assert_eq!(settings.default_timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn settings_reject_bad_timezone_and_hour() {
        let mut config = Config::default();
        config.program.default_timezone = "Nowhere/Special".into();
        assert!(JobSettings::from_config(&config).is_err());

        let mut config = Config::default();
        config.email.target_hour = 24;
        assert!(JobSettings::from_config(&config).is_err());
    }
}
