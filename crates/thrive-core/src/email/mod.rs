//! Daily email delivery: templates, transport, the hourly job.

pub mod delivery;
pub mod job;
pub mod template;
pub mod transport;
pub mod trigger;
pub mod unsubscribe;

pub use delivery::{DeliveryLog, DeliveryRecord, DeliveryStatus};
pub use job::{parse_timezone, DailyEmailJob, JobOutcome, JobReport, JobSettings};
pub use template::{fill, EmailTemplate, RenderedEmail, TemplateStore, TemplateVars};
pub use transport::{HttpMailTransport, MailTransport, OutgoingEmail, API_KEY_ENV};
pub use trigger::{next_top_of_hour, run_hourly};
pub use unsubscribe::{unsubscribe_token, unsubscribe_url, verify_unsubscribe_token};
