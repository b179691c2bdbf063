//! # Thrive Core Library
//!
//! Program progression, personalization and daily email delivery for the
//! Thrive wellness program. A user moves through a structured program
//! measured in days since onboarding; every day the engine picks a focus
//! theme, a dose message and a set of do-items, biased toward the labels
//! derived from the user's onboarding answers, and an hourly job emails
//! the dose to users whose local clock reads the target hour.
//!
//! ## Architecture
//!
//! - **Calendar / Cornerstones / Program**: pure day arithmetic, the
//!   seven-theme rotation and phase resolution
//! - **Labels**: onboarding answers to personalization labels
//! - **Content**: deterministic daily selection over a [`ContentStore`]
//! - **Email**: templates, transport, the [`DailyEmailJob`] and its hourly
//!   trigger
//! - **Storage**: TOML [`Config`] and the SQLite [`ProgramDb`] that
//!   implements every collaborator trait
//!
//! Collaborators (user directory, content, templates, transport, delivery
//! log) are traits so hosts can plug in their own backends.

pub mod calendar;
pub mod content;
pub mod cornerstone;
pub mod email;
pub mod error;
pub mod labels;
pub mod onboarding;
pub mod program;
pub mod storage;
pub mod users;

pub use calendar::{date_key, elapsed_days};
pub use content::{
    today_for_user, ContentDose, ContentKey, ContentPack, ContentSelector, ContentStore,
    DailyContent, DoItem,
};
pub use cornerstone::{focused_theme, Cornerstone, CORNERSTONES};
pub use email::{
    DailyEmailJob, DeliveryLog, DeliveryRecord, DeliveryStatus, EmailTemplate, HttpMailTransport,
    JobOutcome, JobReport, JobSettings, MailTransport, OutgoingEmail, TemplateStore,
};
pub use error::{ConfigError, CoreError, MailError, StoreError, ValidationError};
pub use labels::{classify, merge_labels, Label, OnboardingAnswer, QuestionDefinition};
pub use onboarding::{complete_onboarding, OnboardingOutcome};
pub use program::{ProgramPhase, ProgramPosition};
pub use storage::{Config, ProgramDb};
pub use users::{User, UserDirectory};
