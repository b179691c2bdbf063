//! Program participants and the directory that owns them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::program::ProgramPosition;

/// A program participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    /// `None` until onboarding completes.
    #[serde(default)]
    pub program_start_date: Option<DateTime<Utc>>,
    /// IANA zone name; the configured default applies when unset.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub email_opt_in: bool,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: String::new(),
            program_start_date: None,
            timezone: None,
            labels: BTreeSet::new(),
            email_opt_in: false,
        }
    }

    /// Program position at `now`.
    pub fn position(&self, now: DateTime<Utc>) -> ProgramPosition {
        ProgramPosition::resolve(self.program_start_date, now)
    }

    /// Name used in greetings: display name, else the email local part.
    pub fn greeting_name(&self) -> &str {
        let name = self.display_name.trim();
        if !name.is_empty() {
            return name;
        }
        self.email.split('@').next().unwrap_or_default()
    }
}

/// Account store owned outside the engine.
///
/// The engine reads users and writes only the onboarding result.
pub trait UserDirectory: Send + Sync {
    /// Users who opted in to email.
    fn list_email_eligible_users(&self) -> Result<Vec<User>, StoreError>;

    fn get_user(&self, id: &str) -> Result<User, StoreError>;

    /// Persist the onboarding outcome: the full label set and start date.
    fn save_onboarding(
        &self,
        id: &str,
        labels: &BTreeSet<String>,
        program_start_date: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
