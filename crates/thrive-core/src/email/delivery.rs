//! Per-recipient delivery records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::date_key;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(DeliveryStatus::Sent),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

/// Outcome of one recipient in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: String,
    /// UTC day of the attempt, `YYYY-MM-DD`.
    pub date_key: String,
    pub user_id: String,
    pub email: String,
    pub program_day: i64,
    pub dose_id: Option<String>,
    pub status: DeliveryStatus,
    pub provider_id: Option<String>,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn new(user_id: &str, email: &str, attempted_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date_key: date_key(attempted_at),
            user_id: user_id.to_string(),
            email: email.to_string(),
            program_day: 0,
            dose_id: None,
            status: DeliveryStatus::Failed,
            provider_id: None,
            error: None,
            attempted_at,
        }
    }
}

/// Sink for delivery records. Recording failures never affect sending.
pub trait DeliveryLog: Send + Sync {
    fn record(&self, record: &DeliveryRecord) -> Result<(), StoreError>;
}
