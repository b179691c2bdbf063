//! Mail transport: the seam between the job and the mail provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::error::MailError;
use crate::storage::MailConfig;

/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "THRIVE_MAIL_API_KEY";

/// A fully rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Delivers one message and returns the provider's message id.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutgoingEmail) -> Result<String, MailError>;
}

/// JSON-over-HTTP mail API client.
///
/// Posts `{from, to, subject, html, text}` to `{endpoint}/emails` with a
/// bearer key and reads `{"id": …}` back.
pub struct HttpMailTransport {
    emails_url: Url,
    api_key: String,
    from: String,
    http_client: Client,
}

impl HttpMailTransport {
    pub fn new(endpoint: &str, api_key: &str, from: &str) -> Result<Self, MailError> {
        if api_key.is_empty() {
            return Err(MailError::NotConfigured("missing API key".into()));
        }
        let base = Url::parse(&format!("{}/", endpoint.trim_end_matches('/')))
            .map_err(|e| MailError::NotConfigured(format!("bad endpoint '{endpoint}': {e}")))?;
        let emails_url = base
            .join("emails")
            .map_err(|e| MailError::NotConfigured(format!("bad endpoint '{endpoint}': {e}")))?;

        Ok(Self {
            emails_url,
            api_key: api_key.to_string(),
            from: from.to_string(),
            http_client: Client::new(),
        })
    }

    /// Build from config, falling back to `THRIVE_MAIL_API_KEY` for the key.
    pub fn from_config(config: &MailConfig, from: &str) -> Result<Self, MailError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default();
        Self::new(&config.endpoint, &api_key, from)
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &OutgoingEmail) -> Result<String, MailError> {
        if !message.to.contains('@') {
            return Err(MailError::InvalidRecipient(message.to.clone()));
        }

        let body = json!({
            "from": &self.from,
            "to": [&message.to],
            "subject": &message.subject,
            "html": &message.html,
            "text": &message.text,
        });

        let resp = self
            .http_client
            .post(self.emails_url.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(MailError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let value: serde_json::Value = resp.json().await?;
        value
            .get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or(MailError::MissingId)
    }
}
