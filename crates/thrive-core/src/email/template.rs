//! Email templates and placeholder filling.
//!
//! Tokens are `{{name}}`, matched exactly and case-sensitively. Known
//! tokens resolve to their value; any other well-formed token resolves to
//! the empty string so no placeholder ever reaches a recipient.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A stored email template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Read access to email templates.
pub trait TemplateStore: Send + Sync {
    fn email_template(&self, id: &str) -> Result<Option<EmailTemplate>, StoreError>;
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    pub user_name: String,
    pub program_day: i64,
    pub dose_message: String,
    pub admin_message: String,
    pub app_url: String,
    pub unsubscribe_url: String,
}

impl TemplateVars {
    fn lookup(&self, token: &str) -> Option<String> {
        let value = match token {
            "userName" => self.user_name.clone(),
            "programDay" | "day" => self.program_day.to_string(),
            "doseMessage" => self.dose_message.clone(),
            "adminMessage" => self.admin_message.clone(),
            "appUrl" => self.app_url.clone(),
            "unsubscribeUrl" => self.unsubscribe_url.clone(),
            _ => return None,
        };
        Some(value)
    }
}

/// A template with every placeholder resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailTemplate {
    pub fn render(&self, vars: &TemplateVars) -> RenderedEmail {
        RenderedEmail {
            subject: fill(&self.subject, vars),
            html: fill(&self.html_body, vars),
            text: fill(&self.text_body, vars),
        }
    }
}

/// Replace every `{{token}}` in `text`.
///
/// Single pass: substituted values are never rescanned, so a dose message
/// containing braces is emitted verbatim.
pub fn fill(text: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) if is_token_name(after[..end].trim()) => {
                let name = after[..end].trim();
                match vars.lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => tracing::debug!(token = name, "unknown template token dropped"),
                }
                rest = &after[end + 2..];
            }
            _ => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_token_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
