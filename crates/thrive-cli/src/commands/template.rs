use clap::Subcommand;
use std::path::PathBuf;
use thrive_core::email::{fill, TemplateVars};
use thrive_core::{EmailTemplate, TemplateStore};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Create or replace an email template
    Set {
        id: String,
        #[arg(long)]
        subject: String,
        /// File holding the HTML body
        #[arg(long)]
        html: PathBuf,
        /// File holding the plain-text body
        #[arg(long)]
        text: PathBuf,
        /// Store the template as inactive
        #[arg(long)]
        inactive: bool,
    },
    /// Show a stored template
    Show { id: String },
    /// Render a template with sample values
    Preview {
        id: String,
        #[arg(long, default_value = "Friend")]
        name: String,
        #[arg(long, default_value_t = 1)]
        day: i64,
    },
}

pub fn run(ctx: &Context, action: TemplateAction) -> CmdResult {
    let db = ctx.db()?;
    match action {
        TemplateAction::Set {
            id,
            subject,
            html,
            text,
            inactive,
        } => {
            let template = EmailTemplate {
                id,
                subject,
                html_body: std::fs::read_to_string(&html)?,
                text_body: std::fs::read_to_string(&text)?,
                is_active: !inactive,
            };
            db.upsert_template(&template)?;
            println!("template saved: {}", template.id);
        }
        TemplateAction::Show { id } => {
            let template = db
                .email_template(&id)?
                .ok_or_else(|| format!("no template: {id}"))?;
            print_json(&template)?;
        }
        TemplateAction::Preview { id, name, day } => {
            let template = db
                .email_template(&id)?
                .ok_or_else(|| format!("no template: {id}"))?;
            let config = ctx.config()?;
            let vars = TemplateVars {
                user_name: name,
                program_day: day,
                dose_message: "(dose message)".into(),
                admin_message: config.email.admin_message.clone(),
                app_url: config.email.app_url.clone(),
                unsubscribe_url: format!("{}/unsubscribe", config.email.app_url),
            };
            println!("Subject: {}\n", fill(&template.subject, &vars));
            println!("{}", fill(&template.text_body, &vars));
        }
    }
    Ok(())
}
