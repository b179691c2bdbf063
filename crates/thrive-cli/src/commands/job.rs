use async_trait::async_trait;
use clap::Subcommand;
use std::sync::Arc;
use thrive_core::email::{run_hourly, DailyEmailJob, JobSettings, MailTransport, OutgoingEmail};
use thrive_core::error::MailError;
use thrive_core::HttpMailTransport;
use tracing::info;

use super::{parse_at, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum JobAction {
    /// Run the daily email job once
    Run {
        /// Pretend the clock reads this RFC 3339 instant
        #[arg(long)]
        at: Option<String>,
        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the job at every top of the hour until interrupted
    Serve {
        #[arg(long)]
        dry_run: bool,
    },
    /// Send the day-1 welcome email to one user
    Welcome {
        user_id: String,
        #[arg(long)]
        dry_run: bool,
    },
}

/// Transport that only logs what it would send.
struct DryRunTransport;

#[async_trait]
impl MailTransport for DryRunTransport {
    async fn send(&self, message: &OutgoingEmail) -> Result<String, MailError> {
        let id = format!("dry-run-{}", uuid::Uuid::new_v4());
        info!(to = %message.to, subject = %message.subject, id = %id, "dry run, not sent");
        Ok(id)
    }
}

fn build_job(ctx: &Context, dry_run: bool) -> Result<DailyEmailJob, Box<dyn std::error::Error>> {
    let config = ctx.config()?;
    let settings = JobSettings::from_config(&config)?;
    let transport: Arc<dyn MailTransport> = if dry_run {
        Arc::new(DryRunTransport)
    } else {
        Arc::new(HttpMailTransport::from_config(
            &config.mail,
            &config.email.from_address,
        )?)
    };

    let db = Arc::new(ctx.db()?);
    Ok(
        DailyEmailJob::new(db.clone(), db.clone(), db.clone(), transport, settings)
            .with_delivery_log(db),
    )
}

pub async fn run(ctx: &Context, action: JobAction) -> CmdResult {
    match action {
        JobAction::Run { at, dry_run } => {
            let now = parse_at(at.as_deref())?;
            let report = build_job(ctx, dry_run)?.run_at(now).await;
            print_json(&report)?;
        }
        JobAction::Serve { dry_run } => {
            let job = Arc::new(build_job(ctx, dry_run)?);
            info!(
                target_hour = job.settings().target_hour,
                "serving hourly email job"
            );
            tokio::select! {
                _ = run_hourly(job) => {}
                _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
            }
        }
        JobAction::Welcome { user_id, dry_run } => {
            let record = build_job(ctx, dry_run)?
                .send_welcome(&user_id, chrono::Utc::now())
                .await?;
            print_json(&record)?;
        }
    }
    Ok(())
}
