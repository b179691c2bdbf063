use clap::Subcommand;
use thrive_core::email::{parse_timezone, verify_unsubscribe_token};
use thrive_core::{User, UserDirectory};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum UserAction {
    /// Add or replace a user
    Add {
        id: String,
        email: String,
        /// Display name used in greetings
        #[arg(long)]
        name: Option<String>,
        /// IANA timezone (e.g. "Europe/Berlin")
        #[arg(long)]
        timezone: Option<String>,
        /// Opt the user in to the daily email
        #[arg(long)]
        opt_in: bool,
    },
    /// List all users
    List,
    /// Show one user
    Show { id: String },
    /// Opt a user out via a signed unsubscribe token
    Unsubscribe {
        id: String,
        #[arg(long)]
        token: String,
    },
}

pub fn run(ctx: &Context, action: UserAction) -> CmdResult {
    let db = ctx.db()?;
    match action {
        UserAction::Add {
            id,
            email,
            name,
            timezone,
            opt_in,
        } => {
            if let Some(tz) = &timezone {
                parse_timezone(tz)?;
            }
            if !email.contains('@') {
                return Err(format!("invalid email address: {email}").into());
            }

            let mut user = match db.get_user(&id) {
                Ok(existing) => existing,
                Err(_) => User::new(id.as_str(), email.as_str()),
            };
            user.email = email;
            user.display_name = name.unwrap_or_default();
            user.timezone = timezone;
            user.email_opt_in = opt_in;
            db.upsert_user(&user)?;
            println!("user saved: {}", user.id);
        }
        UserAction::List => print_json(&db.users()?)?,
        UserAction::Show { id } => print_json(&db.get_user(&id)?)?,
        UserAction::Unsubscribe { id, token } => {
            let config = ctx.config()?;
            if !verify_unsubscribe_token(&id, &token, &config.unsubscribe.secret) {
                return Err("unsubscribe token does not match".into());
            }
            db.set_email_opt_in(&id, false)?;
            println!("unsubscribed: {id}");
        }
    }
    Ok(())
}
