use clap::Subcommand;
use thrive_core::Config;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "email.target_hour")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(ctx: &Context, action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let config = ctx.config()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = ctx.config()?;
            config.set_value(&key, &value)?;
            ctx.save_config(&config)?;
            println!("ok");
        }
        ConfigAction::List => {
            let mut config = ctx.config()?;
            if config.mail.api_key.is_some() {
                config.mail.api_key = Some("********".into());
            }
            print_json(&config)?;
        }
        ConfigAction::Reset => {
            ctx.save_config(&Config::default())?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
