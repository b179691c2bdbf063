mod config;
pub mod db;
pub mod migrations;

pub use config::{Config, EmailConfig, MailConfig, ProgramConfig, UnsubscribeConfig};
pub use db::ProgramDb;

use std::path::PathBuf;

use crate::error::CoreError;

/// Returns `~/.config/thrive[-dev]/` based on THRIVE_ENV.
///
/// Set THRIVE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("THRIVE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("thrive-dev")
    } else {
        base_dir.join("thrive")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
