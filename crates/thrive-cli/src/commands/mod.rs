pub mod config;
pub mod content;
pub mod job;
pub mod onboard;
pub mod template;
pub mod today;
pub mod user;

use chrono::{DateTime, Utc};
use std::error::Error;
use std::path::PathBuf;
use thrive_core::{Config, ProgramDb};

pub type CmdResult = Result<(), Box<dyn Error>>;

/// Where commands find their database and config.
pub struct Context {
    db_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl Context {
    pub fn new(db_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Self {
        Self {
            db_path,
            config_path,
        }
    }

    pub fn db(&self) -> Result<ProgramDb, Box<dyn Error>> {
        match &self.db_path {
            Some(path) => Ok(ProgramDb::open_path(path)?),
            None => Ok(ProgramDb::open()?),
        }
    }

    /// Load config; an explicit path that does not exist yet yields defaults.
    pub fn config(&self) -> Result<Config, Box<dyn Error>> {
        match &self.config_path {
            Some(path) if path.exists() => Ok(Config::load_from(path)?),
            Some(_) => Ok(Config::default()),
            None => Ok(Config::load()?),
        }
    }

    pub fn save_config(&self, config: &Config) -> CmdResult {
        match &self.config_path {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        Ok(())
    }
}

/// Parse an optional `--at` timestamp, defaulting to now.
pub fn parse_at(at: Option<&str>) -> Result<DateTime<Utc>, Box<dyn Error>> {
    match at {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .map_err(|e| format!("invalid --at '{raw}': {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
