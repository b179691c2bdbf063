use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "thrive-cli", version, about = "Thrive program engine CLI")]
struct Cli {
    /// Database file (defaults to the data directory)
    #[arg(long, global = true, env = "THRIVE_DB")]
    db: Option<PathBuf>,

    /// Config file (defaults to the data directory)
    #[arg(long, global = true, env = "THRIVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily email job
    Job {
        #[command(subcommand)]
        action: commands::job::JobAction,
    },
    /// Show a user's content for today
    Today(commands::today::TodayArgs),
    /// Complete onboarding for a user
    Onboard(commands::onboard::OnboardArgs),
    /// User management
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Content management
    Content {
        #[command(subcommand)]
        action: commands::content::ContentAction,
    },
    /// Email template management
    Template {
        #[command(subcommand)]
        action: commands::template::TemplateAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("THRIVE_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| "thrive_core=info,thrive_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let ctx = Context::new(cli.db, cli.config);
    let result = match cli.command {
        Commands::Job { action } => commands::job::run(&ctx, action).await,
        Commands::Today(args) => commands::today::run(&ctx, args),
        Commands::Onboard(args) => commands::onboard::run(&ctx, args),
        Commands::User { action } => commands::user::run(&ctx, action),
        Commands::Content { action } => commands::content::run(&ctx, action),
        Commands::Template { action } => commands::template::run(&ctx, action),
        Commands::Config { action } => commands::config::run(&ctx, action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
