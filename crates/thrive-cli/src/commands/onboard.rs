use clap::Args;
use std::path::{Path, PathBuf};
use thrive_core::complete_onboarding;
use thrive_core::labels::{parse_answers, QuestionDefinition};

use super::{parse_at, print_json, CmdResult, Context};

#[derive(Args)]
pub struct OnboardArgs {
    user_id: String,
    /// JSON array of `{questionIndex | questionId, value}` answers
    #[arg(long)]
    answers: PathBuf,
    /// JSON array of `{id, text, kind?}` question definitions
    #[arg(long)]
    questions: PathBuf,
    /// Completion instant (RFC 3339), defaults to now
    #[arg(long)]
    at: Option<String>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| format!("bad JSON in {}: {e}", path.display()).into())
}

pub fn run(ctx: &Context, args: OnboardArgs) -> CmdResult {
    let answers = parse_answers(&read_json::<serde_json::Value>(&args.answers)?);
    let questions: Vec<QuestionDefinition> = read_json(&args.questions)?;
    let now = parse_at(args.at.as_deref())?;

    let db = ctx.db()?;
    let outcome = complete_onboarding(&db, &args.user_id, &answers, &questions, now)?;
    print_json(&outcome)
}
