use clap::Args;
use thrive_core::{today_for_user, UserDirectory};

use super::{parse_at, print_json, CmdResult, Context};

#[derive(Args)]
pub struct TodayArgs {
    user_id: String,
    /// Pretend the clock reads this RFC 3339 instant
    #[arg(long)]
    at: Option<String>,
}

pub fn run(ctx: &Context, args: TodayArgs) -> CmdResult {
    let now = parse_at(args.at.as_deref())?;
    let db = ctx.db()?;
    let user = db.get_user(&args.user_id)?;
    let content = today_for_user(&user, &db, now)?;
    print_json(&content)
}
