use clap::Subcommand;
use std::path::PathBuf;
use thrive_core::cornerstone::by_id;
use thrive_core::{ContentStore, CORNERSTONES};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ContentAction {
    /// Import a JSON content pack (`{doses: [...], do_items: [...]}`)
    Import { file: PathBuf },
    /// List the cornerstones in rotation order
    Themes,
    /// Show the doses and do-items stored for a cornerstone
    Theme { id: String },
}

pub fn run(ctx: &Context, action: ContentAction) -> CmdResult {
    match action {
        ContentAction::Import { file } => {
            let (doses, do_items) = ctx.db()?.import_pack_file(&file)?;
            println!("imported {doses} doses, {do_items} do-items");
        }
        ContentAction::Themes => print_json(&CORNERSTONES)?,
        ContentAction::Theme { id } => {
            let theme = by_id(&id).ok_or_else(|| format!("unknown cornerstone: {id}"))?;
            let db = ctx.db()?;
            print_json(&serde_json::json!({
                "theme": theme,
                "doses": db.doses_by_theme(theme.id)?,
                "do_items": db.do_items_by_theme(theme.id)?,
            }))?;
        }
    }
    Ok(())
}
