//! Target management commands for CLI.

use clap::Subcommand;
use ironstreak_core::calendar::format_date;
use ironstreak_core::TargetDraft;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum TargetAction {
    /// Create and lock a new target
    Create {
        /// What you commit to
        text: String,
        /// First day, YYYY-MM-DD (default: today)
        #[arg(long)]
        start: Option<String>,
        /// Number of days, start day included
        #[arg(long, allow_negative_numbers = true)]
        days: i64,
    },
    /// List running targets
    List,
    /// Get target details
    Show {
        /// Target ID
        id: String,
    },
    /// List finished targets, newest first
    History,
}

pub fn run(user: &str, action: TargetAction) -> CliResult {
    let service = open_service()?;

    match action {
        TargetAction::Create { text, start, days } => {
            let start = start.unwrap_or_else(|| format_date(service.today()));
            let target = service.create_target(user, &TargetDraft::new(text, start, days))?;
            print_json(&target)?;
        }
        TargetAction::List => {
            print_json(&service.list_active_targets(user)?)?;
        }
        TargetAction::Show { id } => {
            print_json(&service.get_target(user, &id)?)?;
        }
        TargetAction::History => {
            print_json(&service.list_target_history(user)?)?;
        }
    }
    Ok(())
}
