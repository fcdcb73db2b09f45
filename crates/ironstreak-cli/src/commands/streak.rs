use clap::Subcommand;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Current streak and status of a target
    Show {
        /// Target ID
        id: String,
    },
}

pub fn run(user: &str, action: StreakAction) -> CliResult {
    let service = open_service()?;

    match action {
        StreakAction::Show { id } => {
            print_json(&service.get_streak(user, &id)?)?;
        }
    }
    Ok(())
}
