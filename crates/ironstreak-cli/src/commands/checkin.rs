use clap::Subcommand;
use ironstreak_core::CoreError;
use serde_json::json;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum CheckinAction {
    /// Check in for today
    Today {
        /// Target ID
        id: String,
    },
}

pub fn run(user: &str, action: CheckinAction) -> CliResult {
    let service = open_service()?;

    match action {
        CheckinAction::Today { id } => match service.check_in_today(user, &id) {
            Ok(outcome) => print_json(&outcome)?,
            Err(
                e @ (CoreError::NotFound { .. }
                | CoreError::Forbidden { .. }
                | CoreError::TerminalState { .. }
                | CoreError::OutOfRange { .. }),
            ) => {
                tracing::info!(target_id = %id, error = %e, "check-in rejected");
                print_json(&json!({ "success": false, "message": e.to_string() }))?;
                std::process::exit(1);
            }
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}
