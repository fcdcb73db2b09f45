pub mod checkin;
pub mod config;
pub mod streak;
pub mod sweep;
pub mod target;

use ironstreak_core::{Config, EvaluationMode, SystemClock, TargetDb, TargetService};
use serde::Serialize;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub type Service = TargetService<TargetDb, SystemClock>;

/// Build the service from the on-disk config and database.
///
/// In eager mode every active target is settled before the command runs.
pub fn open_service() -> CliResult<Service> {
    let config = Config::load()?;
    let service = TargetService::with_policy(TargetDb::open()?, config.clock()?, config.policy());
    if config.evaluation == EvaluationMode::Eager {
        service.sweep()?;
    }
    Ok(service)
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
