mod config;
pub mod migrations;
pub mod store;
pub mod target_db;

pub use config::{ClockConfig, Config, EvaluationMode, LoggingConfig, TargetsConfig};
pub use store::TargetStore;
pub use target_db::TargetDb;

use std::path::PathBuf;

/// Returns the data directory.
///
/// `IRONSTREAK_HOME` wins when set. Otherwise `~/.config/ironstreak[-dev]/`,
/// with the `-dev` suffix when `IRONSTREAK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("IRONSTREAK_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("IRONSTREAK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("ironstreak-dev")
            } else {
                base_dir.join("ironstreak")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
