//! Eager settlement of finished targets.
//!
//! One-shot by default. With `--watch` the sweep repeats on a tokio interval
//! until Ctrl-C, running each pass on the blocking pool since SQLite calls
//! block.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use super::{open_service, print_json, CliResult, Service};

#[derive(Args)]
pub struct SweepArgs {
    /// Keep sweeping until interrupted
    #[arg(long)]
    watch: bool,
    /// Seconds between sweeps in watch mode
    #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: u64,
}

pub fn run(args: SweepArgs) -> CliResult {
    let service = open_service()?;

    if !args.watch {
        return print_json(&service.sweep()?);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch(
        Arc::new(service),
        Duration::from_secs(args.interval_secs),
    ))
}

async fn watch(service: Arc<Service>, every: Duration) -> CliResult {
    let mut ticker = tokio::time::interval(every);
    tracing::info!(interval_secs = every.as_secs(), "sweep watch started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let svc = Arc::clone(&service);
                let report = tokio::task::spawn_blocking(move || svc.sweep()).await??;
                print_json(&report)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("sweep watch stopped");
                break;
            }
        }
    }
    Ok(())
}
