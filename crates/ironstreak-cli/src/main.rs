use clap::{Parser, Subcommand};
use ironstreak_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ironstreak", version, about = "IronStreak CLI")]
struct Cli {
    /// Acting user; every target belongs to exactly one user
    #[arg(long, global = true, env = "IRONSTREAK_USER", default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Target management
    Target {
        #[command(subcommand)]
        action: commands::target::TargetAction,
    },
    /// Daily check-ins
    Checkin {
        #[command(subcommand)]
        action: commands::checkin::CheckinAction,
    },
    /// Streak figures
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// Settle finished targets for every user
    Sweep(commands::sweep::SweepArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so stdout stays pure JSON.
///
/// `RUST_LOG` wins over the configured filter.
fn init_tracing() {
    let configured = Config::load()
        .map(|config| config.logging.filter)
        .unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&configured))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Target { action } => commands::target::run(&cli.user, action),
        Commands::Checkin { action } => commands::checkin::run(&cli.user, action),
        Commands::Streak { action } => commands::streak::run(&cli.user, action),
        Commands::Sweep(args) => commands::sweep::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
