pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tireslingers_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "tireslingers",
    about = "Tire Slingers stock recommendation CLI",
    long_about = "Compute and inspect per-organization tire stocking recommendations.",
    after_help = "Examples:\n  tireslingers migrate\n  tireslingers recommend --org yard-northside\n  tireslingers recommend-all --stale-only"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo yard dataset")]
    Seed,
    #[command(about = "Recompute and store recommendations for one organization")]
    Recommend {
        #[arg(long = "org", help = "Organization id")]
        organization: String,
    },
    #[command(about = "Recompute recommendations for every organization in parallel")]
    RecommendAll {
        #[arg(long, help = "Only organizations whose inventory changed since the last run")]
        stale_only: bool,
    },
    #[command(about = "List the stored recommendations for one organization")]
    Recommendations {
        #[arg(long = "org", help = "Organization id")]
        organization: String,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Config errors are reported by the command itself.
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        if let Err(error) = logging::init(&config.logging) {
            eprintln!("{error}");
        }
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Recommend { organization } => commands::recommend::run(&organization),
        Command::RecommendAll { stale_only } => commands::recommend_all::run(stale_only),
        Command::Recommendations { organization } => {
            commands::recommendations::run(&organization)
        }
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
