pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use marketdesk_core::config::{AppConfig, LoadOptions, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "marketdesk",
    about = "Marketdesk operator CLI",
    long_about = "Operate Marketdesk configuration inspection, readiness checks, and offline quotation totals verification.",
    after_help = "Examples:\n  marketdesk doctor --json\n  marketdesk config\n  marketdesk totals quotation.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, credential readiness, and backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Recompute quotation and additional-cost totals from a JSON file and verify them"
    )]
    Totals {
        #[arg(help = "Path to the quotation JSON file")]
        file: PathBuf,
    },
}

fn init_logging(logging: &LoggingConfig) {
    use marketdesk_core::config::LogFormat::{Compact, Json, Pretty};
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config.logging);
    }

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Totals { file } => commands::totals::run(&file),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
