pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "promptbot",
    about = "Promptbot operator CLI",
    long_about = "Check promptbot readiness, inspect effective configuration, and sign test requests.",
    after_help = "Examples:\n  promptbot doctor --json\n  promptbot config\n  promptbot sign --body '{\"type\":\"url_verification\",\"challenge\":\"abc\"}'"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config, Slack settings, and the spreadsheet service-account key")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print Slack signature headers for a request body")]
    Sign {
        #[arg(long, help = "Exact request body to sign")]
        body: String,
        #[arg(long, help = "Unix timestamp to sign with (defaults to now)")]
        timestamp: Option<i64>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Config => commands::config::run(),
        Command::Sign { body, timestamp } => commands::sign::run(&body, timestamp),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
