use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onduty::config::{Config, LoggingConfig};
use onduty::error::{Error, OndutyErrorTrait, Result};
use onduty::notifications::Urgency;

mod commands;

#[derive(Parser)]
#[command(
    name = "onduty",
    version,
    about = "Fair on-call rotation generator with calendar reconciliation and reminders",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "onduty.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (pretty, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the rotation and write it to the calendar
    Generate {
        /// First day to generate (YYYY-MM-DD, default today)
        #[arg(short, long, value_parser = onduty::utils::parse_date)]
        start_date: Option<chrono::NaiveDate>,

        /// Number of days to generate (default from config)
        #[arg(short, long)]
        days: Option<u32>,

        /// Seed the rotation with the code on duty the day before
        #[arg(long)]
        last_on: Option<String>,

        /// Don't write any calendar entries
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        dry_run: bool,

        /// Start monthly restrictions from zero (for recasting the schedule)
        #[arg(long)]
        unrestrict: bool,

        /// Seed for the random starting point when no anchor exists
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write the monitoring status file for today's assignee
    Monitor {
        /// Output file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Send a reminder to whoever is on duty today or tomorrow
    Notify {
        /// today or tomorrow
        #[arg(value_parser = parse_when)]
        when: Urgency,
    },
}

fn parse_when(value: &str) -> std::result::Result<Urgency, String> {
    match value.parse::<Urgency>()? {
        Urgency::Emergency => Err("expected 'today' or 'tomorrow'".to_string()),
        urgency => Ok(urgency),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = setup_tracing(&config.logging, cli.log_format.as_deref(), cli.verbose) {
        eprintln!("Error: {e}");
        return ExitCode::from(2);
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(
                category = %e.category(),
                recoverable = e.is_recoverable(),
                error = %e,
                "onduty failed"
            );
            eprintln!("Error: {e}");
            ExitCode::from(e.category().exit_code() as u8)
        }
    }
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Generate {
            start_date,
            days,
            last_on,
            dry_run,
            unrestrict,
            seed,
        } => {
            tracing::info!(
                start_date = ?start_date,
                days = ?days,
                last_on = ?last_on,
                dry_run = %dry_run,
                unrestrict = %unrestrict,
                "Starting generate command"
            );
            commands::generate(
                config,
                commands::GenerateParams {
                    start_date,
                    days,
                    last_on,
                    dry_run,
                    unrestrict,
                    seed,
                },
            )
            .await
        }

        Commands::Monitor { file } => {
            tracing::info!(file = %file.display(), "Starting monitor command");
            commands::monitor(config, &file).await
        }

        Commands::Notify { when } => {
            tracing::info!(when = %when, "Starting notify command");
            commands::notify(config, when).await
        }
    }
}

fn setup_tracing(logging: &LoggingConfig, format: Option<&str>, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("onduty=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("onduty={},warn", logging.level)))
            .map_err(|e| Error::config(format!("invalid log level '{}': {e}", logging.level)))?
    };

    match format.unwrap_or(&logging.format) {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
