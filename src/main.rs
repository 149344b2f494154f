use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homebot::alerts::NotificationKind;
use homebot::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "homebot",
    version,
    about = "Personal Telegram bot that tracks alerts and notifies when they fire",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: alert tracking, notifications and the HTTP server
    Run {
        /// TOML config file; environment variables are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Fetch one alert and print the rendered notification
    Fetch {
        /// Alert URL
        url: String,

        /// Notification kind to render (new, reminder, resolved, inactive)
        #[arg(short, long, default_value = "new")]
        kind: NotificationKind,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = Config::load(config.as_deref())?;
            let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
            setup_tracing(log_format, &config.logging.level, cli.verbose)?;

            tracing::info!(config = ?config.http, "homebot starting");
            commands::run(config).await?;
        }

        Commands::Fetch { url, kind } => {
            setup_tracing(cli.log_format.as_deref().unwrap_or("text"), "info", cli.verbose)?;

            tracing::info!(url = %url, kind = %kind, "Starting fetch command");
            commands::fetch(url, kind).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("homebot=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("homebot={level},warn")))
    };

    match format {
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
