//! Alert relay binary.
//!
//! Serves the webhook endpoint, or manages the on-call schedule from the
//! command line.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relay::{server, CommandBot, Config, Relay, WorkerPool};

/// Alertmanager to Telegram relay with on-call phone escalation.
#[derive(Parser)]
#[command(name = "alert-relay")]
#[command(version, about)]
struct Cli {
    /// Schedule file (overrides RELAY_SCHEDULE_PATH)
    #[arg(long, global = true)]
    schedule_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// HTTP port (overrides RELAY_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Worker tasks, 0 for inline processing (overrides RELAY_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Manage the on-call schedule
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Run an operator command, e.g. `alert-relay command mute 30`
    Command {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Append entries: <start> <end> <number> [<start> <end> <number> ...]
    Add {
        #[arg(required = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the schedule as JSON
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::default();
    if let Some(path) = cli.schedule_path {
        config.schedule_path = path;
    }

    init_tracing(config.json_logs)?;

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        workers: None,
    }) {
        Commands::Serve { port, workers } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            serve(config).await
        }
        Commands::Schedule {
            action: ScheduleAction::Add { args },
        } => {
            let relay = Relay::from_config(&config)?;
            run_command(&relay, &format!("set_schedule {}", args.join(" "))).await
        }
        Commands::Schedule {
            action: ScheduleAction::List,
        } => {
            let relay = Relay::from_config(&config)?;
            let entries = relay
                .scheduler
                .list_schedule()
                .await
                .context("Failed to load schedule")?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(())
        }
        Commands::Command { text } => {
            let relay = Relay::from_config(&config)?;
            run_command(&relay, &text.join(" ")).await
        }
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("alert_relay=info".parse()?)
        .add_directive("relay=info".parse()?)
        .add_directive("oncall=info".parse()?)
        .add_directive("notify=info".parse()?);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

async fn run_command(relay: &Relay, text: &str) -> Result<()> {
    let reply = relay.commands.handle(text).await;
    println!("{}", reply.reply);
    if !reply.ok {
        bail!("command failed");
    }
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    info!(
        port = config.port,
        schedule = %config.schedule_path.display(),
        workers = config.workers,
        "Starting alert relay..."
    );

    let relay = Relay::from_config(&config)?;

    if config.telegram.bot_token.is_none() {
        warn!("No TELEGRAM_BOT_TOKEN configured - alert messages will be dropped");
    }

    if config.telegram.commands_enabled {
        let chats = config.telegram.command_chats();
        if config.telegram.bot_token.is_none() || chats.is_empty() {
            warn!("TELEGRAM_COMMANDS_ENABLED is set but the bot token or chat ids are missing - bot commands disabled");
        } else {
            let bot = CommandBot::new(relay.telegram.clone(), relay.commands.clone(), chats);
            tokio::spawn(bot.run());
        }
    }

    let (sink, workers) = WorkerPool::spawn(
        relay.dispatcher.clone(),
        config.workers,
        config.queue_capacity,
    );

    let app = server::build_router(relay.app_state(sink));
    server::run_server(app, config.port).await?;

    info!(workers = workers.len(), "Draining alert queue");
    workers.join().await;

    Ok(())
}
