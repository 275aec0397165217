// ctfnotify CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Agenda commands talk to the same SQLite file the notifier uses.

mod agenda;
mod commands;
mod config;
mod output;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ctfnotify_core::telemetry::{init_telemetry, TelemetryConfig};
use ctfnotify_core::OwnerId;
use ctfnotify_ctftime::CtftimeClient;
use ctfnotify_discord::{DiscordClient, DiscordConfig};
use ctfnotify_storage::SqliteEventStore;

use crate::agenda::{AgendaService, CustomEvent};

#[derive(Parser)]
#[command(name = "ctfnotify")]
#[command(about = "ctfnotify - CTF event reminders delivered as Discord direct messages")]
#[command(version)]
pub struct Cli {
    /// Owner (Discord user id) whose agenda is managed
    #[arg(long, global = true, env = "CTFNOTIFY_OWNER_ID")]
    pub owner: Option<OwnerId>,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the notifier (scheduler and retention sweeper) until ctrl-c
    Run,

    #[command(flatten)]
    Agenda(AgendaCommand),
}

/// Commands operating on one owner's agenda
#[derive(Subcommand)]
pub enum AgendaCommand {
    /// Add an event from its CTFtime URL
    Add {
        /// e.g. https://ctftime.org/event/1234
        url: String,
    },

    /// Add an event that is not listed on CTFtime
    Custom {
        /// Event name
        name: String,

        /// Start time, `YYYY-MM-DD HH:MM` in UTC
        #[arg(long)]
        start: String,

        /// End time, `YYYY-MM-DD HH:MM` in UTC
        #[arg(long)]
        end: String,

        #[arg(long)]
        description: Option<String>,

        /// Official website
        #[arg(long)]
        url: Option<String>,
    },

    /// List the events in the agenda
    List,

    /// Show everything stored about one event
    Details {
        /// Exact (case-sensitive) event name
        name: String,
    },

    /// Remove one event
    Remove {
        /// Exact (case-sensitive) event name
        name: String,
    },

    /// Remove every event from the agenda
    Clear {
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },

    /// Copy an event into another user's agenda
    Share {
        /// Exact (case-sensitive) event name
        name: String,

        /// Discord user id of the recipient
        recipient: OwnerId,
    },
}

async fn agenda_service() -> Result<AgendaService> {
    let database_url = config::database_url();
    let store = SqliteEventStore::connect(&database_url)
        .await
        .with_context(|| format!("failed to open database {}", database_url))?;
    let catalog = CtftimeClient::from_env().context("failed to create CTFtime client")?;

    let mut service = AgendaService::new(Arc::new(store), Arc::new(catalog));

    // Shared events are announced by DM when a bot token is available
    if let Ok(discord_config) = DiscordConfig::from_env() {
        let discord = Arc::new(
            DiscordClient::new(discord_config).context("failed to create Discord client")?,
        );
        service = service.with_notifier(discord.clone(), discord);
    }

    Ok(service)
}

async fn run_agenda_command(
    command: AgendaCommand,
    output: output::OutputFormat,
    quiet: bool,
    owner: Option<OwnerId>,
) -> Result<()> {
    let owner = owner.context("--owner (or CTFNOTIFY_OWNER_ID) is required for agenda commands")?;
    let service = agenda_service().await?;

    match command {
        AgendaCommand::Add { url } => {
            commands::events::add(&service, output, quiet, owner, &url).await
        }
        AgendaCommand::Custom {
            name,
            start,
            end,
            description,
            url,
        } => {
            let event = CustomEvent {
                name,
                start,
                end,
                description,
                url,
            };
            commands::events::custom(&service, output, quiet, owner, event).await
        }
        AgendaCommand::List => commands::events::list(&service, output, owner).await,
        AgendaCommand::Details { name } => {
            commands::events::details(&service, output, owner, &name).await
        }
        AgendaCommand::Remove { name } => {
            commands::events::remove(&service, output, quiet, owner, &name).await
        }
        AgendaCommand::Clear { yes } => {
            commands::events::clear(&service, output, quiet, owner, yes).await
        }
        AgendaCommand::Share { name, recipient } => {
            commands::events::share(&service, output, owner, &name, recipient).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env().with_service_name("ctfnotify");
    if !matches!(cli.command, Commands::Run) {
        telemetry = telemetry.with_default_filter("warn");
    }
    let _telemetry_guard = init_telemetry(telemetry);

    let output = output::OutputFormat::parse(&cli.output);
    match cli.command {
        Commands::Run => commands::run::run().await,
        Commands::Agenda(command) => run_agenda_command(command, output, cli.quiet, cli.owner).await,
    }
}
