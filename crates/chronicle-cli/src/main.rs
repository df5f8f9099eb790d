// Chronicle CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Reuse the engine crates directly; the CLI is just
// another rendering layer driving TimelineEngine.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chronicle")]
#[command(about = "Chronicle CLI - Follow contact timelines and manage tickets")]
#[command(version)]
pub struct Cli {
    /// API base URL
    #[arg(
        long,
        env = "CHRONICLE_API_URL",
        default_value = "http://localhost:9000"
    )]
    pub api_url: String,

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
    /// Print a contact's full interaction history, oldest first
    History {
        /// Contact ID
        contact: uuid::Uuid,

        /// Restrict the timeline to one ticket's events
        #[arg(long, short)]
        ticket: Option<uuid::Uuid>,
    },

    /// Follow a contact's timeline live
    Tail {
        /// Contact ID
        contact: uuid::Uuid,

        /// Restrict the timeline to one ticket's events
        #[arg(long, short)]
        ticket: Option<uuid::Uuid>,

        /// Stop after this many seconds (runs until interrupted if omitted)
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Manage tickets
    Tickets {
        #[command(subcommand)]
        command: commands::tickets::TicketsCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let api = chronicle_client::HttpTimelineApi::new(&cli.api_url);
    let output_format = output::OutputFormat::from_str(&cli.output);

    match cli.command {
        Commands::History { contact, ticket } => {
            commands::history::run(&api, output_format, contact, ticket).await
        }
        Commands::Tail {
            contact,
            ticket,
            duration,
        } => {
            commands::tail::run(&api, output_format, cli.quiet, contact, ticket, duration).await
        }
        Commands::Tickets { command } => {
            commands::tickets::run(command, &api, output_format, cli.quiet).await
        }
    }
}
