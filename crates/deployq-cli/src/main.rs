mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "deployq",
    about = "Single-slot deployment queue on a Trello board",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest deployq.yaml upward from cwd)
    #[arg(long, global = true, env = "DEPLOYQ_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the queue monitor in the foreground
    Watch {
        /// Run against an in-memory board seeded with sample cards
        #[arg(long)]
        demo: bool,
    },

    /// Run the monitor plus the HTTP command surface
    Serve {
        #[arg(long, default_value_t = 3142)]
        port: u16,
    },

    /// Add a user to the back of the queue
    Enqueue { user: String },

    /// Record that a user's deploy has started
    Start { user: String },

    /// Record that a user's deploy succeeded
    Success { user: String },

    /// Record that a user's deploy failed; they go back to the head of the queue
    Fail { user: String },

    /// Show who is deploying and who is waiting
    State,

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Watch { .. } | Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config_path = root::resolve_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Watch { demo } => cmd::watch::run(&config_path, demo),
        Commands::Serve { port } => cmd::serve::run(&config_path, port),
        Commands::Enqueue { user } => cmd::deploy::enqueue(&config_path, &user, cli.json),
        Commands::Start { user } => cmd::deploy::start(&config_path, &user, cli.json),
        Commands::Success { user } => cmd::deploy::success(&config_path, &user, cli.json),
        Commands::Fail { user } => cmd::deploy::fail(&config_path, &user, cli.json),
        Commands::State => cmd::state::run(&config_path, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
