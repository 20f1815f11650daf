mod cmd;
mod engine;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    client::ClientSubcommand, obligation::ObligationSubcommand, timeline::TimelineSubcommand,
};
use obligo_core::types::Cadence;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "obligo",
    about = "Compliance timeline engine: turn recurring obligations into dated, per-client timelines",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .obligo/)
    #[arg(long, global = true, env = "OBLIGO_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .obligo/ with a default config and an empty timeline store
    Init,

    /// Manage obligation definitions
    Obligation {
        #[command(subcommand)]
        subcommand: ObligationSubcommand,
    },

    /// Manage clients and their assignments
    Client {
        #[command(subcommand)]
        subcommand: ClientSubcommand,
    },

    /// Materialize the current period once, for one cadence or all four
    Run {
        /// daily | monthly | quarterly | yearly (or any other cadence)
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        cadence: Option<Cadence>,
        /// Run daily, monthly, quarterly and yearly in sequence
        #[arg(long)]
        all: bool,
    },

    /// Print the period identifier of an instant
    Period {
        #[arg(long)]
        cadence: Cadence,
        /// Civil date-time, e.g. 2024-07-03T10:00 (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Compute the due date of an obligation or sub-obligation
    Due {
        obligation: String,
        /// Sub-obligation id
        #[arg(long)]
        sub: Option<String>,
        /// Civil date-time to compute from (default: now)
        #[arg(long)]
        from: Option<String>,
        /// Due date within the current period instead of the next occurrence
        #[arg(long)]
        current: bool,
    },

    /// Inspect materialized timelines
    Timeline {
        #[command(subcommand)]
        subcommand: TimelineSubcommand,
    },

    /// Arm the four cadence triggers and run until Ctrl-C
    Serve,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve | Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Obligation { subcommand } => cmd::obligation::run(&root, subcommand, cli.json),
        Commands::Client { subcommand } => cmd::client::run(&root, subcommand, cli.json),
        Commands::Run { cadence, all } => cmd::run::run(&root, cadence, all, cli.json),
        Commands::Period { cadence, at } => cmd::period::run(&root, cadence, at.as_deref(), cli.json),
        Commands::Due {
            obligation,
            sub,
            from,
            current,
        } => cmd::due::run(
            &root,
            &obligation,
            sub.as_deref(),
            from.as_deref(),
            current,
            cli.json,
        ),
        Commands::Timeline { subcommand } => cmd::timeline::run(&root, subcommand, cli.json),
        Commands::Serve => cmd::serve::run(&root),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
