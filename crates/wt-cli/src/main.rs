//! CLI frontend for the Würfelturm dice engine.

mod commands;

use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wt",
    about = "Würfelturm — virtual tabletop dice engine",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll a dice notation once and print the breakdown
    Roll(commands::roll::RollOpts),

    /// Start an interactive table session
    Table {
        /// RNG seed for deterministic rolls
        #[arg(short = 'S', long)]
        seed: Option<u64>,

        /// Roller display name
        #[arg(short, long, default_value = "Player")]
        user: String,

        /// Room whose log receives the records
        #[arg(short, long, default_value = "table")]
        room: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Roll(opts) => commands::roll::run(opts).await,
        Commands::Table { seed, user, room } => commands::table::run(seed, &user, &room).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
