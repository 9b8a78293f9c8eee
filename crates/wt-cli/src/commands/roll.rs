//! One-shot roll command.

use std::sync::Arc;

use clap::Args;
use colored::Colorize;

use wt_table::{RollLog, RollRequest};

/// Arguments for `wt roll`.
#[derive(Args)]
pub struct RollOpts {
    /// Dice notation, e.g. "2d20kh1 + FOR"
    pub notation: String,

    /// Character stats as NAME=RAW or NAME=RAW:mod (ability-modifier transform)
    #[arg(short, long)]
    pub stat: Vec<String>,

    /// Withhold the result from your own view
    #[arg(long)]
    pub blind: bool,

    /// Mark the roll private in the log
    #[arg(long)]
    pub private: bool,

    /// RNG seed for deterministic rolls
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    /// Skip the 3D oracle and resolve instantly
    #[arg(long)]
    pub no_animation: bool,

    /// Roller display name
    #[arg(short, long, default_value = "Player")]
    pub user: String,

    /// Room whose log receives the record
    #[arg(short, long, default_value = "table")]
    pub room: String,

    /// Print the persisted record as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(opts: RollOpts) -> Result<(), String> {
    let stats = super::parse_stats(&opts.stat)?;
    let log = Arc::new(RollLog::new());
    let mut roller = super::build_roller(opts.seed, !opts.no_animation, log.clone());

    let mut request = RollRequest::new(&opts.notation)
        .with_user(&opts.user)
        .with_room(&opts.room);
    if opts.blind {
        request = request.blind();
    }
    if opts.private {
        request = request.private();
    }

    let resolution = roller
        .roll(request, &stats)
        .await
        .map_err(|e| e.to_string())?;

    match resolution.visible_breakdown() {
        Some(breakdown) => {
            println!("  {breakdown}");
            println!(
                "  {} {}",
                "Total:".bold(),
                resolution.outcome.total.to_string().bold()
            );
        }
        None => {
            println!(
                "  {} result hidden, recorded to room '{}'",
                "Blind roll:".bold(),
                opts.room
            );
        }
    }

    if opts.json {
        let json =
            serde_json::to_string_pretty(&resolution.record).map_err(|e| e.to_string())?;
        println!("{json}");
    }
    Ok(())
}
