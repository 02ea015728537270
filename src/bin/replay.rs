use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use checkpoint_retention::config::AppConfig;
use checkpoint_retention::record::CheckpointRecord;
use checkpoint_retention::retention::{
    DiscardReason, RegisterOutcome, RetentionManager, ScoreOrder,
};
use checkpoint_retention::storage::{CheckpointStore, FsStore};

/// Replay a JSONL stream of checkpoint records through a retention manager
/// and print the final retained set.
#[derive(Parser)]
#[command(name = "replay", about = "Replay checkpoint registrations offline")]
struct Cli {
    /// JSONL file of checkpoint records, one object per line (default: stdin)
    input: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override retention budget (0 retains nothing)
    #[arg(long)]
    keep: Option<usize>,

    /// Override score attribute path, e.g. "eval/win_rate"
    #[arg(long)]
    score_attribute: Option<String>,

    /// Override score order: min or max
    #[arg(long)]
    score_order: Option<String>,

    /// Track ephemeral records too
    #[arg(long)]
    persist_ephemeral: bool,

    /// Write persisted checkpoints under the configured storage root
    /// instead of dry-running
    #[arg(long)]
    materialize: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // CLI overrides are applied after file validation; --keep 0 is allowed
    // here to preview what a zero budget would discard.
    if let Some(keep) = cli.keep {
        config.retention.num_to_keep = Some(keep);
    }
    if let Some(attr) = cli.score_attribute {
        config.retention.score_attribute = Some(attr);
    }
    if let Some(order) = cli.score_order.as_deref() {
        config.retention.score_order = match order {
            "min" => ScoreOrder::Min,
            "max" => ScoreOrder::Max,
            other => bail!("unknown score order '{}', expected min or max", other),
        };
    }
    if cli.persist_ephemeral {
        config.retention.persist_ephemeral = true;
    }

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    if cli.materialize {
        let store = FsStore::new(config.storage.clone());
        replay(RetentionManager::with_store(config.retention, store), reader)
    } else {
        replay(RetentionManager::new(config.retention), reader)
    }
}

fn replay<S: CheckpointStore>(
    mut manager: RetentionManager<S>,
    reader: Box<dyn BufRead>,
) -> Result<()> {
    let mut total = 0usize;
    let mut retained = 0usize;
    let mut displaced = 0usize;
    let mut ineligible = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        total += 1;

        let record: CheckpointRecord = serde_json::from_str(&line)
            .with_context(|| format!("invalid checkpoint record on line {}", lineno + 1))?;
        let report = manager
            .register(record)
            .with_context(|| format!("registering record from line {}", lineno + 1))?;

        for warning in &report.warnings {
            eprintln!("warning: {}", warning);
        }
        match report.outcome {
            RegisterOutcome::Retained => retained += 1,
            RegisterOutcome::Discarded(DiscardReason::Displaced) => displaced += 1,
            RegisterOutcome::Discarded(_) => ineligible += 1,
        }
    }

    println!(
        "Registered {} record(s): {} retained at some point, {} displaced, {} never eligible",
        total, retained, displaced, ineligible
    );
    println!(
        "Retained set ({} of {} kept, worst to best):",
        manager.retained().len(),
        total
    );
    for cp in manager.retained() {
        match cp.score() {
            Some(score) => println!("  #{:<6} score={}", cp.seq(), score),
            None => println!("  #{:<6} (no score)", cp.seq()),
        }
    }
    if let Some(best) = manager.best() {
        println!("Best: #{}", best.seq());
    }

    Ok(())
}
