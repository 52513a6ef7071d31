//! chainlog host CLI
//!
//! Runs one block-controller invocation against file-backed adapters, or
//! verifies a directory of emitted blocks.
//!
//! Usage:
//!   cargo run -p demo -- run --config chainlog.toml --events events.jsonl
//!   cargo run -p demo -- run --config chainlog.toml --events events.jsonl --now 1700000000000
//!   cargo run -p demo -- verify --dir blocks
//!
//! Scheduling is left to the caller (cron, systemd timer, a shell loop);
//! each `run` is exactly one invocation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chainlog_block::{decompress, parse_block, verify_chain};
use chainlog_config::ChainlogSettings;
use chainlog_contracts::{
    config::BlockConfig,
    error::{ChainlogError, ChainlogResult},
    outcome::InvocationOutcome,
};
use chainlog_core::BlockController;
use chainlog_store::{DirectoryBlockSink, JsonFileStateStore, SpoolEventSource};

// ── CLI definition ────────────────────────────────────────────────────────────

/// chainlog: seal audit events into a SHA-512 hash-chained block ledger.
#[derive(Parser)]
#[command(
    name = "chainlog",
    about = "Append-only, hash-chained audit block ledger",
    long_about = "Seals audit events from a JSON Lines spool into gzipped, SHA-512\n\
                  chained blocks, and verifies the integrity of an emitted chain."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one block-controller invocation.
    Run {
        /// TOML configuration file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON Lines event spool. Drained events are removed from it.
        #[arg(long)]
        events: PathBuf,

        /// Invocation time in epoch milliseconds (defaults to the wall clock).
        #[arg(long)]
        now: Option<i64>,
    },
    /// Verify every `block_N` file in a directory as one chain from genesis.
    Verify {
        #[arg(long)]
        dir: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=info to see each sealed block, debug for skipped cycles.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { config, events, now } => run(config, events, now),
        Command::Verify { dir } => verify(dir),
    };

    if let Err(e) = result {
        eprintln!("chainlog error: {}", e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run(config: Option<PathBuf>, events: PathBuf, now: Option<i64>) -> ChainlogResult<()> {
    let settings = match config {
        Some(path) => ChainlogSettings::from_file(&path)?,
        None => ChainlogSettings::default(),
    };
    let block_config = settings.block_config()?;

    let source = SpoolEventSource::open(&events)?;
    let controller = BlockController::new(
        Box::new(JsonFileStateStore::new(&settings.storage.state_file)),
        Box::new(DirectoryBlockSink::new(&settings.storage.output_dir)),
    );

    match invoke(&controller, &source, &block_config, now)? {
        InvocationOutcome::Skipped => println!("skipped: no trigger fired"),
        InvocationOutcome::EmptyUpdate { last_execution_time } => {
            println!("no events; last execution set to {}", last_execution_time)
        }
        InvocationOutcome::Sealed {
            block_number,
            content_hash,
            event_count,
            filename,
        } => println!(
            "sealed {} ({} events) block #{} hash {}",
            settings.storage.output_dir.join(filename).display(),
            event_count,
            block_number,
            content_hash
        ),
    }
    Ok(())
}

/// One invocation against the spool. The spool is rewritten only when the
/// invocation succeeds; after a failure it still holds the drained events,
/// so the next run seals them again.
fn invoke(
    controller: &BlockController,
    source: &SpoolEventSource,
    config: &BlockConfig,
    now: Option<i64>,
) -> ChainlogResult<InvocationOutcome> {
    let outcome = match now {
        Some(now) => controller.on_trigger(source, config, now),
        None => controller.on_trigger_now(source, config),
    }?;
    source.persist_remaining()?;
    Ok(outcome)
}

fn verify(dir: PathBuf) -> ChainlogResult<()> {
    let listed = DirectoryBlockSink::new(&dir).list()?;

    let mut blocks = Vec::with_capacity(listed.len());
    for (number, path) in listed {
        let gz = std::fs::read(&path).map_err(|e| ChainlogError::ChainIntegrity {
            block_number: number,
            reason: format!("failed to read '{}': {}", path.display(), e),
        })?;
        let text = decompress(number, &gz)?;
        blocks.push(parse_block(number, &text)?);
    }

    verify_chain(&blocks)?;

    info!(dir = %dir.display(), blocks = blocks.len(), "chain verified");
    match blocks.last() {
        Some(head) => println!(
            "ok: {} blocks, head #{} {}",
            blocks.len(),
            head.block_number,
            head.content_hash
        ),
        None => println!("ok: no blocks"),
    }
    Ok(())
}
