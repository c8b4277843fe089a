//! Command-line driver for block pool producer/consumer scenarios.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use pool_scenarios::{ScenarioConfig, ScenarioKind, ScenarioReport, ScenarioRunner};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Text rendering helpers used by the CLI.
mod render {
    use pool_scenarios::ScenarioReport;
    use std::fmt::Write;

    /// Format a human-readable summary of a finished run.
    pub fn report(report: &ScenarioReport) -> String {
        let mut out = String::new();
        writeln!(
            out,
            "Scenario: {} ({} items)",
            report.scenario.name(),
            report.scenario.total_items()
        )
        .expect("write scenario");
        writeln!(
            out,
            "Pool: capacity={} block_size={}",
            report.pool.capacity, report.pool.block_size
        )
        .expect("write pool");
        writeln!(
            out,
            "Items: produced={} consumed={}",
            report.stats.produced, report.stats.consumed
        )
        .expect("write items");
        writeln!(
            out,
            "Misses: free={} ready={} max_ready_depth={}",
            report.stats.free_misses, report.stats.ready_misses, report.stats.max_ready_depth
        )
        .expect("write misses");
        writeln!(
            out,
            "Final: free={} busy={} ready={}",
            report.final_pool.free, report.final_pool.busy, report.final_pool.ready
        )
        .expect("write final");
        writeln!(out, "Elapsed: {} ms", report.elapsed_ms).expect("write elapsed");
        out
    }
}

/// Run producer/consumer scenarios against a fixed-capacity block pool.
#[derive(Parser, Debug)]
#[command(author, version, about = "Exercise the block pool with producer/consumer scenarios", long_about = None)]
struct Cli {
    /// TOML file with `[pool]`, `[scenario]` and `[poll]` tables.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the number of blocks.
    #[arg(long)]
    capacity: Option<u32>,

    /// Override the size of each block in bytes.
    #[arg(long)]
    block_size: Option<usize>,

    /// Sleep between empty polls, in milliseconds.
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Give up after this many consecutive empty polls.
    #[arg(long, conflicts_with = "unbounded")]
    max_idle_polls: Option<u32>,

    /// Poll forever instead of giving up.
    #[arg(long)]
    unbounded: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Scenario to run; defaults to the one in the config file.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Produce items as fast as the pool allows.
    Flood {
        #[arg(long, default_value_t = 1_000)]
        items: u32,
    },
    /// Produce items in bursts with a pause in between.
    Burst {
        #[arg(long, default_value_t = 10)]
        bursts: u32,
        #[arg(long, default_value_t = 100)]
        burst_size: u32,
        #[arg(long, default_value_t = 0)]
        pause_ms: u64,
    },
    /// Slow consumer that forces the producer to wait for free blocks.
    Backpressure {
        #[arg(long, default_value_t = 100)]
        items: u32,
        #[arg(long, default_value_t = 1)]
        consumer_delay_ms: u64,
    },
}

impl From<Command> for ScenarioKind {
    fn from(command: Command) -> Self {
        match command {
            Command::Flood { items } => ScenarioKind::Flood { items },
            Command::Burst {
                bursts,
                burst_size,
                pause_ms,
            } => ScenarioKind::Burst {
                bursts,
                burst_size,
                pause_ms,
            },
            Command::Backpressure {
                items,
                consumer_delay_ms,
            } => ScenarioKind::Backpressure {
                items,
                consumer_delay_ms,
            },
        }
    }
}

impl Cli {
    /// Layer command-line overrides on top of the config file (or defaults).
    fn resolve_config(&self) -> Result<ScenarioConfig> {
        let mut config = match &self.config {
            Some(path) => ScenarioConfig::load(path)
                .with_context(|| format!("failed to load scenario config {path:?}"))?,
            None => ScenarioConfig::default(),
        };

        if let Some(capacity) = self.capacity {
            config.pool.capacity = capacity;
        }
        if let Some(block_size) = self.block_size {
            config.pool.block_size = block_size;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll.interval = Duration::from_millis(ms);
        }
        if self.unbounded {
            config.poll.max_idle_polls = None;
        } else if let Some(max) = self.max_idle_polls {
            config.poll.max_idle_polls = Some(max);
        }
        if let Some(command) = self.command {
            config.scenario = command.into();
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let report = run(config)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{json}");
    } else {
        print!("{}", render::report(&report));
    }

    report
        .verify()
        .map_err(|err| anyhow!("scenario {} failed: {err}", report.scenario.name()))?;
    info!(scenario = report.scenario.name(), "scenario checks passed");
    Ok(())
}

fn run(config: ScenarioConfig) -> Result<ScenarioReport> {
    let runner = ScenarioRunner::new(config).context("failed to build block pool")?;
    runner.run().map_err(|err| {
        warn!("scenario aborted: {err}");
        anyhow!(err).context("scenario did not complete")
    })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore error if already set (e.g., during tests).
    let _ = fmt().with_env_filter(env_filter).try_init();
}
