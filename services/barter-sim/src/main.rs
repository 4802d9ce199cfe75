//! Barter Economy Simulator
//!
//! Runs a market of producer/trader agents in one process. Every agent gets
//! its own task, mailbox and trade log; a shared status board shows everyone's
//! holdings while the market runs.
//!
//! # Usage
//!
//! ```bash
//! # Run the default three-agent economy until Ctrl+C
//! barter-sim
//!
//! # Run for one minute with an extra agent
//! barter-sim --duration-secs 60 --agent miller=0,1,0,0,0,2,0,0,8
//!
//! # Start with environment overrides
//! BARTER__MARKET__TICK_MS=500 barter-sim
//! ```

mod config;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use barter_agents::{
    spawn_agent, AgentHandle, AgentReport, Directory, EconomicAgent, InMemoryDirectory, InProcBus,
    Transport,
};
use barter_ledger::StatusBoard;
use barter_types::{AgentId, AgentSpec, GoodCatalog};

use crate::config::{AgentEntry, SimConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Barter economy simulator
#[derive(Parser, Debug)]
#[command(name = "barter-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "BARTER_CONFIG")]
    config: Option<String>,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(short, long)]
    duration_secs: Option<u64>,

    /// Directory for the per-agent trade logs
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Do not write trade logs
    #[arg(long)]
    no_trade_log: bool,

    /// Extra agent as name=v1,v2,... (3 x number of goods values)
    #[arg(short, long = "agent", value_name = "NAME=ARGS")]
    agents: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "BARTER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "BARTER_LOG_FORMAT")]
    log_format: Option<String>,
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut sim_config = SimConfig::load(args.config.as_deref())?;
    apply_overrides(&mut sim_config, &args)?;

    init_logging(&sim_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        goods = ?sim_config.market.goods,
        agents = sim_config.agents.len(),
        "Starting barter economy simulator"
    );

    let catalog = GoodCatalog::new(sim_config.market.goods.iter()).context("invalid goods list")?;
    let specs = decode_agents(&catalog, &sim_config.agents)?;

    let bus = Arc::new(InProcBus::new());
    let directory: Arc<dyn Directory> = Arc::new(InMemoryDirectory::new());
    let board = StatusBoard::new(catalog.clone());
    let agent_config = sim_config.market.agent_config();

    let mut handles = Vec::with_capacity(specs.len());
    for (id, spec) in specs {
        let transport: Arc<dyn Transport> = bus.clone();
        let mut agent =
            EconomicAgent::new(id.clone(), catalog.clone(), spec, transport, agent_config.clone());

        if sim_config.trade_log.enabled {
            agent.open_trade_log(&sim_config.trade_log.dir)?;
        }
        agent.add_observer(Box::new(board.clone()));

        let mailbox = bus.register(id);
        handles.push(spawn_agent(agent, mailbox, directory.clone()));
    }

    let status_task = (sim_config.status.interval_ms > 0).then(|| {
        let board = board.clone();
        let period = Duration::from_millis(sim_config.status.interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                println!("{}", board.render());
            }
        })
    });

    wait_for_shutdown(args.duration_secs.map(Duration::from_secs)).await?;

    if let Some(task) = status_task {
        task.abort();
    }

    let reports = stop_agents(&bus, handles).await?;
    println!("{}", board.render());
    for report in &reports {
        println!("{}", render_report(report, &catalog));
    }

    tracing::info!("Simulator shutdown complete");
    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Apply CLI overrides on top of the loaded configuration
fn apply_overrides(sim_config: &mut SimConfig, args: &Args) -> anyhow::Result<()> {
    if let Some(dir) = &args.log_dir {
        sim_config.trade_log.dir = dir.clone();
    }
    if args.no_trade_log {
        sim_config.trade_log.enabled = false;
    }
    if let Some(level) = &args.log_level {
        sim_config.logging.level = level.clone();
    }
    if let Some(format) = &args.log_format {
        sim_config.logging.format = format.clone();
    }
    for entry in &args.agents {
        sim_config.agents.push(AgentEntry::parse(entry)?);
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }

    Ok(())
}

/// Decode every agent up front so a bad entry aborts before anything starts
fn decode_agents(
    catalog: &GoodCatalog,
    entries: &[AgentEntry],
) -> anyhow::Result<Vec<(AgentId, AgentSpec)>> {
    if entries.is_empty() {
        anyhow::bail!("no agents configured");
    }

    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.name.as_str()) {
            anyhow::bail!("agent name {:?} is used twice", entry.name);
        }
        let spec = AgentSpec::decode(catalog, &entry.args).with_context(|| {
            format!(
                "agent {}: write 3 x {} numbers \
                 (output coefficients, input coefficients, initial quantities)",
                entry.name,
                catalog.len()
            )
        })?;
        specs.push((AgentId::new(entry.name.clone()), spec));
    }
    Ok(specs)
}

/// Wait for the run duration or for Ctrl+C
async fn wait_for_shutdown(duration: Option<Duration>) -> anyhow::Result<()> {
    let elapsed = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = elapsed => {
            tracing::info!("Run duration elapsed, stopping agents...");
        }
        result = signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            tracing::info!("Received Ctrl+C, stopping agents...");
        }
    }
    Ok(())
}

/// Stop every agent and collect the final reports
async fn stop_agents(
    bus: &InProcBus,
    handles: Vec<AgentHandle>,
) -> anyhow::Result<Vec<AgentReport>> {
    // no new messages while the market winds down
    for handle in &handles {
        bus.deregister(handle.id());
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        let id = handle.id().clone();
        let report = handle
            .stop()
            .await
            .with_context(|| format!("agent {id} did not stop cleanly"))?;
        reports.push(report);
    }
    Ok(reports)
}

/// Human-readable summary of one agent
fn render_report(report: &AgentReport, catalog: &GoodCatalog) -> String {
    let outcomes = &report.outcomes;
    let seller = &report.seller;
    let mut out = format!("== {} ==\n", report.agent);
    out.push_str(&format!("holdings: {}\n", report.holdings.describe(catalog)));
    let prices = report.prices.describe(catalog);
    if !prices.is_empty() {
        out.push_str(&format!("prices:\n{prices}\n"));
    }
    out.push_str(&format!(
        "bought: {} of {} attempts \
         (no seller {}, already sold {}, undeliverable {}, timed out {})\n",
        outcomes.success,
        outcomes.total(),
        outcomes.no_seller,
        outcomes.race_lost,
        outcomes.undeliverable,
        outcomes.timeout,
    ));
    out.push_str(&format!(
        "sold: {} ({} failed), quotes: {} offered, {} refused",
        seller.sales_completed, seller.sales_failed, seller.quotes_offered, seller.quotes_refused,
    ));
    if report.open_sessions > 0 {
        out.push_str(&format!("\nstill negotiating: {}", report.open_sessions));
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
