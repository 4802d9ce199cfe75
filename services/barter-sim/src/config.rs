//! Simulator Configuration
//!
//! Configuration management for the barter economy simulator.
//! Supports environment variables, config files, and CLI arguments.

use std::path::{Path, PathBuf};
use std::time::Duration;

use barter_agents::{AgentConfig, SessionPolicy};
use barter_ledger::DEFAULT_MAX_CYCLES;
use barter_types::STANDARD_GOODS;
use serde::{Deserialize, Serialize};

/// Simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Goods and trading rhythm shared by every agent
    #[serde(default)]
    pub market: MarketConfig,

    /// Agents to start
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentEntry>,

    /// Per-agent trade log files
    #[serde(default)]
    pub trade_log: TradeLogConfig,

    /// Status table printed while running
    #[serde(default)]
    pub status: StatusConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Market settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Good names, in the order used by agent arguments
    #[serde(default = "default_goods")]
    pub goods: Vec<String>,

    /// Trade cycle period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Give up on a buy attempt after this many milliseconds (unset waits forever)
    #[serde(default)]
    pub session_timeout_ms: Option<u64>,

    /// Whether buy attempts may overlap
    #[serde(default)]
    pub session_policy: SessionPolicy,

    /// Cycle bound of a single production run
    #[serde(default = "default_max_production_cycles")]
    pub max_production_cycles: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            goods: default_goods(),
            tick_ms: default_tick_ms(),
            session_timeout_ms: None,
            session_policy: SessionPolicy::default(),
            max_production_cycles: default_max_production_cycles(),
        }
    }
}

impl MarketConfig {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            tick: Duration::from_millis(self.tick_ms),
            session_timeout: self.session_timeout_ms.map(Duration::from_millis),
            session_policy: self.session_policy,
            max_production_cycles: self.max_production_cycles,
        }
    }
}

/// One agent: its name and flat `3 * N` argument list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEntry {
    pub name: String,
    pub args: Vec<i64>,
}

impl AgentEntry {
    /// Parse `name=v1,v2,...`
    pub fn parse(entry: &str) -> anyhow::Result<Self> {
        let (name, values) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected name=v1,v2,... but got {entry:?}"))?;
        let args = values
            .split(',')
            .map(|value| value.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| anyhow::anyhow!("agent {name}: {err}"))?;
        Ok(Self {
            name: name.trim().to_string(),
            args,
        })
    }
}

/// Trade log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory receiving `agent_<name>_log.txt` files
    #[serde(default = "default_trade_log_dir")]
    pub dir: PathBuf,
}

impl Default for TradeLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_trade_log_dir(),
        }
    }
}

/// Status table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Print period in milliseconds (0 = never)
    #[serde(default = "default_status_interval_ms")]
    pub interval_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_status_interval_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_goods() -> Vec<String> {
    STANDARD_GOODS.iter().map(|name| name.to_string()).collect()
}

fn default_tick_ms() -> u64 {
    2_000
}

fn default_max_production_cycles() -> u32 {
    DEFAULT_MAX_CYCLES
}

/// Baker, farmer and landlord over BREAD, GRAIN, LAND
fn default_agents() -> Vec<AgentEntry> {
    vec![
        AgentEntry {
            name: "baker".to_string(),
            // 1 BREAD = 2 GRAIN
            args: vec![1, 0, 0, 0, 2, 0, 2, 6, 1],
        },
        AgentEntry {
            name: "farmer".to_string(),
            // 3 GRAIN = 1 LAND
            args: vec![0, 3, 0, 0, 0, 1, 1, 0, 4],
        },
        AgentEntry {
            name: "landlord".to_string(),
            // 1 LAND = 2 BREAD
            args: vec![0, 0, 1, 2, 0, 0, 3, 1, 2],
        },
    ]
}

fn default_trade_log_dir() -> PathBuf {
    PathBuf::from("trade-logs")
}

fn default_status_interval_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl SimConfig {
    /// Load configuration from environment and optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        Self::load_from(Path::new("config"), config_path)
    }

    /// Layer `<dir>/default`, `<dir>/local`, the explicit file and the
    /// environment; later sources win
    fn load_from(dir: &Path, config_path: Option<&str>) -> anyhow::Result<Self> {
        let layer = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(&layer("default")).required(false))
            .add_source(config::File::with_name(&layer("local")).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // BARTER__MARKET__TICK_MS=500 and friends
        builder = builder.add_source(
            config::Environment::with_prefix("BARTER")
                .separator("__")
                .try_parsing(true),
        );

        let sim_config: SimConfig = builder.build()?.try_deserialize()?;
        Ok(sim_config)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            agents: default_agents(),
            trade_log: TradeLogConfig::default(),
            status: StatusConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barter_types::{AgentSpec, GoodCatalog};

    #[test]
    fn test_default_agents_decode() {
        let config = SimConfig::default();
        let catalog = GoodCatalog::new(config.market.goods.iter()).unwrap();
        for agent in &config.agents {
            assert!(AgentSpec::decode(&catalog, &agent.args).is_ok(), "{}", agent.name);
        }
    }

    #[test]
    fn test_agent_config_conversion() {
        let market = MarketConfig {
            session_timeout_ms: Some(1_500),
            ..MarketConfig::default()
        };
        let agent = market.agent_config();
        assert_eq!(agent.tick, Duration::from_millis(2_000));
        assert_eq!(agent.session_timeout, Some(Duration::from_millis(1_500)));
        assert_eq!(agent.max_production_cycles, DEFAULT_MAX_CYCLES);
    }

    #[test]
    fn test_parse_agent_entry() {
        let entry = AgentEntry::parse("miller=0,1, 2,0,5,0").unwrap();
        assert_eq!(entry.name, "miller");
        assert_eq!(entry.args, vec![0, 1, 2, 0, 5, 0]);

        assert!(AgentEntry::parse("miller").is_err());
        assert!(AgentEntry::parse("miller=1,x").is_err());
    }

    #[test]
    fn test_explicit_file_wins_over_directory_layers() {
        let dir = std::env::temp_dir().join(format!("barter-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            "[market]\ntick_ms = 2000\nmax_production_cycles = 7\n",
        )
        .unwrap();
        std::fs::write(dir.join("local.toml"), "[market]\ntick_ms = 1000\n").unwrap();
        let explicit = dir.join("override.toml");
        std::fs::write(&explicit, "[market]\ntick_ms = 500\n").unwrap();

        let layered = SimConfig::load_from(&dir, None).unwrap();
        assert_eq!(layered.market.tick_ms, 1000);

        let config = SimConfig::load_from(&dir, explicit.to_str()).unwrap();
        assert_eq!(config.market.tick_ms, 500);
        assert_eq!(config.market.max_production_cycles, 7);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("barter-config-{}", uuid::Uuid::new_v4()));
        let missing = dir.join("absent.toml");
        assert!(SimConfig::load_from(&dir, missing.to_str()).is_err());
    }

    #[test]
    fn test_deserialize_partial_file() {
        let config: SimConfig = serde_json::from_str(
            r#"{ "market": { "tick_ms": 500, "session_policy": "serialized" } }"#,
        )
        .unwrap();
        assert_eq!(config.market.tick_ms, 500);
        assert_eq!(config.market.session_policy, SessionPolicy::Serialized);
        assert_eq!(config.agents.len(), 3);
        assert!(config.trade_log.enabled);
    }
}
