//! Ledger snapshot observers
//!
//! Observers are called synchronously from the owning agent's task after
//! every published mutation. They must not block for long and never fail the
//! mutation: write errors are logged and swallowed here.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use barter_types::{AgentId, GoodCatalog};
use dashmap::DashMap;
use thiserror::Error;

use crate::LedgerSnapshot;

/// Consumer of ledger snapshots
pub trait LedgerObserver: Send {
    fn on_snapshot(&mut self, snapshot: &LedgerSnapshot);
}

/// Errors opening the trade log
#[derive(Error, Debug)]
pub enum TradeLogError {
    #[error("cannot open trade log {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Append-only, tab-separated log of an agent's holdings
///
/// ```text
/// \tBREAD\tGRAIN\tLAND
/// \t0\t5\t3
/// \t1\t3\t3
/// ```
pub struct TradeLog {
    path: PathBuf,
    writer: BufWriter<File>,
    write_failed: bool,
}

impl TradeLog {
    /// `agent_<name>_log.txt`
    pub fn file_name(owner: &AgentId) -> String {
        format!("agent_{}_log.txt", owner)
    }

    /// Create the log in `dir` and write the header row
    pub fn create(
        dir: &Path,
        owner: &AgentId,
        catalog: &GoodCatalog,
    ) -> Result<Self, TradeLogError> {
        let path = dir.join(Self::file_name(owner));
        let open = |path: &Path| -> io::Result<BufWriter<File>> {
            fs::create_dir_all(dir)?;
            let mut writer = BufWriter::new(File::create(path)?);
            let header: String = catalog.names().iter().map(|name| format!("\t{}", name)).collect();
            writeln!(writer, "{}", header)?;
            writer.flush()?;
            Ok(writer)
        };
        let writer = open(&path).map_err(|source| TradeLogError::Open {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(agent = %owner, path = %path.display(), "trade log opened");
        Ok(Self {
            path,
            writer,
            write_failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, snapshot: &LedgerSnapshot) -> io::Result<()> {
        let row: String = snapshot
            .quantities
            .as_slice()
            .iter()
            .map(|q| format!("\t{}", q))
            .collect();
        writeln!(self.writer, "{}", row)?;
        self.writer.flush()
    }
}

impl LedgerObserver for TradeLog {
    fn on_snapshot(&mut self, snapshot: &LedgerSnapshot) {
        match self.append(snapshot) {
            Ok(()) => self.write_failed = false,
            Err(err) if !self.write_failed => {
                self.write_failed = true;
                tracing::warn!(
                    agent = %snapshot.owner,
                    path = %self.path.display(),
                    error = %err,
                    "trade log write failed"
                );
            }
            Err(err) => {
                tracing::debug!(agent = %snapshot.owner, error = %err, "trade log still failing");
            }
        }
    }
}

/// Latest snapshot of every agent, shared with the status display
#[derive(Clone)]
pub struct StatusBoard {
    catalog: GoodCatalog,
    latest: Arc<DashMap<AgentId, LedgerSnapshot>>,
}

impl StatusBoard {
    pub fn new(catalog: GoodCatalog) -> Self {
        Self {
            catalog,
            latest: Arc::new(DashMap::new()),
        }
    }

    pub fn latest(&self, agent: &AgentId) -> Option<LedgerSnapshot> {
        self.latest.get(agent).map(|entry| entry.value().clone())
    }

    /// Agents that published at least once, sorted by name
    pub fn agents(&self) -> Vec<AgentId> {
        let mut agents: Vec<AgentId> =
            self.latest.iter().map(|entry| entry.key().clone()).collect();
        agents.sort();
        agents
    }

    /// Fixed-width table, one row per agent
    pub fn render(&self) -> String {
        let mut out = format!("{:<16}", "AGENT");
        for name in self.catalog.names() {
            out.push_str(&format!("{:>10}", name));
        }
        out.push('\n');

        for agent in self.agents() {
            if let Some(snapshot) = self.latest(&agent) {
                out.push_str(&format!("{:<16}", agent.as_str()));
                for q in snapshot.quantities.as_slice() {
                    out.push_str(&format!("{:>10}", q));
                }
                out.push('\n');
            }
        }
        out
    }
}

impl LedgerObserver for StatusBoard {
    fn on_snapshot(&mut self, snapshot: &LedgerSnapshot) {
        let newer = self
            .latest
            .get(&snapshot.owner)
            .map(|current| current.revision < snapshot.revision)
            .unwrap_or(true);
        if newer {
            self.latest.insert(snapshot.owner.clone(), snapshot.clone());
        }
    }
}
