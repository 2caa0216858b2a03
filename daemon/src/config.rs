use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::MonitorSettings;
use crate::sampler::DEFAULT_PROBE_ADDRESS;
use crate::sweep::DEFAULT_MAX_KILLS_PER_NAME;
use crate::watchlist::WatchList;

pub const MIN_POLL_INTERVAL_MS: u64 = 10;
pub const MAX_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 60;
/// Comma-separated watch list that replaces the file's `processes` when set.
pub const PROCESSES_ENV_VAR: &str = "KRUEGER_PROCESSES";

/// Root configuration structure, read from `.krueger.toml`.
#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Process name fragments to kill when the outbound address changes.
    /// Accepts either a TOML array or a single comma-separated string.
    #[serde(default, deserialize_with = "deserialize_processes")]
    pub processes: Vec<String>,
    /// Delay between two address samples. Clamped to [10, 1000] ms.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Address used to make the OS pick an outbound route. Never contacted.
    #[serde(default = "default_probe_address")]
    pub probe_address: String,
    /// Upper bound on kills per process name during one sweep.
    #[serde(default = "default_max_kills")]
    pub max_kills_per_name: u32,
    /// How often the statistics area is refreshed.
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processes: Vec::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            probe_address: DEFAULT_PROBE_ADDRESS.to_string(),
            max_kills_per_name: DEFAULT_MAX_KILLS_PER_NAME,
            stats_interval_secs: DEFAULT_STATS_INTERVAL_SECS,
        }
    }
}

impl Config {
    pub fn watch_list(&self) -> WatchList {
        WatchList::new(
            self.processes
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty()),
        )
    }

    pub fn effective_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }

    pub fn effective_stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }

    pub fn probe(&self) -> Result<SocketAddr> {
        self.probe_address
            .parse()
            .with_context(|| format!("Invalid probe_address '{}'", self.probe_address))
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: self.effective_poll_interval(),
            max_kills_per_name: self.max_kills_per_name.max(1),
        }
    }

    /// Replaces `processes` with the comma-separated `value`, unless it holds
    /// no usable term.
    pub fn apply_processes_override(&mut self, value: Option<&str>) {
        let Some(value) = value else { return };
        let list = WatchList::parse(value);
        if !list.is_empty() {
            self.processes = list.terms().to_vec();
        }
    }
}

/// Reads `path` as a config file.  A file that does not exist yields the
/// defaults; one that cannot be read or parsed is an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read config file: {}", path.display()))
        }
    };
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolves the configuration for this run.
///
/// An explicit path must exist.  Otherwise the first existing file among
/// `candidates` is used, falling back to defaults when none exists.  Returns
/// the config together with the file it came from, if any.
pub fn resolve(explicit: Option<&Path>, candidates: &[PathBuf]) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        return Ok((load_or_default(path)?, Some(path.to_path_buf())));
    }

    match candidates.iter().find(|p| p.exists()) {
        Some(path) => Ok((load_or_default(path)?, Some(path.clone()))),
        None => Ok((Config::default(), None)),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProcessesField {
    List(Vec<String>),
    Joined(String),
}

fn deserialize_processes<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ProcessesField::deserialize(deserializer)? {
        ProcessesField::List(list) => list,
        ProcessesField::Joined(joined) => WatchList::parse(&joined).terms().to_vec(),
    })
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_probe_address() -> String {
    DEFAULT_PROBE_ADDRESS.to_string()
}

fn default_max_kills() -> u32 {
    DEFAULT_MAX_KILLS_PER_NAME
}

fn default_stats_interval() -> u64 {
    DEFAULT_STATS_INTERVAL_SECS
}
