use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

use crate::sweep::SweepReport;

/// Current state of the monitor.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    /// Baseline captured; watching for an address change.
    Armed,
    /// The address changed and watched processes were terminated.
    Triggered,
    /// Interrupted by the user before any change was seen.
    Stopped,
    /// The monitor died on an error; nothing is being watched any more.
    Failed,
}

/// Runtime status written to `<data dir>/krueger/status.toml` so other tools
/// (status bars, scripts) can tell whether the monitor is still armed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorStatus {
    /// Binary version (git tag when built from a checkout).
    pub version: String,
    pub state: MonitorState,
    /// Watch list terms as configured.
    pub watching: Vec<String>,
    /// Outbound address captured when monitoring started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_ip: Option<String>,
    /// Address observed when the monitor triggered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_ip: Option<String>,
    /// RFC 3339 timestamp of the trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<String>,
    /// Processes killed by the sweep, as "name (pid)".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub killed: Vec<String>,
    /// Human-readable description of the last non-fatal error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MonitorStatus {
    pub fn new(watching: &[String]) -> Self {
        Self {
            version: env!("KRUEGER_VERSION").to_string(),
            state: MonitorState::Armed,
            watching: watching.to_vec(),
            baseline_ip: None,
            new_ip: None,
            triggered_at: None,
            killed: Vec::new(),
            error: None,
        }
    }

    pub fn mark_armed(&mut self, baseline: IpAddr) {
        self.state = MonitorState::Armed;
        self.baseline_ip = Some(baseline.to_string());
    }

    pub fn mark_triggered(&mut self, new: IpAddr, at: chrono::DateTime<chrono::Local>) {
        self.state = MonitorState::Triggered;
        self.new_ip = Some(new.to_string());
        self.triggered_at = Some(at.to_rfc3339());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = MonitorState::Failed;
        self.error = Some(error.into());
    }

    pub fn record_sweep(&mut self, report: &SweepReport) {
        self.killed = report
            .killed
            .iter()
            .map(|r| format!("{} ({})", r.name, r.pid))
            .collect();
        if report.is_clean() {
            return;
        }
        let leftovers: Vec<String> = report
            .failures
            .iter()
            .map(|f| format!("{} ({})", f.name, f.pid))
            .chain(report.exhausted.iter().cloned())
            .collect();
        self.error = Some(format!("Still running after sweep: {}", leftovers.join(", ")));
    }
}

/// Writes `status` as TOML next to `path` and renames it into place, so a
/// reader never sees a half-written file.  Errors are logged, never returned.
pub fn write_status(path: &Path, status: &MonitorStatus) {
    if let Err(e) = try_write_status(path, status) {
        log::warn!("Failed to update status file {}: {e:#}", path.display());
    }
}

fn try_write_status(path: &Path, status: &MonitorStatus) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let content = toml::to_string_pretty(status)?;
    let staging = path.with_extension("toml.tmp");
    std::fs::write(&staging, content)?;
    std::fs::rename(&staging, path)?;
    Ok(())
}
