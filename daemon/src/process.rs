use std::ffi::OsStr;

use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, System};

use crate::error::KillError;

/// Snapshot of one running process at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
}

/// Result of one enumeration pass.  Entries whose name could not be resolved
/// are counted in `unresolved` instead of failing the whole listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessListing {
    pub records: Vec<ProcessRecord>,
    pub unresolved: usize,
}

impl ProcessListing {
    /// Builds a listing from raw `(pid, name)` pairs, where `None` marks a
    /// name lookup that failed.  Records are ordered by PID.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, Option<String>)>,
    {
        let mut listing = Self::default();
        for (pid, name) in entries {
            match name {
                Some(name) if !name.is_empty() => listing.records.push(ProcessRecord { pid, name }),
                _ => listing.unresolved += 1,
            }
        }
        listing.records.sort_by_key(|r| r.pid);
        listing
    }
}

/// Access to the OS process table.
pub trait ProcessDirectory {
    fn list_processes(&mut self) -> ProcessListing;

    /// Force-kills the first process (lowest PID) whose name equals `name`
    /// exactly.  Does not wait for the process to exit.
    fn kill_by_name(&mut self, name: &str) -> Result<ProcessRecord, KillError>;
}

/// [`ProcessDirectory`] backed by `sysinfo`.  The table is refreshed from
/// scratch on every call since processes come and go between calls.
pub struct SystemDirectory {
    sys: System,
}

impl SystemDirectory {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    fn refresh(&mut self) {
        // Drop exited processes so a drained name eventually reports NotFound.
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
    }
}

impl Default for SystemDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Zombies have already exited and only wait to be reaped; killing them again
/// is a no-op that would keep a drain loop spinning.
fn resolve_name(process: &Process) -> Option<String> {
    if process.status() == ProcessStatus::Zombie {
        return None;
    }
    os_name(process.name())
}

fn os_name(name: &OsStr) -> Option<String> {
    name.to_str().map(str::to_string)
}

/// Zombies are dropped without counting towards `unresolved`.
fn listing_from<'a, I>(entries: I) -> ProcessListing
where
    I: IntoIterator<Item = (u32, ProcessStatus, &'a OsStr)>,
{
    ProcessListing::from_entries(
        entries
            .into_iter()
            .filter(|(_, status, _)| *status != ProcessStatus::Zombie)
            .map(|(pid, _, name)| (pid, os_name(name))),
    )
}

impl ProcessDirectory for SystemDirectory {
    fn list_processes(&mut self) -> ProcessListing {
        self.refresh();
        let listing = listing_from(
            self.sys
                .processes()
                .iter()
                .map(|(pid, process)| (pid.as_u32(), process.status(), process.name())),
        );
        if listing.unresolved > 0 {
            log::debug!(
                "Skipped {} process(es) whose name could not be resolved",
                listing.unresolved
            );
        }
        listing
    }

    fn kill_by_name(&mut self, name: &str) -> Result<ProcessRecord, KillError> {
        self.refresh();

        let target: Option<(&Pid, &Process)> = self
            .sys
            .processes()
            .iter()
            .filter(|(_, p)| resolve_name(p).as_deref() == Some(name))
            .min_by_key(|(pid, _)| pid.as_u32());

        let Some((pid, process)) = target else {
            return Err(KillError::NotFound { name: name.to_string() });
        };

        let record = ProcessRecord { pid: pid.as_u32(), name: name.to_string() };
        if process.kill() {
            Ok(record)
        } else {
            Err(KillError::Failed { pid: record.pid, name: record.name })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory process table.  `kill_by_name` removes the lowest-PID match;
    /// names listed in `protected` refuse to die, mimicking permission errors.
    #[derive(Debug, Default)]
    pub struct FakeDirectory {
        pub processes: Vec<(u32, Option<String>)>,
        pub protected: Vec<String>,
        /// Names whose kill "succeeds" without removing the process.
        pub immortal: Vec<String>,
        pub kill_calls: Vec<String>,
    }

    impl FakeDirectory {
        pub fn with(processes: &[(u32, &str)]) -> Self {
            Self {
                processes: processes
                    .iter()
                    .map(|(pid, name)| (*pid, Some(name.to_string())))
                    .collect(),
                ..Self::default()
            }
        }

        pub fn count_named(&self, name: &str) -> usize {
            self.processes
                .iter()
                .filter(|(_, n)| n.as_deref() == Some(name))
                .count()
        }
    }

    /// Shared handle so a test can inspect the table after the monitor has
    /// moved its directory onto the blocking pool.
    pub type SharedDirectory = Arc<Mutex<FakeDirectory>>;

    pub fn shared(processes: &[(u32, &str)]) -> SharedDirectory {
        Arc::new(Mutex::new(FakeDirectory::with(processes)))
    }

    impl ProcessDirectory for SharedDirectory {
        fn list_processes(&mut self) -> ProcessListing {
            self.lock().unwrap().list_processes()
        }

        fn kill_by_name(&mut self, name: &str) -> Result<ProcessRecord, KillError> {
            self.lock().unwrap().kill_by_name(name)
        }
    }

    impl ProcessDirectory for FakeDirectory {
        fn list_processes(&mut self) -> ProcessListing {
            ProcessListing::from_entries(self.processes.clone())
        }

        fn kill_by_name(&mut self, name: &str) -> Result<ProcessRecord, KillError> {
            self.kill_calls.push(name.to_string());
            let idx = self
                .processes
                .iter()
                .enumerate()
                .filter(|(_, (_, n))| n.as_deref() == Some(name))
                .min_by_key(|(_, (pid, _))| *pid)
                .map(|(i, _)| i)
                .ok_or_else(|| KillError::NotFound { name: name.to_string() })?;

            let pid = self.processes[idx].0;
            if self.protected.iter().any(|p| p == name) {
                return Err(KillError::Failed { pid, name: name.to_string() });
            }
            if !self.immortal.iter().any(|p| p == name) {
                self.processes.remove(idx);
            }
            Ok(ProcessRecord { pid, name: name.to_string() })
        }
    }
}
