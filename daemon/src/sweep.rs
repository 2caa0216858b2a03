/// Termination sweep: force-kills every running process whose name matches
/// the watch list.
///
/// Processes are targeted by their own reported name, not by the watch term,
/// so a term such as `"fire"` reaches a process called `"firefox"`.  Each
/// matching name is drained (killed repeatedly until no process with that
/// exact name remains) before moving on, which takes care of applications that
/// spawn many helpers under one name.
use crate::error::KillError;
use crate::process::{ProcessDirectory, ProcessRecord};
use crate::watchlist::WatchList;

pub const DEFAULT_MAX_KILLS_PER_NAME: u32 = 64;

/// A kill that the OS refused.  The drain for that name was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillFailure {
    pub pid: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Every process the OS accepted a kill for, in kill order.
    pub killed: Vec<ProcessRecord>,
    pub failures: Vec<KillFailure>,
    /// Names still present after `max_kills_per_name` successful kills.
    pub exhausted: Vec<String>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.exhausted.is_empty()
    }
}

/// Runs one sweep to completion.  A failure on one name never stops the
/// remaining names from being drained.
pub fn sweep<D>(directory: &mut D, watch_list: &WatchList, max_kills_per_name: u32) -> SweepReport
where
    D: ProcessDirectory + ?Sized,
{
    let listing = directory.list_processes();

    let mut targets: Vec<String> = Vec::new();
    for record in watch_list.matching(&listing) {
        if !targets.contains(&record.name) {
            targets.push(record.name.clone());
        }
    }

    let mut report = SweepReport::default();
    for name in targets {
        drain(directory, &name, max_kills_per_name.max(1), &mut report);
    }
    report
}

fn drain<D>(directory: &mut D, name: &str, max_kills: u32, report: &mut SweepReport)
where
    D: ProcessDirectory + ?Sized,
{
    for _ in 0..max_kills {
        match directory.kill_by_name(name) {
            Ok(record) => {
                log::info!("Killed {} (pid {})", record.name, record.pid);
                report.killed.push(record);
            }
            Err(KillError::NotFound { .. }) => return,
            Err(KillError::Failed { pid, name }) => {
                log::warn!("Could not kill {name} (pid {pid}); skipping remaining instances");
                report.failures.push(KillFailure { pid, name });
                return;
            }
        }
    }

    let listing = directory.list_processes();
    if listing.records.iter().any(|r| r.name == name) {
        log::warn!("{name} is still running after {max_kills} kills; giving up on it");
        report.exhausted.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::FakeDirectory;

    #[test]
    fn drains_every_instance_of_a_name() {
        let mut dir = FakeDirectory::with(&[(10, "chrome"), (11, "chrome"), (12, "chrome")]);
        let report = sweep(&mut dir, &WatchList::new(["chrome"]), DEFAULT_MAX_KILLS_PER_NAME);

        assert_eq!(dir.count_named("chrome"), 0);
        assert_eq!(report.killed.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![10, 11, 12]);
        // Three kills plus the NotFound that ends the drain.
        assert_eq!(dir.kill_calls.len(), 4);
        assert!(report.is_clean());
    }

    #[test]
    fn partial_term_targets_the_real_process_name() {
        let mut dir = FakeDirectory::with(&[(5, "firefox"), (6, "bash")]);
        let report = sweep(&mut dir, &WatchList::new(["fire"]), DEFAULT_MAX_KILLS_PER_NAME);

        assert_eq!(dir.count_named("firefox"), 0);
        assert_eq!(dir.count_named("bash"), 1);
        assert_eq!(report.killed, vec![ProcessRecord { pid: 5, name: "firefox".to_string() }]);
        assert!(!dir.kill_calls.iter().any(|n| n == "fire"));
    }

    #[test]
    fn no_matches_means_no_kill_attempts() {
        let mut dir = FakeDirectory::with(&[(1, "bash"), (2, "sshd")]);
        let report = sweep(&mut dir, &WatchList::new(["signal"]), DEFAULT_MAX_KILLS_PER_NAME);

        assert!(dir.kill_calls.is_empty());
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn one_name_per_distinct_match() {
        // Two terms matching the same process must not drain it twice.
        let mut dir = FakeDirectory::with(&[(1, "signal-desktop"), (2, "signal-desktop")]);
        sweep(&mut dir, &WatchList::new(["signal", "desktop"]), DEFAULT_MAX_KILLS_PER_NAME);
        assert_eq!(dir.kill_calls, vec!["signal-desktop"; 3]);
    }

    #[test]
    fn refused_kill_does_not_block_other_names() {
        let mut dir = FakeDirectory::with(&[(1, "brave"), (2, "chrome"), (3, "chrome")]);
        dir.protected.push("brave".to_string());

        let report = sweep(&mut dir, &WatchList::new(["brave", "chrome"]), DEFAULT_MAX_KILLS_PER_NAME);

        assert_eq!(report.failures, vec![KillFailure { pid: 1, name: "brave".to_string() }]);
        assert_eq!(dir.count_named("chrome"), 0);
        assert_eq!(dir.count_named("brave"), 1);
        // Only one attempt against the protected name.
        assert_eq!(dir.kill_calls.iter().filter(|n| *n == "brave").count(), 1);
    }

    #[test]
    fn drain_is_bounded_when_kills_have_no_effect() {
        let mut dir = FakeDirectory::with(&[(1, "zombie")]);
        dir.immortal.push("zombie".to_string());

        let report = sweep(&mut dir, &WatchList::new(["zombie"]), 5);

        assert_eq!(dir.kill_calls.len(), 5);
        assert_eq!(report.exhausted, vec!["zombie".to_string()]);
        assert!(!report.is_clean());
    }

    #[test]
    fn zero_bound_still_attempts_one_kill() {
        let mut dir = FakeDirectory::with(&[(1, "chrome")]);
        let report = sweep(&mut dir, &WatchList::new(["chrome"]), 0);
        assert_eq!(report.killed.len(), 1);
        assert!(report.is_clean());
    }

    #[test]
    fn unresolved_entries_are_ignored() {
        let mut dir = FakeDirectory::with(&[(2, "chrome")]);
        dir.processes.push((1, None));
        let report = sweep(&mut dir, &WatchList::new(["chrome"]), DEFAULT_MAX_KILLS_PER_NAME);
        assert_eq!(report.killed.len(), 1);
        assert_eq!(dir.processes.len(), 1);
    }
}
