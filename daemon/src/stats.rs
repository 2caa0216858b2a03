/// Read-only statistics shown while the monitor is armed: a periodic summary
/// of how many running processes the watch list currently covers, and the
/// `--debug` table of matched processes.
use chrono::{DateTime, Local};
use colored::Colorize;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::process::{ProcessDirectory, ProcessListing, SystemDirectory};
use crate::watchlist::WatchList;

/// Go-style RFC 850 layout, e.g. "Monday, 02-Jan-06 15:04:05 +01:00".
const RFC850: &str = "%A, %d-%b-%y %H:%M:%S %:z";

/// Returns `(protected, total)`: matched processes and all resolved processes.
pub fn protected_counts(listing: &ProcessListing, watch_list: &WatchList) -> (usize, usize) {
    (watch_list.matching(listing).count(), listing.records.len())
}

/// Renders the PID / name table of processes the watch list covers.
pub fn matching_table(listing: &ProcessListing, watch_list: &WatchList) -> String {
    let rows: Vec<(String, &str)> = watch_list
        .matching(listing)
        .map(|r| (r.pid.to_string(), r.name.as_str()))
        .collect();

    let pid_width = rows.iter().map(|(pid, _)| pid.len()).max().unwrap_or(0).max(3);
    let name_width = rows.iter().map(|(_, name)| name.len()).max().unwrap_or(0).max(12);

    let mut out = format!("{:>pid_width$}  {:>name_width$}\n", "PID", "Process Name");
    for (pid, name) in rows {
        out.push_str(&format!("{pid:>pid_width$}  {name:>name_width$}\n"));
    }
    out
}

pub fn render_summary(
    now: DateTime<Local>,
    watch_list: &WatchList,
    counts: (usize, usize),
    address: IpAddr,
) -> String {
    let (protected, total) = counts;
    format!(
        "Time: {}\nWatching: {}\nProtecting {}/{} Processes\nCurrent IP: {}",
        now.format(RFC850).to_string().yellow(),
        watch_list.to_string().blue(),
        protected.to_string().green(),
        total,
        address.to_string().magenta(),
    )
}

/// Prints a summary immediately and then every `every` until the task is aborted.
pub async fn run(watch_list: Arc<WatchList>, baseline: IpAddr, every: Duration) {
    let mut directory = SystemDirectory::new();
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let listing = directory.list_processes();
        let counts = protected_counts(&listing, &watch_list);
        println!("{}\n", render_summary(Local::now(), &watch_list, counts, baseline));
    }
}
