/// Change-detection loop.
///
/// The monitor captures the outbound address once (the baseline), then
/// resamples it on a fixed cadence.  The first sample that differs from the
/// baseline triggers a termination sweep over the watch list, after which the
/// monitor is done: it never re-arms with a new baseline.
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::error::MonitorError;
use crate::event::MonitorEvent;
use crate::process::ProcessDirectory;
use crate::sampler::AddressSampler;
use crate::sweep::{self, SweepReport, DEFAULT_MAX_KILLS_PER_NAME};
use crate::watchlist::WatchList;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Channel slots ticks never take, so `Triggered` and `SweepComplete` still
/// fit when the consumer has stopped reading.
const LIFECYCLE_SLOTS: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub max_kills_per_name: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_kills_per_name: DEFAULT_MAX_KILLS_PER_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    /// The address changed and the sweep ran to completion.
    Triggered { old: IpAddr, new: IpAddr, report: SweepReport },
    /// Stopped by the caller while still armed.  Nothing was killed.
    Cancelled { baseline: IpAddr },
}

pub struct Monitor<S, D> {
    watch_list: Arc<WatchList>,
    sampler: S,
    directory: D,
    settings: MonitorSettings,
}

impl<S, D> Monitor<S, D>
where
    S: AddressSampler,
    D: ProcessDirectory + Send + 'static,
{
    /// Refuses an empty watch list: there would be nothing to protect.
    pub fn new(
        watch_list: Arc<WatchList>,
        sampler: S,
        directory: D,
        settings: MonitorSettings,
    ) -> Result<Self, MonitorError> {
        if watch_list.is_empty() {
            return Err(MonitorError::EmptyWatchList);
        }
        Ok(Self { watch_list, sampler, directory, settings })
    }

    /// Runs until the outbound address changes or `stop` flips to `true`.
    ///
    /// The stop signal is only observed while armed; once a change has been
    /// seen the sweep always runs to the end.  A failed sample is fatal.
    /// Events are best effort and never awaited: a full or closed channel
    /// neither delays polling nor holds up the sweep.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<MonitorEvent>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<MonitorOutcome, MonitorError> {
        let baseline = self.sampler.sample()?;
        log::info!("Armed with baseline address {baseline}");
        let _ = tx.try_send(MonitorEvent::Armed(baseline));

        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the baseline was just taken.
        ticker.tick().await;

        let mut stop_open = true;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                res = stop.changed(), if stop_open => {
                    match res {
                        Ok(()) if *stop.borrow_and_update() => {
                            log::info!("Monitoring stopped before any address change");
                            return Ok(MonitorOutcome::Cancelled { baseline });
                        }
                        Ok(()) => {}
                        // Nobody can stop us any more; keep watching.
                        Err(_) => stop_open = false,
                    }
                    continue;
                }
            }

            let current = self.sampler.sample()?;
            if tx.capacity() > LIFECYCLE_SLOTS {
                let _ = tx.try_send(MonitorEvent::Tick(current));
            }

            if current != baseline {
                return self.trigger(baseline, current, &tx).await;
            }
        }
    }

    async fn trigger(
        self,
        old: IpAddr,
        new: IpAddr,
        tx: &mpsc::Sender<MonitorEvent>,
    ) -> Result<MonitorOutcome, MonitorError> {
        log::warn!("Outbound address changed from {old} to {new}; terminating watched processes");
        let _ = tx.try_send(MonitorEvent::Triggered { old, new });

        // Every kill refreshes the whole process table; keep that off the runtime.
        let Self { watch_list, mut directory, settings, .. } = self;
        let report = tokio::task::spawn_blocking(move || {
            sweep::sweep(&mut directory, &watch_list, settings.max_kills_per_name)
        })
        .await
        .map_err(MonitorError::SweepAborted)?;

        for failure in &report.failures {
            // The last free slot belongs to SweepComplete, which repeats the failures.
            if tx.capacity() <= 1 {
                break;
            }
            let _ = tx.try_send(MonitorEvent::KillFailed(failure.clone()));
        }
        log::info!("Sweep complete: {} process(es) killed", report.killed.len());
        let _ = tx.try_send(MonitorEvent::SweepComplete(report.clone()));

        Ok(MonitorOutcome::Triggered { old, new, report })
    }
}
