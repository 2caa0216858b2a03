use std::net::IpAddr;

use crate::sweep::{KillFailure, SweepReport};

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Baseline captured; monitoring has started.
    Armed(IpAddr),
    /// Address sampled on a poll tick.  Best effort: dropped when the
    /// consumer falls behind.
    Tick(IpAddr),
    /// The outbound address changed.  Sent before the sweep starts.
    Triggered { old: IpAddr, new: IpAddr },
    /// A watched process could not be killed during the sweep.
    KillFailed(KillFailure),
    /// The sweep finished; no more events follow.
    SweepComplete(SweepReport),
}
