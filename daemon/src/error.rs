use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// The outbound-facing local address could not be determined.
/// Always fatal: without a baseline there is nothing to compare against.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("failed to open a UDP socket: {0}")]
    Bind(#[source] io::Error),
    #[error("no route towards probe address {probe}: {source}")]
    Connect {
        probe: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to read the locally bound address: {0}")]
    LocalAddr(#[source] io::Error),
    /// The OS bound the socket without picking an interface.
    #[error("the OS did not select an outbound interface (bound to {0})")]
    Unspecified(std::net::IpAddr),
}

/// Outcome of a single forced kill attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KillError {
    /// No running process carries this exact name. Ends a drain loop.
    #[error("no process named '{name}' is running")]
    NotFound { name: String },
    /// The OS refused to deliver the kill signal (usually permissions).
    #[error("the OS refused to kill '{name}' (pid {pid})")]
    Failed { pid: u32, name: String },
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("the watch list is empty; configure at least one process name to protect")]
    EmptyWatchList,
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    /// The blocking sweep task panicked or was cancelled by the runtime.
    #[error("the termination sweep did not finish: {0}")]
    SweepAborted(#[source] tokio::task::JoinError),
}
