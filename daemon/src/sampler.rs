/// Determines which local address the OS would use for outbound traffic.
///
/// A UDP socket is "connected" towards a probe address; connecting a datagram
/// socket only consults the routing table and never sends anything, so the
/// probe does not have to be reachable.  The address the socket ends up bound
/// to is the outbound-facing local IP, which changes when a VPN tunnel comes
/// up or goes down.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crate::error::SamplingError;

pub const DEFAULT_PROBE_ADDRESS: &str = "8.8.8.8:80";

pub trait AddressSampler {
    fn sample(&self) -> Result<IpAddr, SamplingError>;
}

#[derive(Debug, Clone)]
pub struct UdpSampler {
    probe: SocketAddr,
}

impl UdpSampler {
    pub fn new(probe: SocketAddr) -> Self {
        Self { probe }
    }
}

impl AddressSampler for UdpSampler {
    fn sample(&self) -> Result<IpAddr, SamplingError> {
        let bind_addr: SocketAddr = match self.probe {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(bind_addr).map_err(SamplingError::Bind)?;
        socket
            .connect(self.probe)
            .map_err(|source| SamplingError::Connect { probe: self.probe, source })?;
        let local = socket.local_addr().map_err(SamplingError::LocalAddr)?.ip();

        if local.is_unspecified() {
            return Err(SamplingError::Unspecified(local));
        }
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Loopback always has a route, so these work on machines without a network.

    #[test]
    fn loopback_probe_resolves_to_loopback() {
        let sampler = UdpSampler::new("127.0.0.1:9".parse().unwrap());
        let ip = sampler.sample().unwrap();
        assert!(ip.is_loopback());
    }

    #[test]
    fn repeated_samples_are_stable() {
        let sampler = UdpSampler::new("127.0.0.1:9".parse().unwrap());
        assert_eq!(sampler.sample().unwrap(), sampler.sample().unwrap());
    }

    #[test]
    fn default_probe_parses() {
        let probe: SocketAddr = DEFAULT_PROBE_ADDRESS.parse().unwrap();
        assert!(probe.is_ipv4());
        assert_eq!(probe.port(), 80);
    }
}
