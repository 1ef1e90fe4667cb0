//! Per interface DHCP client state.
//!
//! The transitions that send messages live in `service::dhcp`; this module
//! holds the data they act on.

use std::time::{
    Duration,
    Instant,
};

use core::repr::{
    DhcpRepr,
    Ipv4Address,
};
use core::timer::TimerHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhcpState {
    Init,
    Selecting,
    Requesting,
    Bound,
    Renewing,
    Rebinding,
}

/// An address offered or leased by a server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lease {
    pub addr: Ipv4Address,
    pub netmask: Ipv4Address,
    pub gateway: Option<Ipv4Address>,
    pub dns_server: Option<Ipv4Address>,
    pub server_identifier: Ipv4Address,
    pub duration: Duration,
    pub renewal: Duration,
    pub rebinding: Duration,
}

impl Lease {
    /// Extracts a lease from an OFFER or ACK. Returns None if the server
    /// identifier or the lease time is missing.
    pub fn from_repr(repr: &DhcpRepr) -> Option<Lease> {
        let server_identifier = repr.server_identifier?;
        let lease_duration = repr.lease_duration?;

        let renewal = repr.renewal_duration.unwrap_or(lease_duration / 2);
        let rebinding = repr.rebinding_duration
            .unwrap_or((lease_duration as u64 * 7 / 8) as u32);

        Some(Lease {
            addr: repr.your_addr,
            netmask: repr
                .subnet_mask
                .unwrap_or_else(|| Ipv4Address::new([255, 255, 255, 0])),
            gateway: repr.router,
            dns_server: repr.dns_server,
            server_identifier,
            duration: Duration::from_secs(lease_duration as u64),
            renewal: Duration::from_secs(renewal as u64),
            rebinding: Duration::from_secs(rebinding as u64),
        })
    }
}

#[derive(Debug)]
pub struct DhcpClient {
    state: DhcpState,
    xid: u32,
    offer: Option<Lease>,
    lease: Option<Lease>,
    bound_at: Option<Instant>,
    timers: Vec<TimerHandle>,
}

impl DhcpClient {
    pub fn new() -> DhcpClient {
        DhcpClient {
            state: DhcpState::Init,
            xid: 0,
            offer: None,
            lease: None,
            bound_at: None,
            timers: Vec::new(),
        }
    }

    pub fn state(&self) -> DhcpState {
        self.state
    }

    pub fn set_state(&mut self, state: DhcpState) {
        self.state = state;
    }

    /// Returns the transaction id of the active exchange.
    pub fn xid(&self) -> u32 {
        self.xid
    }

    pub fn offer(&self) -> Option<Lease> {
        self.offer
    }

    pub fn lease(&self) -> Option<Lease> {
        self.lease
    }

    pub fn bound_at(&self) -> Option<Instant> {
        self.bound_at
    }

    /// Starts a new exchange in Selecting, forgetting any offer.
    pub fn begin_discovery(&mut self, xid: u32) {
        self.xid = xid;
        self.offer = None;
        self.state = DhcpState::Selecting;
    }

    pub fn select(&mut self, offer: Lease) {
        self.offer = Some(offer);
        self.state = DhcpState::Requesting;
    }

    pub fn bind(&mut self, lease: Lease, now: Instant) {
        self.offer = None;
        self.lease = Some(lease);
        self.bound_at = Some(now);
        self.state = DhcpState::Bound;
    }

    /// Returns to Init, discarding the offer and lease.
    pub fn reset(&mut self) {
        self.offer = None;
        self.lease = None;
        self.bound_at = None;
        self.state = DhcpState::Init;
    }

    pub fn add_timer(&mut self, handle: TimerHandle) {
        self.timers.push(handle);
    }

    /// Removes the handles of every armed timer so they can be cancelled.
    pub fn take_timers(&mut self) -> Vec<TimerHandle> {
        self.timers.drain(..).collect()
    }
}

impl Default for DhcpClient {
    fn default() -> DhcpClient {
        DhcpClient::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::repr::{
        DhcpMessageType,
        EthernetAddress,
    };

    fn ack() -> DhcpRepr {
        let mut repr = DhcpRepr::client(
            DhcpMessageType::Ack,
            1,
            EthernetAddress::new([0, 1, 2, 3, 4, 5]),
        );
        repr.your_addr = Ipv4Address::new([10, 0, 0, 5]);
        repr.server_identifier = Some(Ipv4Address::new([10, 0, 0, 1]));
        repr.lease_duration = Some(3600);
        repr
    }

    #[test]
    fn test_lease_default_timers() {
        let lease = Lease::from_repr(&ack()).unwrap();
        assert_eq!(lease.renewal, Duration::from_secs(1800));
        assert_eq!(lease.rebinding, Duration::from_secs(3150));
        assert_eq!(lease.duration, Duration::from_secs(3600));
    }

    #[test]
    fn test_lease_explicit_timers() {
        let mut repr = ack();
        repr.renewal_duration = Some(100);
        repr.rebinding_duration = Some(200);
        let lease = Lease::from_repr(&repr).unwrap();
        assert_eq!(lease.renewal, Duration::from_secs(100));
        assert_eq!(lease.rebinding, Duration::from_secs(200));
    }

    #[test]
    fn test_lease_requires_server_identifier() {
        let mut repr = ack();
        repr.server_identifier = None;
        assert!(Lease::from_repr(&repr).is_none());
    }

    #[test]
    fn test_transitions() {
        let mut client = DhcpClient::new();
        client.begin_discovery(7);
        assert_eq!(client.state(), DhcpState::Selecting);
        assert_eq!(client.xid(), 7);

        let lease = Lease::from_repr(&ack()).unwrap();
        client.select(lease);
        assert_eq!(client.state(), DhcpState::Requesting);
        assert_eq!(client.offer(), Some(lease));

        client.reset();
        assert_eq!(client.state(), DhcpState::Init);
        assert!(client.offer().is_none());
    }
}
