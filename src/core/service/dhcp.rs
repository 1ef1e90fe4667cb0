//! The DHCP client state machine.
//!
//! Init -> Selecting -> Requesting -> Bound -> Renewing -> Rebinding. Every
//! transition is driven by a received reply or a timer. Replies whose XID
//! does not match the active transaction are ignored.

use std::time::Duration;

use rand;

use core::dhcp_client::{
    DhcpState,
    Lease,
};
use core::interface::InterfaceId;
use core::repr::{
    dhcp,
    DhcpMessageType,
    DhcpOp,
    DhcpRepr,
    Ipv4Address,
};
use core::service::{
    nbns,
    udp,
    Stack,
};
use core::socket::SocketAddr;
use core::timer::{
    DhcpTimeout,
    TimerEvent,
};
use {
    Error,
    Result,
};

/// Cancels every DHCP timer of the interface and arms the specified ones.
fn rearm(stack: &mut Stack, id: InterfaceId, timeouts: &[(Duration, DhcpTimeout)]) -> Result<()> {
    for handle in stack.interfaces.get_mut(id)?.dhcp.take_timers() {
        stack.timer.cancel(handle);
    }

    for &(delay, timeout) in timeouts {
        let handle = stack.timer.arm(
            delay,
            TimerEvent::Dhcp {
                interface: id,
                timeout,
            },
        );
        stack.interfaces.get_mut(id)?.dhcp.add_timer(handle);
    }

    Ok(())
}

/// Resets the client to Init and arms the timer that starts discovery.
pub fn start(stack: &mut Stack, id: InterfaceId) -> Result<()> {
    stack.interfaces.get_mut(id)?.dhcp.reset();
    let delay = stack.config.dhcp_init_delay;
    rearm(stack, id, &[(delay, DhcpTimeout::Init)])
}

/// Reacts to a DHCP timer. Timers that no longer apply to the current state
/// are ignored.
pub fn on_timeout(stack: &mut Stack, id: InterfaceId, timeout: DhcpTimeout) -> Result<()> {
    let state = stack.interfaces.get(id)?.dhcp.state();

    match (state, timeout) {
        (DhcpState::Init, DhcpTimeout::Init) => discover(stack, id),
        (DhcpState::Selecting, DhcpTimeout::Retransmit)
        | (DhcpState::Requesting, DhcpTimeout::Retransmit) => {
            debug!("No DHCP reply in {:?} on {}, restarting discovery.", state, id);
            discover(stack, id)
        }
        (DhcpState::Bound, DhcpTimeout::Renew) => {
            stack
                .interfaces
                .get_mut(id)?
                .dhcp
                .set_state(DhcpState::Renewing);
            send_renewal(stack, id, false)
        }
        (DhcpState::Bound, DhcpTimeout::Rebind) | (DhcpState::Renewing, DhcpTimeout::Rebind) => {
            stack
                .interfaces
                .get_mut(id)?
                .dhcp
                .set_state(DhcpState::Rebinding);
            send_renewal(stack, id, true)
        }
        (DhcpState::Bound, DhcpTimeout::Expire)
        | (DhcpState::Renewing, DhcpTimeout::Expire)
        | (DhcpState::Rebinding, DhcpTimeout::Expire) => {
            let interface = stack.interfaces.get_mut(id)?;
            info!(
                "DHCP lease of {} on {} expired, releasing.",
                interface.ipv4_addr(),
                id
            );
            interface.clear_ipv4_addr();
            start(stack, id)
        }
        (state, timeout) => {
            debug!(
                "Ignoring DHCP timeout {:?} in {:?} on {}.",
                timeout, state, id
            );
            Ok(())
        }
    }
}

/// Broadcasts a DISCOVER with a fresh XID.
fn discover(stack: &mut Stack, id: InterfaceId) -> Result<()> {
    let xid = rand::random::<u32>();
    let interface = stack.interfaces.get_mut(id)?;
    interface.dhcp.begin_discovery(xid);
    let dhcp_repr = DhcpRepr::client(DhcpMessageType::Discover, xid, interface.ethernet_addr());

    let delay = stack.config.dhcp_retransmit_timeout;
    rearm(stack, id, &[(delay, DhcpTimeout::Retransmit)])?;

    debug!("Sending DHCP discover with xid {:#010x} on {}.", xid, id);
    send_packet(stack, id, &dhcp_repr, Ipv4Address::BROADCAST)
}

/// Sends a REQUEST for the leased address, unicast to the leasing server when
/// renewing and broadcast when rebinding.
fn send_renewal(stack: &mut Stack, id: InterfaceId, broadcast: bool) -> Result<()> {
    let interface = stack.interfaces.get(id)?;
    let lease = interface.dhcp.lease().ok_or(Error::Ignored)?;

    let mut dhcp_repr = DhcpRepr::client(
        DhcpMessageType::Request,
        interface.dhcp.xid(),
        interface.ethernet_addr(),
    );
    dhcp_repr.client_addr = lease.addr;

    let dst_addr = if broadcast {
        Ipv4Address::BROADCAST
    } else {
        lease.server_identifier
    };

    debug!("Sending DHCP request to {} on {}.", dst_addr, id);
    send_packet(stack, id, &dhcp_repr, dst_addr)
}

fn send_packet(stack: &mut Stack, id: InterfaceId, dhcp_repr: &DhcpRepr, dst_addr: Ipv4Address) -> Result<()> {
    let mut payload = vec![0; dhcp_repr.buffer_len()];
    dhcp_repr.serialize(&mut payload)?;

    udp::send_packet(
        stack,
        id,
        dhcp::CLIENT_PORT,
        SocketAddr::new(dst_addr, dhcp::SERVER_PORT),
        &payload,
        None,
    )
}

/// Receives a DHCP message from a server.
pub fn recv_packet(stack: &mut Stack, id: InterfaceId, payload: &[u8]) -> Result<()> {
    let dhcp_repr = DhcpRepr::deserialize(payload)?;
    let interface = stack.interfaces.get(id)?;

    if dhcp_repr.op != DhcpOp::Reply || dhcp_repr.client_hw_addr != interface.ethernet_addr() {
        return Err(Error::Ignored);
    }

    if dhcp_repr.xid != interface.dhcp.xid() {
        debug!(
            "Ignoring DHCP {:?} with xid {:#010x}, expected {:#010x}.",
            dhcp_repr.message_type,
            dhcp_repr.xid,
            interface.dhcp.xid()
        );
        return Err(Error::Ignored);
    }

    match (interface.dhcp.state(), dhcp_repr.message_type) {
        (DhcpState::Selecting, DhcpMessageType::Offer) => {
            let offer = Lease::from_repr(&dhcp_repr).ok_or(Error::Malformed)?;
            select(stack, id, offer)
        }
        (DhcpState::Requesting, DhcpMessageType::Ack)
        | (DhcpState::Renewing, DhcpMessageType::Ack)
        | (DhcpState::Rebinding, DhcpMessageType::Ack) => {
            let lease = Lease::from_repr(&dhcp_repr).ok_or(Error::Malformed)?;
            bind(stack, id, lease)
        }
        (DhcpState::Requesting, DhcpMessageType::Nak)
        | (DhcpState::Renewing, DhcpMessageType::Nak)
        | (DhcpState::Rebinding, DhcpMessageType::Nak) => {
            info!("DHCP server refused the lease on {}.", id);
            stack.interfaces.get_mut(id)?.clear_ipv4_addr();
            start(stack, id)
        }
        (state, message_type) => {
            debug!("Ignoring DHCP {:?} in {:?} on {}.", message_type, state, id);
            Err(Error::Ignored)
        }
    }
}

/// Accepts an offer and broadcasts a REQUEST echoing its XID and address.
fn select(stack: &mut Stack, id: InterfaceId, offer: Lease) -> Result<()> {
    let interface = stack.interfaces.get_mut(id)?;
    interface.dhcp.select(offer);

    let mut dhcp_repr = DhcpRepr::client(
        DhcpMessageType::Request,
        interface.dhcp.xid(),
        interface.ethernet_addr(),
    );
    dhcp_repr.requested_addr = Some(offer.addr);
    dhcp_repr.server_identifier = Some(offer.server_identifier);

    let delay = stack.config.dhcp_retransmit_timeout;
    rearm(stack, id, &[(delay, DhcpTimeout::Retransmit)])?;

    debug!(
        "Requesting {} from {} on {}.",
        offer.addr, offer.server_identifier, id
    );
    send_packet(stack, id, &dhcp_repr, Ipv4Address::BROADCAST)
}

/// Commits a lease to the interface and arms the renewal, rebind and expiry
/// timers.
fn bind(stack: &mut Stack, id: InterfaceId, lease: Lease) -> Result<()> {
    let now = stack.now();
    let interface = stack.interfaces.get_mut(id)?;
    interface.set_ipv4_addr(lease.addr, lease.netmask, lease.gateway);
    interface.dhcp.bind(lease, now);

    info!(
        "{} bound to {}/{} for {}s.",
        id,
        lease.addr,
        lease.netmask,
        lease.duration.as_secs()
    );

    rearm(
        stack,
        id,
        &[
            (lease.renewal, DhcpTimeout::Renew),
            (lease.rebinding, DhcpTimeout::Rebind),
            (lease.duration, DhcpTimeout::Expire),
        ],
    )?;

    if stack.nbns_names.contains_key(&id) {
        if let Err(err) = nbns::announce(stack, id) {
            debug!("Error announcing NetBIOS name on {} with {:?}.", id, err);
        }
    }

    Ok(())
}
