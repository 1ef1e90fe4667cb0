use core::arp_cache::{
    Lookup,
    Removed,
    Retry,
};
use core::buffer::{
    Layer,
    PacketBuffer,
};
use core::interface::InterfaceId;
use core::repr::{
    eth_types,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};
use core::service::{
    ethernet,
    Stack,
};
use core::socket::SocketHandle;
use core::timer::TimerEvent;
use {
    Error,
    Result,
};

/// Sends an ARP packet via an interface.
pub fn send_packet(stack: &mut Stack, id: InterfaceId, arp_repr: &Arp, dst_addr: EthernetAddress) -> Result<()> {
    let mut buffer = PacketBuffer::allocate(EthernetFrame::<&[u8]>::buffer_len(
        arp_repr.buffer_len(),
    ))?;
    buffer.push_header(Layer::Link, EthernetFrame::<&[u8]>::HEADER_LEN)?;
    arp_repr.serialize(buffer.push_header(Layer::Network, arp_repr.buffer_len())?)?;

    ethernet::send_frame(stack, id, dst_addr, eth_types::ARP, buffer)
}

fn send_request(stack: &mut Stack, id: InterfaceId, ipv4_addr: Ipv4Address) -> Result<()> {
    let interface = stack.interfaces.get(id)?;
    let arp_repr = Arp {
        op: ArpOp::Request,
        source_hw_addr: interface.ethernet_addr(),
        source_proto_addr: interface.ipv4_addr(),
        target_hw_addr: EthernetAddress::UNSPECIFIED,
        target_proto_addr: ipv4_addr,
    };

    debug!("Sending ARP request for {} on {}.", ipv4_addr, id);
    send_packet(stack, id, &arp_repr, EthernetAddress::BROADCAST)
}

fn arm_retry(stack: &mut Stack, id: InterfaceId, ipv4_addr: Ipv4Address) -> Result<()> {
    let delay = stack.config.arp_retry_interval;
    let handle = stack.timer.arm(
        delay,
        TimerEvent::ArpRetry {
            interface: id,
            addr: ipv4_addr,
        },
    );
    stack
        .interfaces
        .get_mut(id)?
        .arp_cache
        .set_timer(ipv4_addr, handle);
    Ok(())
}

/// Transmits an IPv4 packet to a next hop on the link.
///
/// The packet is sent immediately if the Ethernet address of the next hop is
/// known. Otherwise it is queued until an ARP reply arrives, sending a request
/// and arming a retry timer if none is outstanding.
pub fn resolve(stack: &mut Stack, id: InterfaceId, ipv4_addr: Ipv4Address, buffer: PacketBuffer) -> Result<()> {
    let now = stack.now();
    let interface = stack.interfaces.get_mut(id)?;

    match interface.arp_cache.lookup(ipv4_addr, now) {
        Lookup::Resolved(eth_addr) => ethernet::send_frame(stack, id, eth_addr, eth_types::IPV4, buffer),
        Lookup::Pending => {
            if let Some(dropped) = interface.arp_cache.enqueue(ipv4_addr, buffer) {
                debug!("Dropping packet queued for {}, queue is full.", ipv4_addr);
                notify(stack, dropped.sender(), Error::Exhausted);
            }
            Ok(())
        }
        Lookup::Miss => {
            if let Some(removed) = interface.arp_cache.begin_resolution(ipv4_addr, now) {
                discard(stack, removed);
            }
            let interface = stack.interfaces.get_mut(id)?;
            if let Some(dropped) = interface.arp_cache.enqueue(ipv4_addr, buffer) {
                debug!("Dropping packet queued for {}, queue is full.", ipv4_addr);
                notify(stack, dropped.sender(), Error::Exhausted);
            }

            arm_retry(stack, id, ipv4_addr)?;

            // A failed request is covered by the retry timer.
            if let Err(err) = send_request(stack, id, ipv4_addr) {
                debug!("Error sending ARP request for {} with {:?}.", ipv4_addr, err);
            }
            Ok(())
        }
    }
}

/// Drops an evicted entry along with its queued packets.
fn discard(stack: &mut Stack, removed: Removed) {
    if let Some(handle) = removed.timer {
        stack.timer.cancel(handle);
    }
    for buffer in removed.pending {
        notify(stack, buffer.sender(), Error::ResolutionFailed(removed.addr));
    }
}

/// Reports a packet that will never be sent to the socket that sent it, if
/// any.
fn notify(stack: &mut Stack, sender: Option<SocketHandle>, err: Error) {
    match sender.and_then(|handle| stack.sockets.socket(handle)) {
        Some(socket) => socket.set_error(err),
        None => debug!("Discarding packet with {:?}.", err),
    }
}

/// Reacts to the retry timer of a pending entry firing, either sending
/// another request or giving up on the address.
pub fn retry(stack: &mut Stack, id: InterfaceId, ipv4_addr: Ipv4Address) -> Result<()> {
    let (now, max_retries) = (stack.now(), stack.config.arp_max_retries);
    let interface = stack.interfaces.get_mut(id)?;

    match interface.arp_cache.retry(ipv4_addr, now, max_retries) {
        Retry::Again => {
            arm_retry(stack, id, ipv4_addr)?;
            if let Err(err) = send_request(stack, id, ipv4_addr) {
                debug!("Error sending ARP request for {} with {:?}.", ipv4_addr, err);
            }
            Ok(())
        }
        Retry::Exhausted(pending) => {
            debug!(
                "Resolving {} on {} failed, discarding {} packets.",
                ipv4_addr,
                id,
                pending.len()
            );
            for buffer in pending {
                notify(stack, buffer.sender(), Error::ResolutionFailed(ipv4_addr));
            }
            Ok(())
        }
        Retry::Stale => Ok(()),
    }
}

/// Records a mapping for an address already in the cache, flushing packets
/// waiting on it in the order they were queued. Returns false for addresses
/// not in the cache, which are not added.
pub fn update(stack: &mut Stack, id: InterfaceId, ipv4_addr: Ipv4Address, eth_addr: EthernetAddress) -> Result<bool> {
    let now = stack.now();
    let interface = stack.interfaces.get_mut(id)?;

    let (pending, timer) = match interface.arp_cache.resolve(ipv4_addr, eth_addr, now) {
        Some(resolved) => resolved,
        None => return Ok(false),
    };

    if let Some(handle) = timer {
        stack.timer.cancel(handle);
    }

    if !pending.is_empty() {
        debug!(
            "Resolved {} to {}, flushing {} packets.",
            ipv4_addr,
            eth_addr,
            pending.len()
        );
    }

    // Flushing does not retry; a failed send is reported to the sender.
    for buffer in pending {
        let sender = buffer.sender();
        if let Err(err) = ethernet::send_frame(stack, id, eth_addr, eth_types::IPV4, buffer) {
            debug!("Error flushing packet for {} with {:?}.", ipv4_addr, err);
            notify(stack, sender, err);
        }
    }

    Ok(true)
}

/// Receives an ARP packet from an interface.
pub fn recv_packet(stack: &mut Stack, id: InterfaceId, buffer: &PacketBuffer) -> Result<()> {
    let arp_repr = Arp::deserialize(buffer.payload())?;

    match arp_repr.op {
        ArpOp::Request => handle_request(stack, id, &arp_repr),
        ArpOp::Reply => handle_reply(stack, id, &arp_repr),
    }
}

/// Answers requests for the interface's address without touching the cache.
pub fn handle_request(stack: &mut Stack, id: InterfaceId, arp_repr: &Arp) -> Result<()> {
    let interface = stack.interfaces.get(id)?;

    if !interface.is_configured() || arp_repr.target_proto_addr != interface.ipv4_addr() {
        debug!(
            "Ignoring ARP request for {}.",
            arp_repr.target_proto_addr
        );
        return Err(Error::Ignored);
    }

    let arp_reply = Arp {
        op: ArpOp::Reply,
        source_hw_addr: interface.ethernet_addr(),
        source_proto_addr: interface.ipv4_addr(),
        target_hw_addr: arp_repr.source_hw_addr,
        target_proto_addr: arp_repr.source_proto_addr,
    };

    debug!(
        "Sending ARP reply to {}/{}.",
        arp_reply.target_proto_addr, arp_reply.target_hw_addr
    );
    send_packet(stack, id, &arp_reply, arp_reply.target_hw_addr)
}

/// Completes resolution of an address with a cache entry.
pub fn handle_reply(stack: &mut Stack, id: InterfaceId, arp_repr: &Arp) -> Result<()> {
    if update(stack, id, arp_repr.source_proto_addr, arp_repr.source_hw_addr)? {
        Ok(())
    } else {
        debug!(
            "Ignoring unsolicited ARP reply from {}.",
            arp_repr.source_proto_addr
        );
        Err(Error::Ignored)
    }
}
