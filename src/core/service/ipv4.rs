use core::buffer::{
    Layer,
    PacketBuffer,
};
use core::interface::{
    InterfaceId,
    NextHop,
};
use core::registry::IpHandler;
use core::repr::{
    eth_types,
    ipv4_flags,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
    Ipv4Packet,
    Ipv4Repr,
};
use core::service::{
    arp,
    ethernet,
    icmpv4,
    udp,
    Stack,
};
use core::socket::TaggedSocket;
use {
    Error,
    Result,
};

/// Allocates a buffer with the Ethernet and IPv4 headers reserved, leaving
/// room for transport_len bytes after them.
pub fn packet_buffer(transport_len: usize) -> Result<PacketBuffer> {
    let ipv4_packet_len = Ipv4Packet::<&[u8]>::MIN_HEADER_LEN + transport_len;
    let mut buffer = PacketBuffer::allocate(EthernetFrame::<&[u8]>::buffer_len(ipv4_packet_len))?;
    buffer.push_header(Layer::Link, EthernetFrame::<&[u8]>::HEADER_LEN)?;
    buffer.push_header(Layer::Network, Ipv4Packet::<&[u8]>::MIN_HEADER_LEN)?;
    Ok(buffer)
}

/// Sends an IPv4 packet via the interface.
///
/// The buffer must come from packet_buffer() with the payload already
/// written. The header is serialized from ipv4_repr and the packet handed to
/// the link, through ARP unless it is a broadcast.
pub fn send_packet(stack: &mut Stack, id: InterfaceId, ipv4_repr: &Ipv4Repr, mut buffer: PacketBuffer) -> Result<()> {
    {
        let ipv4_buffer = buffer.view_layer_mut(Layer::Network).ok_or(Error::Layer)?;
        ipv4_repr.serialize(ipv4_buffer)?;
    }

    match stack.interfaces.get(id)?.next_hop(ipv4_repr.dst_addr) {
        NextHop::Broadcast => ethernet::send_frame(
            stack,
            id,
            EthernetAddress::BROADCAST,
            eth_types::IPV4,
            buffer,
        ),
        NextHop::Unicast(addr) => {
            debug!("{} will be routed through {}.", ipv4_repr.dst_addr, addr);
            arp::resolve(stack, id, addr, buffer)
        }
    }
}

/// Chooses the interface to send a datagram to the destination from: one
/// whose subnet holds it, else the first configured interface, else the
/// first interface.
pub fn route(stack: &Stack, dst_addr: Ipv4Address) -> Option<InterfaceId> {
    let on_link = stack.interfaces.iter().find(|interface| {
        interface.is_configured() && dst_addr.same_subnet(interface.ipv4_addr(), interface.netmask())
    });
    let configured = || stack.interfaces.iter().find(|interface| interface.is_configured());

    on_link
        .or_else(configured)
        .or_else(|| stack.interfaces.iter().next())
        .map(|interface| interface.id())
}

/// Receives an IPv4 packet from an interface.
///
/// The IPv4 header is consumed, the packet is copied to every raw socket and
/// then dispatched to the handler registered for its protocol.
pub fn recv_packet(
    stack: &mut Stack,
    id: InterfaceId,
    mut buffer: PacketBuffer,
    src_eth_addr: EthernetAddress,
) -> Result<()> {
    let (ipv4_repr, header_len, fragmented) = {
        let ipv4_packet = Ipv4Packet::try_new(buffer.payload())?;
        ipv4_packet.check_encoding()?;
        (
            Ipv4Repr::deserialize(&ipv4_packet),
            ipv4_packet.header_len() as usize,
            ipv4_packet.flags() & ipv4_flags::MORE_FRAGMENTS != 0 || ipv4_packet.fragment_offset() != 0,
        )
    };

    let interface = stack.interfaces.get(id)?;
    if !interface.accepts(ipv4_repr.dst_addr) {
        debug!(
            "Ignoring IPv4 packet with destination {}.",
            ipv4_repr.dst_addr
        );
        return Err(Error::Ignored);
    }

    if fragmented {
        debug!("Ignoring IPv4 fragment from {}.", ipv4_repr.src_addr);
        return Err(Error::Ignored);
    }

    if interface.is_configured() && !ipv4_repr.src_addr.is_unspecified()
        && ipv4_repr
            .src_addr
            .same_subnet(interface.ipv4_addr(), interface.netmask())
    {
        arp::update(stack, id, ipv4_repr.src_addr, src_eth_addr)?;
    }

    buffer.push_header(Layer::Network, header_len)?;
    buffer.truncate_payload(ipv4_repr.payload_len as usize);

    if let Some(ipv4_buffer) = buffer.view_layer(Layer::Network) {
        for socket in stack.sockets.iter_mut() {
            if let TaggedSocket::Raw(ref mut socket) = *socket {
                if let Err(err) = socket.recv_enqueue(ipv4_buffer) {
                    debug!(
                        "Error enqueueing IPv4 packet for receiving via socket with {:?}.",
                        err
                    );
                }
            }
        }
    }

    match stack.registry.ip_handler(ipv4_repr.protocol) {
        Some(IpHandler::Icmp) => icmpv4::recv_packet(stack, id, &ipv4_repr, buffer),
        Some(IpHandler::Udp) => udp::recv_packet(stack, id, &ipv4_repr, buffer),
        None => {
            debug!("Ignoring IPv4 packet with protocol {}.", ipv4_repr.protocol);
            Err(Error::Ignored)
        }
    }
}
