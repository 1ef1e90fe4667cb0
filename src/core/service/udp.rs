use core::buffer::{
    Layer,
    PacketBuffer,
};
use core::interface::InterfaceId;
use core::repr::{
    dhcp,
    ipv4_protocols,
    nbns,
    Ipv4Repr,
    UdpPacket,
    UdpRepr,
};
use core::service::{
    self,
    ipv4,
    Stack,
};
use core::socket::{
    SocketAddr,
    SocketHandle,
    TaggedSocket,
};
use {
    Error,
    Result,
};

/// Sends a UDP packet from the interface's address.
///
/// This function takes care of serializing a header, calculating a checksum,
/// etc. so the caller provides **only** the payload.
pub fn send_packet(
    stack: &mut Stack,
    id: InterfaceId,
    src_port: u16,
    dst: SocketAddr,
    payload: &[u8],
    sender: Option<SocketHandle>,
) -> Result<()> {
    let src_addr = stack.interfaces.get(id)?.ipv4_addr();
    let udp_packet_len = UdpPacket::<&[u8]>::buffer_len(payload.len());
    if udp_packet_len > u16::max_value() as usize {
        return Err(Error::CapacityExceeded);
    }

    let mut buffer = ipv4::packet_buffer(udp_packet_len)?;
    buffer.push_header(Layer::Transport, UdpPacket::<&[u8]>::HEADER_LEN)?;
    buffer.push_payload(payload.len())?.copy_from_slice(payload);
    buffer.set_sender(sender);

    let udp_repr = UdpRepr {
        src_port,
        dst_port: dst.port,
        length: udp_packet_len as u16,
    };

    {
        let udp_buffer = buffer.view_layer_mut(Layer::Transport).ok_or(Error::Layer)?;
        let mut udp_packet = UdpPacket::try_new(udp_buffer)?;
        // The payload is already in place so the checksum covers it.
        udp_repr.serialize(&mut udp_packet, src_addr, dst.addr);
    }

    let ipv4_repr = Ipv4Repr {
        src_addr,
        dst_addr: dst.addr,
        protocol: ipv4_protocols::UDP,
        payload_len: udp_packet_len as u16,
        ttl: stack.config.ip_ttl,
    };

    ipv4::send_packet(stack, id, &ipv4_repr, buffer)
}

/// Receives a UDP packet from an interface.
///
/// DHCP replies go to the interface's DHCP client, NBNS traffic to the name
/// responder and everything else to the socket bound to the destination
/// port. Datagrams without a consumer are dropped.
pub fn recv_packet(stack: &mut Stack, id: InterfaceId, ipv4_repr: &Ipv4Repr, buffer: PacketBuffer) -> Result<()> {
    let udp_packet = UdpPacket::try_new(buffer.payload())?;
    udp_packet.check_encoding(ipv4_repr.src_addr, ipv4_repr.dst_addr)?;

    let udp_repr = UdpRepr::deserialize(&udp_packet);

    match (udp_repr.src_port, udp_repr.dst_port) {
        (dhcp::SERVER_PORT, dhcp::CLIENT_PORT) => {
            return service::dhcp::recv_packet(stack, id, udp_packet.payload());
        }
        (_, nbns::PORT) if stack.nbns_names.contains_key(&id) => {
            return service::nbns::recv_packet(stack, id, ipv4_repr, udp_packet.payload());
        }
        _ => {}
    }

    let socket = stack.sockets.iter_mut().find_map(|socket| match *socket {
        TaggedSocket::Udp(ref mut socket) if socket.accepts(udp_repr.dst_port) => Some(socket),
        _ => None,
    });

    match socket {
        Some(socket) => {
            let src = SocketAddr::new(ipv4_repr.src_addr, udp_repr.src_port);
            if let Err(err) = socket.recv_enqueue(src, udp_packet.payload()) {
                debug!(
                    "Error enqueueing UDP packet for receiving via socket with {:?}.",
                    err
                );
                return Err(err);
            }
            Ok(())
        }
        None => {
            debug!(
                "Ignoring UDP packet for port {} from {}.",
                udp_repr.dst_port, ipv4_repr.src_addr
            );
            Err(Error::Ignored)
        }
    }
}
