use core::buffer::{
    Layer,
    PacketBuffer,
};
use core::interface::InterfaceId;
use core::repr::{
    ipv4_protocols,
    Icmpv4Packet,
    Icmpv4Repr,
    Ipv4Address,
    Ipv4Repr,
};
use core::service::{
    ipv4,
    Stack,
};
use core::socket::icmp::Echo;
use core::socket::{
    SocketHandle,
    TaggedSocket,
};
use {
    Error,
    Result,
};

/// Send an ICMP packet via the interface.
///
/// The checksum is computed over the header and payload once both are
/// written.
pub fn send_packet(
    stack: &mut Stack,
    id: InterfaceId,
    dst_addr: Ipv4Address,
    icmp_repr: &Icmpv4Repr,
    payload: &[u8],
    sender: Option<SocketHandle>,
) -> Result<()> {
    let icmp_packet_len = Icmpv4Packet::<&[u8]>::buffer_len(payload.len());
    let mut buffer = ipv4::packet_buffer(icmp_packet_len)?;
    buffer.push_header(Layer::Transport, Icmpv4Packet::<&[u8]>::HEADER_LEN)?;
    buffer.push_payload(payload.len())?.copy_from_slice(payload);
    buffer.set_sender(sender);

    {
        let icmp_buffer = buffer.view_layer_mut(Layer::Transport).ok_or(Error::Layer)?;
        let mut icmp_packet = Icmpv4Packet::try_new(icmp_buffer)?;
        icmp_repr.serialize(&mut icmp_packet);
        icmp_packet.fill_checksum();
    }

    let ipv4_repr = Ipv4Repr {
        src_addr: stack.interfaces.get(id)?.ipv4_addr(),
        dst_addr,
        protocol: ipv4_protocols::ICMP,
        payload_len: icmp_packet_len as u16,
        ttl: stack.config.ip_ttl,
    };

    ipv4::send_packet(stack, id, &ipv4_repr, buffer)
}

/// Receives an ICMP packet from an interface.
///
/// Echo requests are answered, echo replies delivered to the ICMP socket with
/// the matching identifier. Corrupted packets and other types are dropped.
pub fn recv_packet(stack: &mut Stack, id: InterfaceId, ipv4_repr: &Ipv4Repr, buffer: PacketBuffer) -> Result<()> {
    let icmp_recv_packet = Icmpv4Packet::try_new(buffer.payload())?;
    icmp_recv_packet.check_encoding()?;

    let icmp_recv_repr = match Icmpv4Repr::deserialize(&icmp_recv_packet) {
        Ok(icmp_repr) => icmp_repr,
        Err(err) => {
            debug!(
                "Ignoring ICMP packet with type {} from {}.",
                icmp_recv_packet._type(),
                ipv4_repr.src_addr
            );
            return Err(err);
        }
    };

    match icmp_recv_repr {
        Icmpv4Repr::EchoRequest { id: ident, seq } => {
            if !stack.interfaces.get(id)?.is_configured() {
                return Err(Error::Ignored);
            }

            debug!(
                "Got a ping from {}; Sending response...",
                ipv4_repr.src_addr
            );
            let icmp_send_repr = Icmpv4Repr::EchoReply { id: ident, seq };
            send_packet(
                stack,
                id,
                ipv4_repr.src_addr,
                &icmp_send_repr,
                icmp_recv_packet.payload(),
                None,
            )
        }
        Icmpv4Repr::EchoReply { id: ident, seq } => {
            let socket = stack.sockets.iter_mut().find_map(|socket| match *socket {
                TaggedSocket::Icmp(ref mut socket) if socket.accepts(ident) => Some(socket),
                _ => None,
            });

            match socket {
                Some(socket) => socket.recv_enqueue(Echo {
                    addr: ipv4_repr.src_addr,
                    seq,
                    payload: icmp_recv_packet.payload().to_vec(),
                }),
                None => {
                    debug!("Ignoring ICMP echo reply with identifier {}.", ident);
                    Err(Error::Ignored)
                }
            }
        }
    }
}
