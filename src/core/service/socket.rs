use core::buffer::PacketBuffer;
use core::interface::InterfaceId;
use core::repr::{
    Icmpv4Repr,
    Ipv4Address,
    Ipv4Packet,
    Ipv4Repr,
};
use core::service::{
    icmpv4,
    ipv4,
    udp,
    Stack,
};
use core::socket::icmp::Echo;
use core::socket::{
    SocketAddr,
    SocketHandle,
    TaggedSocket,
};
use {
    Error,
    Result,
};

/// A datagram taken off a socket's send queue.
enum Outbound {
    Raw {
        protocol: u8,
        dst_addr: Ipv4Address,
        payload: Vec<u8>,
    },
    Udp {
        src_port: u16,
        dst: SocketAddr,
        payload: Vec<u8>,
    },
    Icmp {
        ident: u16,
        echo: Echo,
    },
}

fn dequeue(socket: &mut TaggedSocket) -> Result<Outbound> {
    match *socket {
        TaggedSocket::Raw(ref mut socket) => {
            let protocol = socket.protocol();
            socket
                .send_dequeue()
                .map(|(dst_addr, payload)| Outbound::Raw {
                    protocol,
                    dst_addr,
                    payload,
                })
        }
        TaggedSocket::Udp(ref mut socket) => {
            let src_port = socket.port();
            socket
                .send_dequeue()
                .map(|(dst, payload)| Outbound::Udp {
                    src_port,
                    dst,
                    payload,
                })
        }
        TaggedSocket::Icmp(ref mut socket) => {
            let ident = socket.ident();
            socket
                .send_dequeue()
                .map(|echo| Outbound::Icmp { ident, echo })
        }
    }
}

fn send_outbound(stack: &mut Stack, handle: SocketHandle, outbound: Outbound) -> Result<()> {
    let dst_addr = match outbound {
        Outbound::Raw { dst_addr, .. } => dst_addr,
        Outbound::Udp { dst, .. } => dst.addr,
        Outbound::Icmp { ref echo, .. } => echo.addr,
    };
    let id = ipv4::route(stack, dst_addr).ok_or(Error::NoInterface)?;

    match outbound {
        Outbound::Raw {
            protocol,
            dst_addr,
            payload,
        } => {
            if payload.len() > u16::max_value() as usize - Ipv4Packet::<&[u8]>::MIN_HEADER_LEN {
                return Err(Error::CapacityExceeded);
            }

            let mut buffer = ipv4::packet_buffer(payload.len())?;
            buffer.push_payload(payload.len())?.copy_from_slice(&payload);
            buffer.set_sender(Some(handle));

            let ipv4_repr = Ipv4Repr {
                src_addr: stack.interfaces.get(id)?.ipv4_addr(),
                dst_addr,
                protocol,
                payload_len: payload.len() as u16,
                ttl: stack.config.ip_ttl,
            };
            ipv4::send_packet(stack, id, &ipv4_repr, buffer)
        }
        Outbound::Udp {
            src_port,
            dst,
            payload,
        } => udp::send_packet(stack, id, src_port, dst, &payload, Some(handle)),
        Outbound::Icmp { ident, echo } => icmpv4::send_packet(
            stack,
            id,
            echo.addr,
            &Icmpv4Repr::EchoRequest {
                id: ident,
                seq: echo.seq,
            },
            &echo.payload,
            Some(handle),
        ),
    }
}

/// Sends out any packets enqueued in the sockets.
///
/// Errors are recorded on the socket the packet came from.
pub fn send(stack: &mut Stack) {
    for handle in stack.sockets.handles() {
        loop {
            let outbound = match stack.sockets.socket(handle).map(dequeue) {
                Some(Ok(outbound)) => outbound,
                _ => break,
            };

            if let Err(err) = send_outbound(stack, handle, outbound) {
                debug!("Error sending packet with {:?}.", err);
                if let Some(socket) = stack.sockets.socket(handle) {
                    socket.set_error(err);
                }
            }
        }
    }
}

/// Reads frames from an interface and dispatches them through the stack.
pub fn recv(stack: &mut Stack, id: InterfaceId) {
    loop {
        let mut frame = match stack.interfaces.get(id) {
            Ok(interface) => vec![0; interface.max_transmission_unit()],
            Err(_) => return,
        };

        let received = match stack.interfaces.get_mut(id) {
            Ok(interface) => interface.receive(&mut frame),
            Err(_) => return,
        };

        match received {
            Ok(frame_len) => {
                frame.truncate(frame_len);
                if let Err(err) = stack.dispatch_inbound(id, PacketBuffer::from_frame(frame)) {
                    warn!("Error processing ethernet with {:?}", err);
                }
            }
            Err(Error::Exhausted) => break,
            Err(err) => {
                warn!("Error receiving ethernet with {:?}", err);
                break;
            }
        }
    }
}
