//! Shared harness for the stack tests: a stack over an in-memory device with
//! a mock clock, plus helpers for crafting and parsing frames on the "wire".

#![allow(dead_code)]

use std::time::Duration;

use kernet::core::buffer::PacketBuffer;
use kernet::core::config::StackConfig;
use kernet::core::dev::MemoryDevice;
use kernet::core::interface::InterfaceId;
use kernet::core::repr::{
    eth_types,
    ipv4_protocols,
    Arp,
    ArpOp,
    DhcpMessageType,
    DhcpOp,
    DhcpRepr,
    EthernetAddress,
    EthernetFrame,
    Icmpv4Packet,
    Icmpv4Repr,
    Ipv4Address,
    Ipv4Packet,
    Ipv4Repr,
    UdpPacket,
    UdpRepr,
};
use kernet::core::service::Stack;
use kernet::core::socket::SocketAddr;
use kernet::core::time::{
    Env,
    MockEnv,
};
use kernet::core::timer::TimerQueue;

lazy_static! {
    pub static ref STACK_MAC: EthernetAddress =
        EthernetAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x05]);
    pub static ref STACK_IP: Ipv4Address = Ipv4Address::new([10, 0, 0, 5]);
    pub static ref NETMASK: Ipv4Address = Ipv4Address::new([255, 255, 255, 0]);
    pub static ref GATEWAY_IP: Ipv4Address = Ipv4Address::new([10, 0, 0, 1]);
    pub static ref PEER_MAC: EthernetAddress =
        EthernetAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    pub static ref PEER_IP: Ipv4Address = Ipv4Address::new([10, 0, 0, 1]);
}

/// A stack with one attached, unconfigured interface.
pub struct Context {
    pub stack: Stack,
    pub dev: MemoryDevice,
    pub env: MockEnv,
    pub timers: TimerQueue,
    pub id: InterfaceId,
}

impl Context {
    pub fn new() -> Context {
        Context::with_config(StackConfig::default())
    }

    pub fn with_config(config: StackConfig) -> Context {
        Context::with_tx_capacity(config, 256)
    }

    /// A stack over a device that holds at most tx_capacity frames the test
    /// has not taken yet.
    pub fn with_tx_capacity(config: StackConfig, tx_capacity: usize) -> Context {
        let _ = env_logger::try_init();

        let env = MockEnv::new();
        let timers = TimerQueue::new(env.clone());
        let dev = MemoryDevice::new(*STACK_MAC, tx_capacity);

        let mut stack = Stack::new(config, env.clone(), timers.clone());
        let id = stack.attach(Box::new(dev.clone()));

        Context {
            stack,
            dev,
            env,
            timers,
            id,
        }
    }

    /// A stack whose interface is statically configured as 10.0.0.5/24 behind
    /// the gateway 10.0.0.1.
    pub fn configured() -> Context {
        let mut context = Context::new();
        context.configure();
        context
    }

    pub fn configure(&mut self) {
        self.stack
            .set_ipv4_addr(self.id, *STACK_IP, *NETMASK, Some(*GATEWAY_IP))
            .unwrap();
    }

    /// Puts a frame on the wire and lets the stack process it.
    pub fn recv(&mut self, frame: Vec<u8>) {
        self.stack
            .dispatch_inbound(self.id, PacketBuffer::from_frame(frame))
            .unwrap();
    }

    /// Takes every frame the stack has transmitted.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.dev.take_sent()
    }

    /// Advances the clock and fires every timer that expired on the way, in
    /// deadline order.
    pub fn advance(&mut self, duration: Duration) {
        let step = Duration::from_millis(100);
        let mut elapsed = Duration::from_secs(0);

        while elapsed < duration {
            let delta = if duration - elapsed < step {
                duration - elapsed
            } else {
                step
            };
            self.env.advance(delta);
            elapsed += delta;
            self.fire();
        }
    }

    /// Fires every timer whose deadline has passed, including timers armed
    /// by the handlers with no delay.
    pub fn fire(&mut self) {
        loop {
            let expired = self.timers.expired(self.env.now_instant());
            if expired.is_empty() {
                break;
            }
            for event in expired {
                self.stack.on_timer(event).unwrap();
            }
        }
    }
}

pub fn eth_frame(dst_addr: EthernetAddress, src_addr: EthernetAddress, payload_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0; EthernetFrame::<&[u8]>::buffer_len(payload.len())];
    {
        let mut frame = EthernetFrame::try_new(&mut buffer[..]).unwrap();
        frame.set_dst_addr(dst_addr);
        frame.set_src_addr(src_addr);
        frame.set_payload_type(payload_type);
        frame.payload_mut().copy_from_slice(payload);
    }
    buffer
}

pub fn arp_frame(arp: &Arp, dst_addr: EthernetAddress) -> Vec<u8> {
    let mut payload = vec![0; arp.buffer_len()];
    arp.serialize(&mut payload).unwrap();
    eth_frame(dst_addr, arp.source_hw_addr, eth_types::ARP, &payload)
}

/// An ARP reply from the peer claiming ip_addr.
pub fn arp_reply(ip_addr: Ipv4Address, eth_addr: EthernetAddress) -> Vec<u8> {
    let arp = Arp {
        op: ArpOp::Reply,
        source_hw_addr: eth_addr,
        source_proto_addr: ip_addr,
        target_hw_addr: *STACK_MAC,
        target_proto_addr: *STACK_IP,
    };
    arp_frame(&arp, *STACK_MAC)
}

pub fn ipv4_frame(
    dst_mac: EthernetAddress,
    src_mac: EthernetAddress,
    src_addr: Ipv4Address,
    dst_addr: Ipv4Address,
    protocol: u8,
    payload: &[u8],
) -> Vec<u8> {
    let ipv4_repr = Ipv4Repr {
        src_addr,
        dst_addr,
        protocol,
        payload_len: payload.len() as u16,
        ttl: 64,
    };
    let mut buffer = vec![0; ipv4_repr.buffer_len()];
    ipv4_repr.serialize(&mut buffer).unwrap();
    buffer[Ipv4Packet::<&[u8]>::MIN_HEADER_LEN ..].copy_from_slice(payload);
    eth_frame(dst_mac, src_mac, eth_types::IPV4, &buffer)
}

pub fn udp_payload(src: SocketAddr, dst: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0; UdpPacket::<&[u8]>::buffer_len(payload.len())];
    {
        let mut packet = UdpPacket::try_new(&mut buffer[..]).unwrap();
        packet.payload_mut().copy_from_slice(payload);
        UdpRepr {
            src_port: src.port,
            dst_port: dst.port,
            length: buffer_len(payload.len()),
        }.serialize(&mut packet, src.addr, dst.addr);
    }
    buffer
}

fn buffer_len(payload_len: usize) -> u16 {
    UdpPacket::<&[u8]>::buffer_len(payload_len) as u16
}

pub fn udp_frame(dst_mac: EthernetAddress, src_mac: EthernetAddress, src: SocketAddr, dst: SocketAddr, payload: &[u8]) -> Vec<u8> {
    ipv4_frame(
        dst_mac,
        src_mac,
        src.addr,
        dst.addr,
        ipv4_protocols::UDP,
        &udp_payload(src, dst, payload),
    )
}

pub fn icmp_payload(icmp_repr: &Icmpv4Repr, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0; Icmpv4Packet::<&[u8]>::buffer_len(payload.len())];
    {
        let mut packet = Icmpv4Packet::try_new(&mut buffer[..]).unwrap();
        icmp_repr.serialize(&mut packet);
        packet.payload_mut().copy_from_slice(payload);
        packet.fill_checksum();
    }
    buffer
}

/// A reply from the DHCP server at the peer's address.
pub fn dhcp_reply(message_type: DhcpMessageType, xid: u32, your_addr: Ipv4Address, lease_secs: u32) -> Vec<u8> {
    let mut dhcp_repr = DhcpRepr::client(message_type, xid, *STACK_MAC);
    dhcp_repr.op = DhcpOp::Reply;
    dhcp_repr.your_addr = your_addr;
    dhcp_repr.server_identifier = Some(*PEER_IP);
    dhcp_repr.subnet_mask = Some(*NETMASK);
    dhcp_repr.router = Some(*GATEWAY_IP);
    dhcp_repr.lease_duration = Some(lease_secs);

    let mut payload = vec![0; dhcp_repr.buffer_len()];
    dhcp_repr.serialize(&mut payload).unwrap();

    udp_frame(
        EthernetAddress::BROADCAST,
        *PEER_MAC,
        SocketAddr::new(*PEER_IP, 67),
        SocketAddr::new(Ipv4Address::BROADCAST, 68),
        &payload,
    )
}

/// Parses a transmitted frame as ARP.
pub fn parse_arp(frame: &[u8]) -> Option<(EthernetAddress, Arp)> {
    let eth_frame = EthernetFrame::try_new(frame).ok()?;
    if eth_frame.payload_type() != eth_types::ARP {
        return None;
    }
    Some((eth_frame.dst_addr(), Arp::deserialize(eth_frame.payload()).ok()?))
}

/// Parses a transmitted frame as IPv4, returning the destination MAC, the
/// header and the IPv4 payload.
pub fn parse_ipv4(frame: &[u8]) -> Option<(EthernetAddress, Ipv4Repr, Vec<u8>)> {
    let eth_frame = EthernetFrame::try_new(frame).ok()?;
    if eth_frame.payload_type() != eth_types::IPV4 {
        return None;
    }
    let packet = Ipv4Packet::try_new(eth_frame.payload()).ok()?;
    packet.check_encoding().ok()?;
    let ipv4_repr = Ipv4Repr::deserialize(&packet);
    let header_len = packet.header_len() as usize;
    let payload = eth_frame.payload()[header_len .. header_len + ipv4_repr.payload_len as usize].to_vec();
    Some((eth_frame.dst_addr(), ipv4_repr, payload))
}

/// Parses a transmitted frame as UDP, verifying its checksum.
pub fn parse_udp(frame: &[u8]) -> Option<(Ipv4Repr, UdpRepr, Vec<u8>)> {
    let (_, ipv4_repr, payload) = parse_ipv4(frame)?;
    if ipv4_repr.protocol != ipv4_protocols::UDP {
        return None;
    }
    let packet = UdpPacket::try_new(&payload[..]).ok()?;
    packet
        .check_encoding(ipv4_repr.src_addr, ipv4_repr.dst_addr)
        .ok()?;
    Some((ipv4_repr, UdpRepr::deserialize(&packet), packet.payload().to_vec()))
}

/// Parses a transmitted frame as a DHCP message.
pub fn parse_dhcp(frame: &[u8]) -> Option<(Ipv4Repr, DhcpRepr)> {
    let (ipv4_repr, udp_repr, payload) = parse_udp(frame)?;
    if udp_repr.dst_port != 67 {
        return None;
    }
    Some((ipv4_repr, DhcpRepr::deserialize(&payload).ok()?))
}
