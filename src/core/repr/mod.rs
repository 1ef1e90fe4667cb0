//! Serialization and deserialization of network packets.
//!
//! The `repr` module provides abstractions for serialization and deserializing
//! packets and frames at different network layers to/from byte buffers.

pub mod arp;
pub mod dhcp;
pub mod ethernet;
pub mod icmpv4;
pub mod ipv4;
pub mod nbns;
pub mod udp;

pub use self::arp::{
    hw_types as arp_hw_types,
    proto_types as arp_proto_types,
    Arp,
    Op as ArpOp,
};
pub use self::dhcp::{
    MessageType as DhcpMessageType,
    Op as DhcpOp,
    Repr as DhcpRepr,
};
pub use self::ethernet::{
    eth_types,
    Address as EthernetAddress,
    Frame as EthernetFrame,
};
pub use self::icmpv4::{
    types as icmpv4_types,
    Packet as Icmpv4Packet,
    Repr as Icmpv4Repr,
};
pub use self::ipv4::{
    flags as ipv4_flags,
    protocols as ipv4_protocols,
    Address as Ipv4Address,
    Packet as Ipv4Packet,
    Repr as Ipv4Repr,
};
pub use self::nbns::{
    Name as NbnsName,
    Repr as NbnsRepr,
};
pub use self::udp::{
    Packet as UdpPacket,
    Repr as UdpRepr,
};
