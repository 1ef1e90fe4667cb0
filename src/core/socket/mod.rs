//! Communication between endpoints.
//!
//! The `socket` module provides abstractions for buffering, sending, and
//! receiving data between network endpoints.

pub mod icmp;
pub mod raw;
pub mod set;
pub mod tagged;
pub mod udp;

pub use self::icmp::IcmpSocket;
pub use self::raw::RawSocket;
pub use self::set::{
    SocketHandle,
    SocketSet,
};
pub use self::tagged::TaggedSocket;
pub use self::udp::UdpSocket;

use core::repr::Ipv4Address;

/// Address families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Inet,
    Inet6,
}

pub const PF_INET: Family = Family::Inet;

pub const PF_INET6: Family = Family::Inet6;

/// Socket types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketType {
    Stream,
    Datagram,
    Raw,
}

pub const SOCK_STREAM: SocketType = SocketType::Stream;

pub const SOCK_DGRAM: SocketType = SocketType::Datagram;

pub const SOCK_RAW: SocketType = SocketType::Raw;

/// An IPv4 address and port pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketAddr {
    pub addr: Ipv4Address,
    pub port: u16,
}

impl SocketAddr {
    pub fn new(addr: Ipv4Address, port: u16) -> SocketAddr {
        SocketAddr { addr, port }
    }
}

impl ::std::fmt::Display for SocketAddr {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}
