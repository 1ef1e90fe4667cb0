//! Network stack for a small kernel: Ethernet, ARP, IPv4, ICMP, UDP, a DHCP
//! client and an NBNS responder over a pluggable device and timer facility.

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate byteorder;
extern crate libc;
#[macro_use]
extern crate log;
extern crate rand;

pub mod core;

#[cfg(target_os = "linux")]
pub mod linux;

use core::repr::Ipv4Address;

#[derive(Debug)]
pub enum Error {
    /// Indicates a packet buffer could not hold a header or payload.
    CapacityExceeded,
    /// Indicates an error where a buffer, queue, cache, etc. is full or empty.
    Exhausted,
    /// Indicates the device transmit queue is full.
    TransmitBusy,
    /// Indicates an IPv4 address could not be resolved to an Ethernet address.
    ResolutionFailed(Ipv4Address),
    /// Indicates no provider exists for a socket family, type and protocol.
    UnsupportedSocketType,
    /// Indicates an error where a packet or frame is malformed.
    Malformed,
    /// Indicates an error where a checksum is invalid.
    Checksum,
    /// Indicates a well formed packet which was not addressed to or handled
    /// by the stack.
    Ignored,
    /// Indicates a header was pushed out of layer order.
    Layer,
    /// Indicates an interface handle which is not attached.
    NoInterface,
    /// Indicates a generic IO error.
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
