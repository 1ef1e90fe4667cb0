use core::socket::{
    IcmpSocket,
    RawSocket,
    UdpSocket,
};
use Error;

/// One of many types of sockets.
#[derive(Debug)]
pub enum TaggedSocket {
    Raw(RawSocket),
    Udp(UdpSocket),
    Icmp(IcmpSocket),
}

impl TaggedSocket {
    /// Records an asynchronous error, such as a failed address resolution.
    pub fn set_error(&mut self, error: Error) {
        match *self {
            TaggedSocket::Raw(ref mut socket) => socket.set_error(error),
            TaggedSocket::Udp(ref mut socket) => socket.set_error(error),
            TaggedSocket::Icmp(ref mut socket) => socket.set_error(error),
        }
    }

    /// Returns and clears the last asynchronous error.
    pub fn take_error(&mut self) -> Option<Error> {
        match *self {
            TaggedSocket::Raw(ref mut socket) => socket.take_error(),
            TaggedSocket::Udp(ref mut socket) => socket.take_error(),
            TaggedSocket::Icmp(ref mut socket) => socket.take_error(),
        }
    }

    /// Returns a reference to the underlying raw socket.
    ///
    /// # Panics
    ///
    /// Panics if the underlying socket is not a raw socket.
    pub fn as_raw_socket(&mut self) -> &mut RawSocket {
        match *self {
            TaggedSocket::Raw(ref mut socket) => socket,
            _ => panic!("Not a raw socket!"),
        }
    }

    /// Returns a reference to the underlying UDP socket.
    ///
    /// # Panics
    ///
    /// Panics if the underlying socket is not a UDP socket.
    pub fn as_udp_socket(&mut self) -> &mut UdpSocket {
        match *self {
            TaggedSocket::Udp(ref mut socket) => socket,
            _ => panic!("Not a UDP socket!"),
        }
    }

    /// Returns a reference to the underlying ICMP socket.
    ///
    /// # Panics
    ///
    /// Panics if the underlying socket is not an ICMP socket.
    pub fn as_icmp_socket(&mut self) -> &mut IcmpSocket {
        match *self {
            TaggedSocket::Icmp(ref mut socket) => socket,
            _ => panic!("Not an ICMP socket!"),
        }
    }
}
