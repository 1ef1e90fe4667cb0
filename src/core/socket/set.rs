use std::iter::Iterator;

use core::socket::TaggedSocket;

/// Integral handle of a socket in a SocketSet.
pub type SocketHandle = usize;

/// A set of sockets with integral handles...
#[derive(Debug, Default)]
pub struct SocketSet {
    sockets: Vec<Option<TaggedSocket>>,
}

impl SocketSet {
    /// Creates an empty socket set.
    pub fn new() -> SocketSet {
        SocketSet {
            sockets: Vec::new(),
        }
    }

    /// Adds a socket and returns a stable handle.
    pub fn add_socket(&mut self, socket: TaggedSocket) -> SocketHandle {
        match self.sockets.iter().position(|socket| socket.is_none()) {
            Some(i) => {
                self.sockets[i] = Some(socket);
                i
            }
            None => {
                self.sockets.push(Some(socket));
                self.sockets.len() - 1
            }
        }
    }

    /// Removes a socket, freeing its handle for reuse.
    pub fn remove_socket(&mut self, socket_handle: SocketHandle) -> Option<TaggedSocket> {
        self.sockets
            .get_mut(socket_handle)
            .and_then(|socket| socket.take())
    }

    /// Returns a reference to a socket with the specified handle, if in use.
    pub fn socket(&mut self, socket_handle: SocketHandle) -> Option<&mut TaggedSocket> {
        match self.sockets.get_mut(socket_handle) {
            Some(Some(socket)) => Some(socket),
            _ => None,
        }
    }

    /// Checks if a UDP socket is bound to the port.
    pub fn udp_port_in_use(&self, port: u16) -> bool {
        self.sockets.iter().any(|socket| match *socket {
            Some(TaggedSocket::Udp(ref socket)) => socket.port() == port,
            _ => false,
        })
    }

    /// Returns the handles of every socket in the set.
    pub fn handles(&self) -> Vec<SocketHandle> {
        (0 .. self.sockets.len())
            .filter(|i| self.sockets[*i].is_some())
            .collect()
    }

    /// Returns an iterator over all of the sockets in the set.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TaggedSocket> {
        self.sockets.iter_mut().filter_map(|socket| socket.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::socket::{
        RawSocket,
        UdpSocket,
    };

    #[test]
    fn test_handles_reused() {
        let mut set = SocketSet::new();
        let a = set.add_socket(TaggedSocket::Raw(RawSocket::new(1, 1)));
        let b = set.add_socket(TaggedSocket::Udp(UdpSocket::new(50000, 1)));
        assert_ne!(a, b);
        assert!(set.udp_port_in_use(50000));

        set.remove_socket(a).unwrap();
        assert!(set.socket(a).is_none());
        assert_eq!(set.handles(), vec![b]);
        assert_eq!(set.add_socket(TaggedSocket::Raw(RawSocket::new(1, 1))), a);
        assert_eq!(set.iter_mut().count(), 2);
    }
}
