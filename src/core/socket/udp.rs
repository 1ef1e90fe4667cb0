use core::socket::SocketAddr;
use core::storage::Ring;
use {
    Error,
    Result,
};

/// A UDP socket bound to a local port.
#[derive(Debug)]
pub struct UdpSocket {
    port: u16,
    send_buffer: Ring<(SocketAddr, Vec<u8>)>,
    recv_buffer: Ring<(SocketAddr, Vec<u8>)>,
    error: Option<Error>,
}

impl UdpSocket {
    /// Creates a new UDP socket bound to port.
    pub fn new(port: u16, queue_capacity: usize) -> UdpSocket {
        UdpSocket {
            port,
            send_buffer: Ring::with_capacity(queue_capacity),
            recv_buffer: Ring::with_capacity(queue_capacity),
            error: None,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Checks if the socket is interested in receiving packets with the
    /// specified destination port.
    pub fn accepts(&self, dst_port: u16) -> bool {
        self.port == dst_port
    }

    /// Enqueues a payload for sending to the specified address.
    pub fn send(&mut self, payload: &[u8], addr: SocketAddr) -> Result<()> {
        self.send_buffer.enqueue((addr, payload.to_vec()))
    }

    /// Dequeues a received payload along with it's source address.
    pub fn recv(&mut self) -> Result<(Vec<u8>, SocketAddr)> {
        self.recv_buffer
            .dequeue()
            .map(|(addr, payload)| (payload, addr))
    }

    /// Dequeues a payload enqueued for sending.
    pub fn send_dequeue(&mut self) -> Result<(SocketAddr, Vec<u8>)> {
        self.send_buffer.dequeue()
    }

    /// Enqueues a packet for receiving.
    pub fn recv_enqueue(&mut self, src: SocketAddr, payload: &[u8]) -> Result<()> {
        self.recv_buffer.enqueue((src, payload.to_vec()))
    }

    /// Returns the number of packets enqueued for sending.
    pub fn send_enqueued(&self) -> usize {
        self.send_buffer.len()
    }

    /// Returns the number of packets enqueued for receiving.
    pub fn recv_enqueued(&self) -> usize {
        self.recv_buffer.len()
    }

    pub fn set_error(&mut self, error: Error) {
        self.error = Some(error);
    }

    /// Returns and clears the last asynchronous error.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}
