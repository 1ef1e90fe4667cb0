use core::repr::Ipv4Address;
use core::storage::Ring;
use {
    Error,
    Result,
};

/// Socket for sending and receiving raw IPv4 datagrams.
///
/// Every inbound datagram is delivered to every raw socket, whatever its
/// protocol. Outbound payloads are wrapped in an IPv4 header carrying the
/// socket's protocol number.
#[derive(Debug)]
pub struct RawSocket {
    protocol: u8,
    send_buffer: Ring<(Ipv4Address, Vec<u8>)>,
    recv_buffer: Ring<Vec<u8>>,
    error: Option<Error>,
}

impl RawSocket {
    /// Creates a socket with send and receive queues of the specified depth.
    pub fn new(protocol: u8, queue_capacity: usize) -> RawSocket {
        RawSocket {
            protocol,
            send_buffer: Ring::with_capacity(queue_capacity),
            recv_buffer: Ring::with_capacity(queue_capacity),
            error: None,
        }
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    /// Enqueues a payload for sending to the specified address.
    ///
    /// # Errors
    ///
    /// An error occurs if the send buffer is full.
    pub fn send(&mut self, dst_addr: Ipv4Address, payload: &[u8]) -> Result<()> {
        self.send_buffer.enqueue((dst_addr, payload.to_vec()))
    }

    /// Dequeues a received datagram, IPv4 header included.
    ///
    /// # Errors
    ///
    /// An error occurs if the receive buffer is empty.
    pub fn recv(&mut self) -> Result<Vec<u8>> {
        self.recv_buffer.dequeue()
    }

    /// Dequeues a payload enqueued for sending.
    pub fn send_dequeue(&mut self) -> Result<(Ipv4Address, Vec<u8>)> {
        self.send_buffer.dequeue()
    }

    /// Enqueues a received datagram.
    pub fn recv_enqueue(&mut self, datagram: &[u8]) -> Result<()> {
        self.recv_buffer.enqueue(datagram.to_vec())
    }

    /// Returns the number of datagrams enqueued for sending.
    pub fn send_enqueued(&self) -> usize {
        self.send_buffer.len()
    }

    /// Returns the number of datagrams enqueued for receiving.
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
