use core::repr::Ipv4Address;
use core::storage::Ring;
use {
    Error,
    Result,
};

/// An echo request to send or an echo reply received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Echo {
    pub addr: Ipv4Address,
    pub seq: u16,
    pub payload: Vec<u8>,
}

/// Socket for sending ICMP echo requests and receiving the matching replies.
#[derive(Debug)]
pub struct IcmpSocket {
    ident: u16,
    send_buffer: Ring<Echo>,
    recv_buffer: Ring<Echo>,
    error: Option<Error>,
}

impl IcmpSocket {
    pub fn new(ident: u16, queue_capacity: usize) -> IcmpSocket {
        IcmpSocket {
            ident,
            send_buffer: Ring::with_capacity(queue_capacity),
            recv_buffer: Ring::with_capacity(queue_capacity),
            error: None,
        }
    }

    /// Returns the echo identifier of the socket.
    pub fn ident(&self) -> u16 {
        self.ident
    }

    pub fn accepts(&self, ident: u16) -> bool {
        self.ident == ident
    }

    /// Enqueues an echo request for sending.
    pub fn send(&mut self, addr: Ipv4Address, seq: u16, payload: &[u8]) -> Result<()> {
        self.send_buffer.enqueue(Echo {
            addr,
            seq,
            payload: payload.to_vec(),
        })
    }

    /// Dequeues a received echo reply.
    pub fn recv(&mut self) -> Result<Echo> {
        self.recv_buffer.dequeue()
    }

    pub fn send_dequeue(&mut self) -> Result<Echo> {
        self.send_buffer.dequeue()
    }

    pub fn recv_enqueue(&mut self, echo: Echo) -> Result<()> {
        self.recv_buffer.enqueue(echo)
    }

    pub fn send_enqueued(&self) -> usize {
        self.send_buffer.len()
    }

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
