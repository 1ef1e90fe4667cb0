//! Packet storage with per layer offsets.
//!
//! A `PacketBuffer` owns a contiguous byte region. Outbound, headers are
//! pushed outside-in (link, network, transport) into headroom reserved at
//! allocation and filled in place as the packet descends the stack. Inbound,
//! the same calls consume the headers of a received frame.

use core::socket::SocketHandle;
use {
    Error,
    Result,
};

/// The protocol layers a packet buffer tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Link = 0,
    Network = 1,
    Transport = 2,
}

const LAYERS: usize = 3;

#[derive(Debug)]
pub struct PacketBuffer {
    storage: Vec<u8>,
    len: usize,
    cursor: usize,
    offsets: [Option<usize>; LAYERS],
    sender: Option<SocketHandle>,
}

impl PacketBuffer {
    /// Allocates a zeroed buffer able to hold capacity bytes.
    pub fn allocate(capacity: usize) -> Result<PacketBuffer> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| Error::Exhausted)?;
        storage.resize(capacity, 0);

        Ok(PacketBuffer {
            storage,
            len: 0,
            cursor: 0,
            offsets: [None; LAYERS],
            sender: None,
        })
    }

    /// Wraps a received frame. Headers are consumed with push_header().
    pub fn from_frame(frame: Vec<u8>) -> PacketBuffer {
        PacketBuffer {
            len: frame.len(),
            storage: frame,
            cursor: 0,
            offsets: [None; LAYERS],
            sender: None,
        }
    }

    /// Reserves size bytes for the header of a layer at the cursor and returns
    /// a writable view of them.
    ///
    /// Layers must be pushed in increasing order and at most once. A failed
    /// push leaves the buffer unchanged.
    pub fn push_header(&mut self, layer: Layer, size: usize) -> Result<&mut [u8]> {
        if self.offsets[layer as usize ..].iter().any(|offset| offset.is_some()) {
            return Err(Error::Layer);
        }

        let end = self.cursor + size;
        if end > self.storage.len() {
            return Err(Error::CapacityExceeded);
        }

        let start = self.cursor;
        self.offsets[layer as usize] = Some(start);
        self.cursor = end;
        self.len = ::std::cmp::max(self.len, end);

        Ok(&mut self.storage[start .. end])
    }

    /// Reserves size bytes of payload after the last header and returns a
    /// writable view of them.
    pub fn push_payload(&mut self, size: usize) -> Result<&mut [u8]> {
        let end = self.cursor + size;
        if end > self.storage.len() {
            return Err(Error::CapacityExceeded);
        }

        self.len = end;
        Ok(&mut self.storage[self.cursor .. end])
    }

    /// Returns the start offset of a layer, if pushed.
    pub fn offset(&self, layer: Layer) -> Option<usize> {
        self.offsets[layer as usize]
    }

    /// Returns the header of a layer plus everything after it.
    pub fn view_layer(&self, layer: Layer) -> Option<&[u8]> {
        let len = self.len;
        self.offsets[layer as usize].map(move |start| &self.storage[start .. len])
    }

    pub fn view_layer_mut(&mut self, layer: Layer) -> Option<&mut [u8]> {
        let len = self.len;
        match self.offsets[layer as usize] {
            Some(start) => Some(&mut self.storage[start .. len]),
            None => None,
        }
    }

    /// Returns the bytes after the last pushed header.
    pub fn payload(&self) -> &[u8] {
        &self.storage[self.cursor .. self.len]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.cursor .. self.len]
    }

    /// Returns every byte in use, from the start of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[.. self.len]
    }

    pub fn total_length(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Shrinks the payload to at most length bytes, dropping trailing bytes
    /// such as Ethernet padding.
    pub fn truncate_payload(&mut self, length: usize) {
        let end = self.cursor + length;
        if end < self.len {
            self.len = end;
        }
    }

    /// Returns the socket the packet originates from, if any.
    pub fn sender(&self) -> Option<SocketHandle> {
        self.sender
    }

    pub fn set_sender(&mut self, sender: Option<SocketHandle>) {
        self.sender = sender;
    }
}
