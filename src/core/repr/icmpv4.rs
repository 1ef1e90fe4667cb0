use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use core::check::internet_checksum;
use {
    Error,
    Result,
};

/// [https://www.iana.org/assignments/icmp-parameters/icmp-parameters.xhtml](https://www.iana.org/assignments/icmp-parameters/icmp-parameters.xhtml)
pub mod types {
    pub const ECHO_REPLY: u8 = 0;

    pub const ECHO_REQUEST: u8 = 8;
}

/// Safe representation of an ICMP echo header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repr {
    EchoReply { id: u16, seq: u16 },
    EchoRequest { id: u16, seq: u16 },
}

impl Repr {
    /// Tries to deserialize a packet into an ICMP representation. Types other
    /// than echo request/reply are not handled by the stack.
    pub fn deserialize<T>(packet: &Packet<T>) -> Result<Repr>
    where
        T: AsRef<[u8]>,
    {
        let id = NetworkEndian::read_u16(&packet.header()[0 .. 2]);
        let seq = NetworkEndian::read_u16(&packet.header()[2 .. 4]);

        match (packet._type(), packet.code()) {
            (types::ECHO_REPLY, 0) => Ok(Repr::EchoReply { id, seq }),
            (types::ECHO_REQUEST, 0) => Ok(Repr::EchoRequest { id, seq }),
            _ => Err(Error::Ignored),
        }
    }

    /// Serializes the ICMP header into a packet.
    ///
    /// The payload should be written before calling fill_checksum() on the
    /// packet.
    pub fn serialize<T>(&self, packet: &mut Packet<T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        let (type_of, id, seq) = match *self {
            Repr::EchoReply { id, seq } => (types::ECHO_REPLY, id, seq),
            Repr::EchoRequest { id, seq } => (types::ECHO_REQUEST, id, seq),
        };

        packet.set_type(type_of);
        packet.set_code(0);
        packet.set_checksum(0);
        NetworkEndian::write_u16(&mut packet.header_mut()[0 .. 2], id);
        NetworkEndian::write_u16(&mut packet.header_mut()[2 .. 4], seq);
    }
}

/// [https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol](https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol)
mod fields {
    use std::ops::{
        Range,
        RangeFrom,
    };

    pub const TYPE: usize = 0;

    pub const CODE: usize = 1;

    pub const CHECKSUM: Range<usize> = 2 .. 4;

    pub const HEADER: Range<usize> = 4 .. 8;

    pub const PAYLOAD: RangeFrom<usize> = 8 ..;
}

/// View of a byte buffer as an ICMP packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 8;

    /// Tries to create an ICMP packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            Err(Error::Malformed)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of an ICMP packet with the specified payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    /// Checks the checksum over the header and payload.
    pub fn check_encoding(&self) -> Result<()> {
        if self.gen_packet_checksum() != 0 {
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    /// Calculates the packet checksum.
    pub fn gen_packet_checksum(&self) -> u16 {
        internet_checksum(self.buffer.as_ref())
    }

    pub fn _type(&self) -> u8 {
        self.buffer.as_ref()[fields::TYPE]
    }

    pub fn code(&self) -> u8 {
        self.buffer.as_ref()[fields::CODE]
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    /// Returns the 4 byte "rest of header" field, identifier and sequence
    /// number for echo messages.
    pub fn header(&self) -> &[u8] {
        &self.buffer.as_ref()[fields::HEADER]
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[fields::PAYLOAD]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_type(&mut self, type_of: u8) {
        self.buffer.as_mut()[fields::TYPE] = type_of
    }

    pub fn set_code(&mut self, code: u8) {
        self.buffer.as_mut()[fields::CODE] = code;
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::CHECKSUM], checksum);
    }

    pub fn header_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[fields::HEADER]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[fields::PAYLOAD]
    }

    /// Recomputes the checksum over the current header and payload.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = self.gen_packet_checksum();
        self.set_checksum(checksum);
    }
}
