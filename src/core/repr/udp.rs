use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use core::check::{
    fold,
    sum_words,
};
use core::repr::{
    ipv4_protocols,
    Ipv4Address,
};
use {
    Error,
    Result,
};

/// Safe representation of a UDP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
}

impl Repr {
    /// Returns the UDP packet size needed to serialize this UDP header and
    /// payload.
    pub fn buffer_len(&self) -> usize {
        self.length as usize
    }

    /// Deserializes a packet whose encoding has been checked.
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
            length: packet.length(),
        }
    }

    /// Serializes the UDP header into a packet.
    ///
    /// The payload must be written first so the checksum covers it.
    pub fn serialize<T>(&self, packet: &mut Packet<T>, src_addr: Ipv4Address, dst_addr: Ipv4Address)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_length(self.length);
        packet.set_checksum(0);

        // A computed checksum of zero is transmitted as all ones, zero means
        // "no checksum".
        let checksum = match packet.gen_packet_checksum(src_addr, dst_addr) {
            0 => 0xFFFF,
            checksum => checksum,
        };
        packet.set_checksum(checksum);
    }
}

/// [https://en.wikipedia.org/wiki/User_Datagram_Protocol](https://en.wikipedia.org/wiki/User_Datagram_Protocol)
mod fields {
    use std::ops::{
        Range,
        RangeFrom,
    };

    pub const SRC_PORT: Range<usize> = 0 .. 2;

    pub const DST_PORT: Range<usize> = 2 .. 4;

    pub const LENGTH: Range<usize> = 4 .. 6;

    pub const CHECKSUM: Range<usize> = 6 .. 8;

    pub const PAYLOAD: RangeFrom<usize> = 8 ..;
}

/// View of a byte buffer as a UDP packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Packet<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 8;

    /// Tries to create a UDP packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        let buffer_len = buffer.as_ref().len();

        if buffer_len < Self::HEADER_LEN || buffer_len > u16::max_value() as usize {
            Err(Error::Malformed)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of a UDP packet with the specified payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    /// Checks the length field and the checksum, which may be disabled by
    /// setting it to zero.
    pub fn check_encoding(&self, src_addr: Ipv4Address, dst_addr: Ipv4Address) -> Result<()> {
        if self.length() as usize != self.buffer.as_ref().len() {
            Err(Error::Malformed)
        } else if self.checksum() != 0 && self.gen_packet_checksum(src_addr, dst_addr) != 0 {
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    /// Calculates the checksum over the IPv4 pseudo header and the packet.
    pub fn gen_packet_checksum(&self, src_addr: Ipv4Address, dst_addr: Ipv4Address) -> u16 {
        let mut ip_pseudo_header = [0; 12];
        ip_pseudo_header[0 .. 4].copy_from_slice(src_addr.as_bytes());
        ip_pseudo_header[4 .. 8].copy_from_slice(dst_addr.as_bytes());
        ip_pseudo_header[9] = ipv4_protocols::UDP;
        NetworkEndian::write_u16(
            &mut ip_pseudo_header[10 .. 12],
            self.buffer.as_ref().len() as u16,
        );

        let acc = sum_words(0, &ip_pseudo_header);
        fold(sum_words(acc, self.buffer.as_ref()))
    }

    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::SRC_PORT])
    }

    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::DST_PORT])
    }

    pub fn length(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::LENGTH])
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[fields::PAYLOAD]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_src_port(&mut self, port: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::SRC_PORT], port);
    }

    pub fn set_dst_port(&mut self, port: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::DST_PORT], port);
    }

    pub fn set_length(&mut self, length: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::LENGTH], length);
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::CHECKSUM], checksum);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[fields::PAYLOAD]
    }
}
