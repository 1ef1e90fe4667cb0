use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use {
    Error,
    Result,
};

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
// https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-1
pub enum Op {
    Request = 0x0001,
    Reply = 0x0002,
}

/// https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-2
pub mod hw_types {
    pub const ETHERNET: u16 = 0x0001;
}

/// https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-3
pub mod proto_types {
    pub const IPV4: u16 = 0x0800;
}

/// An Ethernet/IPv4 ARP packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arp {
    pub op: Op,
    pub source_hw_addr: EthernetAddress,
    pub source_proto_addr: Ipv4Address,
    pub target_hw_addr: EthernetAddress,
    pub target_proto_addr: Ipv4Address,
}

impl Arp {
    pub const BUFFER_LEN: usize = 28;

    /// Returns the size of the ARP packet when serialized to a buffer.
    pub fn buffer_len(&self) -> usize {
        Self::BUFFER_LEN
    }

    /// Attempts to deserialize a buffer into an ARP packet.
    pub fn deserialize(buffer: &[u8]) -> Result<Arp> {
        if buffer.len() < Self::BUFFER_LEN {
            return Err(Error::Malformed);
        }

        let hw_type = NetworkEndian::read_u16(&buffer[0 .. 2]);
        let proto_type = NetworkEndian::read_u16(&buffer[2 .. 4]);
        let (hw_len, proto_len) = (buffer[4], buffer[5]);

        if hw_type != hw_types::ETHERNET || proto_type != proto_types::IPV4 || hw_len != 6
            || proto_len != 4
        {
            return Err(Error::Malformed);
        }

        let op = match NetworkEndian::read_u16(&buffer[6 .. 8]) {
            0x0001 => Op::Request,
            0x0002 => Op::Reply,
            _ => return Err(Error::Malformed),
        };

        Ok(Arp {
            op,
            source_hw_addr: EthernetAddress::try_new(&buffer[8 .. 14])?,
            source_proto_addr: Ipv4Address::try_new(&buffer[14 .. 18])?,
            target_hw_addr: EthernetAddress::try_new(&buffer[18 .. 24])?,
            target_proto_addr: Ipv4Address::try_new(&buffer[24 .. 28])?,
        })
    }

    /// Serializes the ARP packet into a buffer.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        if self.buffer_len() > buffer.len() {
            return Err(Error::CapacityExceeded);
        }

        NetworkEndian::write_u16(&mut buffer[0 .. 2], hw_types::ETHERNET);
        NetworkEndian::write_u16(&mut buffer[2 .. 4], proto_types::IPV4);
        buffer[4] = 6;
        buffer[5] = 4;
        NetworkEndian::write_u16(&mut buffer[6 .. 8], self.op as u16);
        buffer[8 .. 14].copy_from_slice(self.source_hw_addr.as_bytes());
        buffer[14 .. 18].copy_from_slice(self.source_proto_addr.as_bytes());
        buffer[18 .. 24].copy_from_slice(self.target_hw_addr.as_bytes());
        buffer[24 .. 28].copy_from_slice(self.target_proto_addr.as_bytes());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: [u8; 28] = [
        0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 0x06, 0x11, 0x22, 0x33, 0x44, 0x55, 0x0A,
        0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x01,
    ];

    #[test]
    fn test_deserialize_request() {
        let arp = Arp::deserialize(&REQUEST[..]).unwrap();
        assert_eq!(arp.op, Op::Request);
        assert_eq!(
            arp.source_hw_addr,
            EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x55])
        );
        assert_eq!(arp.source_proto_addr, Ipv4Address::new([10, 0, 0, 5]));
        assert_eq!(arp.target_hw_addr, EthernetAddress::UNSPECIFIED);
        assert_eq!(arp.target_proto_addr, Ipv4Address::new([10, 0, 0, 1]));

        let mut buffer = [0; 28];
        arp.serialize(&mut buffer[..]).unwrap();
        assert_eq!(&buffer[..], &REQUEST[..]);
    }

    #[test]
    fn test_deserialize_bad_op() {
        let mut buffer = REQUEST;
        buffer[7] = 0x03;
        assert_matches!(Arp::deserialize(&buffer[..]), Err(Error::Malformed));
    }

    #[test]
    fn test_deserialize_short_buffer() {
        assert_matches!(Arp::deserialize(&REQUEST[.. 27]), Err(Error::Malformed));
    }
}
