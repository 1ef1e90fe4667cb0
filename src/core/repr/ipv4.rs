use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::net::Ipv4Addr as StdIpv4Addr;
use std::result::Result as StdResult;
use std::str::FromStr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use core::check::internet_checksum;
use {
    Error,
    Result,
};

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
///
/// The unspecified address (all zeros) marks an unconfigured interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 4]);

impl Address {
    pub const UNSPECIFIED: Address = Address([0x00; 4]);

    pub const BROADCAST: Address = Address([0xFF; 4]);

    /// Creates an IPv4 address from a network byte order buffer.
    pub fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Tries to create an IPv4 address from a network byte order slice.
    pub fn try_new(addr: &[u8]) -> Result<Address> {
        if addr.len() != 4 {
            return Err(Error::Malformed);
        }

        let mut _addr: [u8; 4] = [0; 4];
        _addr.copy_from_slice(addr);
        Ok(Address(_addr))
    }

    /// Returns a reference to the network byte order representation of the
    /// address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the address as a host order integer.
    pub fn as_u32(&self) -> u32 {
        NetworkEndian::read_u32(&self.0)
    }

    /// Creates an address from a host order integer.
    pub fn from_u32(addr: u32) -> Address {
        let mut _addr = [0; 4];
        NetworkEndian::write_u32(&mut _addr, addr);
        Address(_addr)
    }

    pub fn is_unspecified(&self) -> bool {
        self.0 == [0x00; 4]
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 4]
    }

    /// Checks if both addresses share a subnet under the provided mask.
    pub fn same_subnet(&self, other: Address, netmask: Address) -> bool {
        (self.as_u32() & netmask.as_u32()) == (other.as_u32() & netmask.as_u32())
    }

    /// Returns the directed broadcast address of the subnet this address
    /// belongs to.
    pub fn subnet_broadcast(&self, netmask: Address) -> Address {
        Address::from_u32(self.as_u32() | !netmask.as_u32())
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Address {
    type Err = ();

    /// Parses an Ipv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let bytes = addr
            .split('.')
            .map(|token| token.parse::<u8>())
            .collect::<StdResult<Vec<_>, _>>()
            .map_err(|_| ())?;

        Address::try_new(&bytes).map_err(|_| ())
    }
}

impl From<StdIpv4Addr> for Address {
    fn from(addr: StdIpv4Addr) -> Address {
        Address(addr.octets())
    }
}

impl From<Address> for StdIpv4Addr {
    fn from(addr: Address) -> StdIpv4Addr {
        StdIpv4Addr::from(addr.0)
    }
}

/// [https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml](https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml)
pub mod protocols {
    pub const ICMP: u8 = 1;

    pub const UDP: u8 = 17;
}

pub mod flags {
    pub const DONT_FRAGMENT: u8 = 0b010;

    pub const MORE_FRAGMENTS: u8 = 0b001;
}

/// Safe representation of an IPv4 header without options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub src_addr: Address,
    pub dst_addr: Address,
    pub protocol: u8,
    pub payload_len: u16,
    pub ttl: u8,
}

impl Repr {
    /// Returns the length of the serialized header and payload.
    pub fn buffer_len(&self) -> usize {
        Packet::<&[u8]>::MIN_HEADER_LEN + self.payload_len as usize
    }

    /// Deserializes a packet whose encoding has been checked.
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            src_addr: packet.src_addr(),
            dst_addr: packet.dst_addr(),
            protocol: packet.protocol(),
            payload_len: packet.packet_len() - packet.header_len() as u16,
            ttl: packet.ttl(),
        }
    }

    /// Serializes the header into the first MIN_HEADER_LEN bytes of a buffer
    /// and fills in the header checksum.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() < Packet::<&[u8]>::MIN_HEADER_LEN {
            return Err(Error::CapacityExceeded);
        }

        let header = &mut buffer[.. Packet::<&[u8]>::MIN_HEADER_LEN];
        header[0] = 0x45;
        header[1] = 0;
        NetworkEndian::write_u16(&mut header[2 .. 4], self.buffer_len() as u16);
        NetworkEndian::write_u16(&mut header[4 .. 6], 0);
        NetworkEndian::write_u16(&mut header[6 .. 8], (flags::DONT_FRAGMENT as u16) << 13);
        header[8] = self.ttl;
        header[9] = self.protocol;
        NetworkEndian::write_u16(&mut header[10 .. 12], 0);
        header[12 .. 16].copy_from_slice(self.src_addr.as_bytes());
        header[16 .. 20].copy_from_slice(self.dst_addr.as_bytes());

        let checksum = internet_checksum(header);
        NetworkEndian::write_u16(&mut header[10 .. 12], checksum);

        Ok(())
    }
}

/// View of a byte buffer as an IPv4 packet.
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
    pub const MIN_HEADER_LEN: usize = 20;

    /// Tries to create an IPv4 packet view over a byte buffer.
    ///
    /// The buffer may be longer than the packet, e.g. when carried in a padded
    /// Ethernet frame.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::MIN_HEADER_LEN {
            return Err(Error::Malformed);
        }

        Ok(Packet { buffer })
    }

    /// Checks the version, header length, total length and header checksum.
    pub fn check_encoding(&self) -> Result<()> {
        let buffer_len = self.buffer.as_ref().len();
        let header_len = self.header_len() as usize;

        if self.ip_version() != 4
            || header_len < Self::MIN_HEADER_LEN
            || buffer_len < header_len
            || (self.packet_len() as usize) < header_len
            || (self.packet_len() as usize) > buffer_len
        {
            Err(Error::Malformed)
        } else if internet_checksum(&self.buffer.as_ref()[.. header_len]) != 0 {
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    pub fn ip_version(&self) -> u8 {
        (self.buffer.as_ref()[0] & 0xF0) >> 4
    }

    pub fn header_len(&self) -> u8 {
        (self.buffer.as_ref()[0] & 0x0F) * 4
    }

    pub fn packet_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[2 .. 4])
    }

    pub fn flags(&self) -> u8 {
        self.buffer.as_ref()[6] >> 5
    }

    pub fn fragment_offset(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[6 .. 8]) & 0x1FFF
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[8]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer.as_ref()[9]
    }

    pub fn header_checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[10 .. 12])
    }

    pub fn src_addr(&self) -> Address {
        let mut addr = [0; 4];
        addr.copy_from_slice(&self.buffer.as_ref()[12 .. 16]);
        Address(addr)
    }

    pub fn dst_addr(&self) -> Address {
        let mut addr = [0; 4];
        addr.copy_from_slice(&self.buffer.as_ref()[16 .. 20]);
        Address(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!("10.0.0.5".parse::<Address>(), Ok(Address::new([10, 0, 0, 5])));
        assert_eq!("10.0.0".parse::<Address>(), Err(()));
        assert_eq!("10.0.0.256".parse::<Address>(), Err(()));
    }

    #[test]
    fn test_subnet() {
        let netmask = Address::new([255, 255, 255, 0]);
        let addr = Address::new([10, 0, 0, 5]);
        assert!(addr.same_subnet(Address::new([10, 0, 0, 200]), netmask));
        assert!(!addr.same_subnet(Address::new([10, 0, 1, 5]), netmask));
        assert_eq!(addr.subnet_broadcast(netmask), Address::new([10, 0, 0, 255]));
    }

    #[test]
    fn test_packet_buffer_less_than_min_header() {
        let buffer: [u8; 1] = [0; 1];
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Malformed));
    }

    #[test]
    fn test_packet_header_less_than_min_header() {
        let mut buffer: [u8; 20] = [0; 20];
        buffer[0] = 0x44;
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));
    }

    #[test]
    fn test_packet_buffer_less_than_packet() {
        let mut buffer: [u8; 20] = [0; 20];
        buffer[0] = 0x45;
        buffer[2] = 0xFF;
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));
    }

    #[test]
    fn test_serialize_and_check() {
        let repr = Repr {
            src_addr: Address::new([10, 0, 0, 5]),
            dst_addr: Address::new([10, 0, 0, 1]),
            protocol: protocols::UDP,
            payload_len: 8,
            ttl: 64,
        };

        let mut buffer = [0; 28];
        repr.serialize(&mut buffer[..]).unwrap();

        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Ok(()));
        assert_eq!(packet.header_len(), 20);
        assert_eq!(packet.packet_len(), 28);
        assert_eq!(packet.flags(), flags::DONT_FRAGMENT);
        assert_eq!(Repr::deserialize(&packet), repr);

        buffer[8] = 63;
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Checksum));
    }
}
