//! [NetBIOS name service](https://tools.ietf.org/html/rfc1002) messages.

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use core::repr::Ipv4Address;
use {
    Error,
    Result,
};

pub const PORT: u16 = 137;

/// Maximum number of characters in a NetBIOS name, excluding the suffix.
pub const NAME_LEN: usize = 15;

/// Length of a first-level encoded name including length prefix and root label.
pub const ENCODED_NAME_LEN: usize = 34;

pub const HEADER_LEN: usize = 12;

/// Suffix byte of a workstation name.
pub const SUFFIX_WORKSTATION: u8 = 0x00;

pub mod opcodes {
    pub const QUERY: u8 = 0;

    pub const REGISTRATION: u8 = 5;
}

pub mod nm_flags {
    pub const BROADCAST: u8 = 1 << 0;

    pub const RECURSION_DESIRED: u8 = 1 << 4;

    pub const AUTHORITATIVE: u8 = 1 << 6;
}

/// Unique name, B-node.
pub const NB_FLAGS_UNIQUE_B_NODE: u16 = 0x0000;

const RR_TYPE_NB: u16 = 0x0020;

const RR_CLASS_IN: u16 = 0x0001;

const NAME_POINTER: u16 = 0xC000 | HEADER_LEN as u16;

mod fields {
    use std::ops::Range;

    pub const XID: Range<usize> = 0 .. 2;

    pub const FLAGS: Range<usize> = 2 .. 4;

    pub const QD_COUNT: Range<usize> = 4 .. 6;

    pub const AN_COUNT: Range<usize> = 6 .. 8;

    pub const AR_COUNT: Range<usize> = 10 .. 12;

    pub const NAME: Range<usize> = 12 .. 46;
}

/// A NetBIOS name in first-level encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Name([u8; ENCODED_NAME_LEN]);

impl Name {
    /// Encodes a workstation name, upper casing and space padding it to 15
    /// characters. Longer names are truncated.
    pub fn encode(name: &str) -> Name {
        Name::encode_with_suffix(name, SUFFIX_WORKSTATION)
    }

    pub fn encode_with_suffix(name: &str, suffix: u8) -> Name {
        let mut raw = [b' '; NAME_LEN + 1];
        for (dst, src) in raw.iter_mut().zip(name.bytes().take(NAME_LEN)) {
            *dst = src.to_ascii_uppercase();
        }
        raw[NAME_LEN] = suffix;

        let mut encoded = [0; ENCODED_NAME_LEN];
        encoded[0] = 0x20;
        for (i, byte) in raw.iter().enumerate() {
            encoded[1 + i * 2] = (byte >> 4) + b'A';
            encoded[2 + i * 2] = (byte & 0x0F) + b'A';
        }
        Name(encoded)
    }

    /// Reads an encoded name with a single 32 byte label.
    pub fn try_new(buffer: &[u8]) -> Result<Name> {
        if buffer.len() < ENCODED_NAME_LEN || buffer[0] != 0x20 || buffer[33] != 0 {
            return Err(Error::Malformed);
        }

        let mut encoded = [0; ENCODED_NAME_LEN];
        encoded.copy_from_slice(&buffer[.. ENCODED_NAME_LEN]);
        Ok(Name(encoded))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// Decodes the name back into its padded characters, without the suffix.
    pub fn decode(&self) -> String {
        (0 .. NAME_LEN)
            .map(|i| {
                let hi = self.0[1 + i * 2].wrapping_sub(b'A');
                let lo = self.0[2 + i * 2].wrapping_sub(b'A');
                ((hi << 4) | (lo & 0x0F)) as char
            })
            .collect::<String>()
            .trim_end()
            .to_string()
    }
}

impl ::std::fmt::Debug for Name {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        write!(f, "Name({:?})", self.decode())
    }
}

fn to_flags(response: bool, opcode: u8, nm_flags: u8) -> u16 {
    ((response as u16) << 15) | ((opcode as u16 & 0x0F) << 11) | ((nm_flags as u16 & 0x7F) << 4)
}

/// The NBNS messages understood and produced by the responder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repr {
    Query {
        xid: u16,
        name: Name,
    },
    QueryResponse {
        xid: u16,
        name: Name,
        ttl: u32,
        addr: Ipv4Address,
    },
    Registration {
        xid: u16,
        name: Name,
        addr: Ipv4Address,
    },
}

impl Repr {
    pub fn buffer_len(&self) -> usize {
        match *self {
            Repr::Query { .. } => HEADER_LEN + ENCODED_NAME_LEN + 4,
            Repr::QueryResponse { .. } => HEADER_LEN + ENCODED_NAME_LEN + 10 + 6,
            Repr::Registration { .. } => HEADER_LEN + ENCODED_NAME_LEN + 4 + 12 + 6,
        }
    }

    /// Deserializes a name query. Responses and other opcodes are Ignored.
    pub fn deserialize(buffer: &[u8]) -> Result<Repr> {
        if buffer.len() < HEADER_LEN {
            return Err(Error::Malformed);
        }

        let flags = NetworkEndian::read_u16(&buffer[fields::FLAGS]);
        let response = flags >> 15 == 1;
        let opcode = ((flags >> 11) & 0x0F) as u8;

        if response || opcode != opcodes::QUERY
            || NetworkEndian::read_u16(&buffer[fields::QD_COUNT]) != 1
        {
            return Err(Error::Ignored);
        }

        if buffer.len() < HEADER_LEN + ENCODED_NAME_LEN + 4 {
            return Err(Error::Malformed);
        }

        Ok(Repr::Query {
            xid: NetworkEndian::read_u16(&buffer[fields::XID]),
            name: Name::try_new(&buffer[fields::NAME])?,
        })
    }

    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        let buffer_len = self.buffer_len();
        if buffer.len() < buffer_len {
            return Err(Error::CapacityExceeded);
        }

        let buffer = &mut buffer[.. buffer_len];
        for byte in buffer.iter_mut() {
            *byte = 0;
        }

        let (xid, name) = match *self {
            Repr::Query { xid, name } => (xid, name),
            Repr::QueryResponse { xid, name, .. } => (xid, name),
            Repr::Registration { xid, name, .. } => (xid, name),
        };
        NetworkEndian::write_u16(&mut buffer[fields::XID], xid);
        buffer[fields::NAME].copy_from_slice(name.as_bytes());

        let rest = &mut buffer[fields::NAME.end ..];

        match *self {
            Repr::Query { .. } => {
                write_type_class(rest);
                NetworkEndian::write_u16(
                    &mut buffer[fields::FLAGS],
                    to_flags(false, opcodes::QUERY, nm_flags::BROADCAST),
                );
                NetworkEndian::write_u16(&mut buffer[fields::QD_COUNT], 1);
            }
            Repr::QueryResponse { ttl, addr, .. } => {
                write_type_class(rest);
                write_address_record(&mut rest[4 ..], ttl, addr);
                NetworkEndian::write_u16(
                    &mut buffer[fields::FLAGS],
                    to_flags(
                        true,
                        opcodes::QUERY,
                        nm_flags::AUTHORITATIVE | nm_flags::RECURSION_DESIRED,
                    ),
                );
                NetworkEndian::write_u16(&mut buffer[fields::AN_COUNT], 1);
            }
            Repr::Registration { addr, .. } => {
                write_type_class(rest);
                NetworkEndian::write_u16(&mut rest[4 .. 6], NAME_POINTER);
                write_type_class(&mut rest[6 ..]);
                write_address_record(&mut rest[10 ..], 0, addr);
                NetworkEndian::write_u16(
                    &mut buffer[fields::FLAGS],
                    to_flags(
                        false,
                        opcodes::REGISTRATION,
                        nm_flags::RECURSION_DESIRED | nm_flags::BROADCAST,
                    ),
                );
                NetworkEndian::write_u16(&mut buffer[fields::QD_COUNT], 1);
                NetworkEndian::write_u16(&mut buffer[fields::AR_COUNT], 1);
            }
        }

        Ok(())
    }
}

fn write_type_class(buffer: &mut [u8]) {
    NetworkEndian::write_u16(&mut buffer[0 .. 2], RR_TYPE_NB);
    NetworkEndian::write_u16(&mut buffer[2 .. 4], RR_CLASS_IN);
}

// ttl(4) rdlength(2) nb_flags(2) address(4)
fn write_address_record(buffer: &mut [u8], ttl: u32, addr: Ipv4Address) {
    NetworkEndian::write_u32(&mut buffer[0 .. 4], ttl);
    NetworkEndian::write_u16(&mut buffer[4 .. 6], 6);
    NetworkEndian::write_u16(&mut buffer[6 .. 8], NB_FLAGS_UNIQUE_B_NODE);
    buffer[8 .. 12].copy_from_slice(addr.as_bytes());
}
