//! [DHCP](https://tools.ietf.org/html/rfc2131) messages carried over BOOTP.

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use core::repr::{
    arp_hw_types,
    EthernetAddress,
    Ipv4Address,
};
use {
    Error,
    Result,
};

pub const SERVER_PORT: u16 = 67;

pub const CLIENT_PORT: u16 = 68;

pub const MAGIC_COOKIE: u32 = 0x63825363;

/// Minimum BOOTP message length, shorter messages are zero padded.
pub const MIN_MESSAGE_LEN: usize = 300;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Request = 1,
    Reply = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
    Unknown(u8),
}

impl From<u8> for MessageType {
    fn from(value: u8) -> MessageType {
        match value {
            1 => MessageType::Discover,
            2 => MessageType::Offer,
            3 => MessageType::Request,
            4 => MessageType::Decline,
            5 => MessageType::Ack,
            6 => MessageType::Nak,
            7 => MessageType::Release,
            8 => MessageType::Inform,
            i => MessageType::Unknown(i),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(message_type: MessageType) -> u8 {
        match message_type {
            MessageType::Discover => 1,
            MessageType::Offer => 2,
            MessageType::Request => 3,
            MessageType::Decline => 4,
            MessageType::Ack => 5,
            MessageType::Nak => 6,
            MessageType::Release => 7,
            MessageType::Inform => 8,
            MessageType::Unknown(i) => i,
        }
    }
}

/// [https://www.iana.org/assignments/bootp-dhcp-parameters/bootp-dhcp-parameters.xhtml](https://www.iana.org/assignments/bootp-dhcp-parameters/bootp-dhcp-parameters.xhtml)
pub mod options {
    pub const PAD: u8 = 0;

    pub const SUBNET_MASK: u8 = 1;

    pub const ROUTER: u8 = 3;

    pub const DNS: u8 = 6;

    pub const REQUESTED_IP_ADDR: u8 = 50;

    pub const LEASE_TIME: u8 = 51;

    pub const MESSAGE_TYPE: u8 = 53;

    pub const SERVER_ID: u8 = 54;

    pub const PARAMETER_REQUEST: u8 = 55;

    pub const RENEWAL_TIME: u8 = 58;

    pub const REBINDING_TIME: u8 = 59;

    pub const END: u8 = 255;
}

mod fields {
    use std::ops::{
        Range,
        RangeFrom,
    };

    pub const OP: usize = 0;

    pub const HW_TYPE: usize = 1;

    pub const HW_LEN: usize = 2;

    pub const XID: Range<usize> = 4 .. 8;

    pub const FLAGS: Range<usize> = 10 .. 12;

    pub const CLIENT_ADDR: Range<usize> = 12 .. 16;

    pub const YOUR_ADDR: Range<usize> = 16 .. 20;

    pub const SERVER_ADDR: Range<usize> = 20 .. 24;

    pub const CLIENT_HW_ADDR: Range<usize> = 28 .. 34;

    pub const COOKIE: Range<usize> = 236 .. 240;

    pub const OPTIONS: RangeFrom<usize> = 240 ..;
}

/// Broadcast bit in the BOOTP flags field.
pub const FLAG_BROADCAST: u16 = 0x8000;

const HEADER_LEN: usize = 240;

const REQUESTED_PARAMETERS: [u8; 3] = [options::SUBNET_MASK, options::ROUTER, options::DNS];

/// Safe representation of a DHCP message and the options the client uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub op: Op,
    pub message_type: MessageType,
    pub xid: u32,
    pub flags: u16,
    pub client_hw_addr: EthernetAddress,
    pub client_addr: Ipv4Address,
    pub your_addr: Ipv4Address,
    pub server_addr: Ipv4Address,
    pub requested_addr: Option<Ipv4Address>,
    pub server_identifier: Option<Ipv4Address>,
    pub subnet_mask: Option<Ipv4Address>,
    pub router: Option<Ipv4Address>,
    pub dns_server: Option<Ipv4Address>,
    pub lease_duration: Option<u32>,
    pub renewal_duration: Option<u32>,
    pub rebinding_duration: Option<u32>,
}

impl Repr {
    /// Creates a client request of the specified type with no options set.
    pub fn client(message_type: MessageType, xid: u32, client_hw_addr: EthernetAddress) -> Repr {
        Repr {
            op: Op::Request,
            message_type,
            xid,
            flags: 0,
            client_hw_addr,
            client_addr: Ipv4Address::UNSPECIFIED,
            your_addr: Ipv4Address::UNSPECIFIED,
            server_addr: Ipv4Address::UNSPECIFIED,
            requested_addr: None,
            server_identifier: None,
            subnet_mask: None,
            router: None,
            dns_server: None,
            lease_duration: None,
            renewal_duration: None,
            rebinding_duration: None,
        }
    }

    fn options_len(&self) -> usize {
        let addr_options = [
            self.requested_addr,
            self.server_identifier,
            self.subnet_mask,
            self.router,
            self.dns_server,
        ];
        let time_options = [
            self.lease_duration,
            self.renewal_duration,
            self.rebinding_duration,
        ];

        let mut len = 3 + 1;
        len += 6 * addr_options.iter().filter(|option| option.is_some()).count();
        len += 6 * time_options.iter().filter(|option| option.is_some()).count();
        if self.op == Op::Request {
            len += 2 + REQUESTED_PARAMETERS.len();
        }
        len
    }

    /// Returns the size of the serialized message, including padding.
    pub fn buffer_len(&self) -> usize {
        ::std::cmp::max(HEADER_LEN + self.options_len(), MIN_MESSAGE_LEN)
    }

    /// Attempts to deserialize a buffer into a DHCP message.
    pub fn deserialize(buffer: &[u8]) -> Result<Repr> {
        if buffer.len() < HEADER_LEN {
            return Err(Error::Malformed);
        }

        let op = match buffer[fields::OP] {
            1 => Op::Request,
            2 => Op::Reply,
            _ => return Err(Error::Malformed),
        };

        if buffer[fields::HW_TYPE] as u16 != arp_hw_types::ETHERNET || buffer[fields::HW_LEN] != 6
            || NetworkEndian::read_u32(&buffer[fields::COOKIE]) != MAGIC_COOKIE
        {
            return Err(Error::Malformed);
        }

        let mut repr = Repr::client(
            MessageType::Unknown(0),
            NetworkEndian::read_u32(&buffer[fields::XID]),
            EthernetAddress::try_new(&buffer[fields::CLIENT_HW_ADDR])?,
        );
        repr.op = op;
        repr.flags = NetworkEndian::read_u16(&buffer[fields::FLAGS]);
        repr.client_addr = Ipv4Address::try_new(&buffer[fields::CLIENT_ADDR])?;
        repr.your_addr = Ipv4Address::try_new(&buffer[fields::YOUR_ADDR])?;
        repr.server_addr = Ipv4Address::try_new(&buffer[fields::SERVER_ADDR])?;

        let mut message_type = None;
        let mut remaining = &buffer[fields::OPTIONS];

        while let Some((&kind, rest)) = remaining.split_first() {
            if kind == options::PAD {
                remaining = rest;
                continue;
            }
            if kind == options::END {
                break;
            }

            let (&len, rest) = rest.split_first().ok_or(Error::Malformed)?;
            if rest.len() < len as usize {
                return Err(Error::Malformed);
            }
            let (data, rest) = rest.split_at(len as usize);
            remaining = rest;

            let addr = || {
                if data.len() < 4 {
                    Err(Error::Malformed)
                } else {
                    Ipv4Address::try_new(&data[.. 4])
                }
            };
            let duration = || {
                if data.len() < 4 {
                    Err(Error::Malformed)
                } else {
                    Ok(NetworkEndian::read_u32(&data[.. 4]))
                }
            };

            match kind {
                options::MESSAGE_TYPE => {
                    let value = data.first().ok_or(Error::Malformed)?;
                    message_type = Some(MessageType::from(*value));
                }
                options::SUBNET_MASK => repr.subnet_mask = Some(addr()?),
                options::ROUTER => repr.router = Some(addr()?),
                options::DNS => repr.dns_server = Some(addr()?),
                options::REQUESTED_IP_ADDR => repr.requested_addr = Some(addr()?),
                options::SERVER_ID => repr.server_identifier = Some(addr()?),
                options::LEASE_TIME => repr.lease_duration = Some(duration()?),
                options::RENEWAL_TIME => repr.renewal_duration = Some(duration()?),
                options::REBINDING_TIME => repr.rebinding_duration = Some(duration()?),
                options::PARAMETER_REQUEST => {}
                i => debug!("Skipping unknown DHCP option {}.", i),
            }
        }

        repr.message_type = message_type.ok_or(Error::Malformed)?;

        Ok(repr)
    }

    /// Serializes the message into a buffer of at least buffer_len() bytes.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        let buffer_len = self.buffer_len();
        if buffer.len() < buffer_len {
            return Err(Error::CapacityExceeded);
        }

        let buffer = &mut buffer[.. buffer_len];
        for byte in buffer.iter_mut() {
            *byte = 0;
        }

        buffer[fields::OP] = self.op as u8;
        buffer[fields::HW_TYPE] = arp_hw_types::ETHERNET as u8;
        buffer[fields::HW_LEN] = 6;
        NetworkEndian::write_u32(&mut buffer[fields::XID], self.xid);
        NetworkEndian::write_u16(&mut buffer[fields::FLAGS], self.flags);
        buffer[fields::CLIENT_ADDR].copy_from_slice(self.client_addr.as_bytes());
        buffer[fields::YOUR_ADDR].copy_from_slice(self.your_addr.as_bytes());
        buffer[fields::SERVER_ADDR].copy_from_slice(self.server_addr.as_bytes());
        buffer[fields::CLIENT_HW_ADDR].copy_from_slice(self.client_hw_addr.as_bytes());
        NetworkEndian::write_u32(&mut buffer[fields::COOKIE], MAGIC_COOKIE);

        let mut writer = OptionWriter {
            buffer: &mut buffer[fields::OPTIONS],
            pos: 0,
        };

        writer.write(options::MESSAGE_TYPE, &[u8::from(self.message_type)]);

        let addr_options = [
            (options::REQUESTED_IP_ADDR, self.requested_addr),
            (options::SERVER_ID, self.server_identifier),
            (options::SUBNET_MASK, self.subnet_mask),
            (options::ROUTER, self.router),
            (options::DNS, self.dns_server),
        ];
        for &(kind, addr) in addr_options.iter() {
            if let Some(addr) = addr {
                writer.write(kind, addr.as_bytes());
            }
        }

        let time_options = [
            (options::LEASE_TIME, self.lease_duration),
            (options::RENEWAL_TIME, self.renewal_duration),
            (options::REBINDING_TIME, self.rebinding_duration),
        ];
        for &(kind, duration) in time_options.iter() {
            if let Some(duration) = duration {
                let mut bytes = [0; 4];
                NetworkEndian::write_u32(&mut bytes, duration);
                writer.write(kind, &bytes);
            }
        }

        if self.op == Op::Request {
            writer.write(options::PARAMETER_REQUEST, &REQUESTED_PARAMETERS);
        }

        writer.buffer[writer.pos] = options::END;

        Ok(())
    }
}

struct OptionWriter<'a> {
    buffer: &'a mut [u8],
    pos: usize,
}

impl<'a> OptionWriter<'a> {
    fn write(&mut self, kind: u8, data: &[u8]) {
        self.buffer[self.pos] = kind;
        self.buffer[self.pos + 1] = data.len() as u8;
        self.buffer[self.pos + 2 .. self.pos + 2 + data.len()].copy_from_slice(data);
        self.pos += 2 + data.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> EthernetAddress {
        EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x55])
    }

    fn offer() -> Repr {
        let mut repr = Repr::client(MessageType::Offer, 0xDEADBEEF, mac());
        repr.op = Op::Reply;
        repr.your_addr = Ipv4Address::new([10, 0, 0, 5]);
        repr.server_identifier = Some(Ipv4Address::new([10, 0, 0, 1]));
        repr.subnet_mask = Some(Ipv4Address::new([255, 255, 255, 0]));
        repr.router = Some(Ipv4Address::new([10, 0, 0, 1]));
        repr.lease_duration = Some(3600);
        repr
    }

    #[test]
    fn test_discover_layout() {
        let repr = Repr::client(MessageType::Discover, 0x01020304, mac());
        assert_eq!(repr.buffer_len(), MIN_MESSAGE_LEN);

        let mut buffer = vec![0xAA; repr.buffer_len()];
        repr.serialize(&mut buffer).unwrap();

        assert_eq!(buffer[0], 1);
        assert_eq!(&buffer[4 .. 8], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&buffer[28 .. 34], mac().as_bytes());
        assert_eq!(&buffer[236 .. 240], &[0x63, 0x82, 0x53, 0x63]);
        assert_eq!(&buffer[240 .. 243], &[options::MESSAGE_TYPE, 1, 1]);
        assert_eq!(
            &buffer[243 .. 249],
            &[options::PARAMETER_REQUEST, 3, 1, 3, 6, options::END]
        );
        assert_eq!(buffer[249], 0);

        assert_eq!(Repr::deserialize(&buffer).unwrap(), repr);
    }

    #[test]
    fn test_offer_options() {
        let repr = offer();
        let mut buffer = vec![0; repr.buffer_len()];
        repr.serialize(&mut buffer).unwrap();
        assert_eq!(Repr::deserialize(&buffer).unwrap(), repr);
    }

    #[test]
    fn test_pad_options_skipped() {
        let repr = offer();
        let mut buffer = vec![0; repr.buffer_len() + 2];
        repr.serialize(&mut buffer[2 ..]).unwrap();

        // Shift the fixed header back and insert two PAD options.
        let mut shifted = buffer[2 .. 2 + 240].to_vec();
        shifted.extend_from_slice(&[options::PAD, options::PAD]);
        shifted.extend_from_slice(&buffer[2 + 240 ..]);
        assert_eq!(Repr::deserialize(&shifted).unwrap(), repr);
    }

    #[test]
    fn test_truncated_option() {
        let repr = offer();
        let mut buffer = vec![0; repr.buffer_len()];
        repr.serialize(&mut buffer).unwrap();

        buffer.truncate(240);
        buffer.extend_from_slice(&[options::MESSAGE_TYPE, 1, 2, options::LEASE_TIME, 4, 0]);
        assert_matches!(Repr::deserialize(&buffer), Err(Error::Malformed));
    }

    #[test]
    fn test_missing_message_type() {
        let mut buffer = vec![0; 300];
        offer().serialize(&mut buffer).unwrap();
        buffer[240] = options::END;
        assert_matches!(Repr::deserialize(&buffer), Err(Error::Malformed));
    }

    #[test]
    fn test_bad_cookie() {
        let mut buffer = vec![0; 300];
        offer().serialize(&mut buffer).unwrap();
        buffer[236] = 0;
        assert_matches!(Repr::deserialize(&buffer), Err(Error::Malformed));
    }
}
