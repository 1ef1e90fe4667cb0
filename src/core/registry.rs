//! Lookup tables from socket family/type to providers and from IP protocol
//! numbers to handlers.
//!
//! Both tables are filled once when a stack is created and only read after
//! that.

use std::collections::HashMap;

use rand;

use core::config::StackConfig;
use core::repr::ipv4_protocols;
use core::socket::{
    Family,
    IcmpSocket,
    RawSocket,
    SocketSet,
    SocketType,
    TaggedSocket,
    UdpSocket,
    PF_INET,
    SOCK_DGRAM,
    SOCK_RAW,
};
use {
    Error,
    Result,
};

/// First port handed out to unbound UDP sockets.
pub const EPHEMERAL_PORT_START: u16 = 49152;

/// Creates sockets for a (family, type) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// UDP sockets, or ICMP echo sockets for the ICMP protocol.
    Datagram,
    /// Raw IPv4 sockets for any protocol.
    Raw,
}

impl Provider {
    /// Creates a socket for the protocol number.
    pub fn create(&self, protocol: u8, sockets: &SocketSet, config: &StackConfig) -> Result<TaggedSocket> {
        let capacity = config.socket_queue_capacity;

        match (*self, protocol) {
            (Provider::Datagram, 0) | (Provider::Datagram, ipv4_protocols::UDP) => {
                let port = (EPHEMERAL_PORT_START ..= u16::max_value())
                    .find(|port| !sockets.udp_port_in_use(*port))
                    .ok_or(Error::Exhausted)?;
                Ok(TaggedSocket::Udp(UdpSocket::new(port, capacity)))
            }
            (Provider::Datagram, ipv4_protocols::ICMP) => Ok(TaggedSocket::Icmp(IcmpSocket::new(
                rand::random::<u16>(),
                capacity,
            ))),
            (Provider::Datagram, _) => Err(Error::UnsupportedSocketType),
            (Provider::Raw, protocol) => Ok(TaggedSocket::Raw(RawSocket::new(protocol, capacity))),
        }
    }
}

/// Handles IPv4 payloads of a protocol number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpHandler {
    Icmp,
    Udp,
}

#[derive(Debug, Default)]
pub struct ProtocolRegistry {
    socket_types: HashMap<(Family, SocketType), Provider>,
    ip_protocols: HashMap<u8, IpHandler>,
}

impl ProtocolRegistry {
    /// Creates an empty registry.
    pub fn new() -> ProtocolRegistry {
        ProtocolRegistry {
            socket_types: HashMap::new(),
            ip_protocols: HashMap::new(),
        }
    }

    /// Creates a registry with the IPv4 datagram and raw providers and the
    /// ICMP and UDP handlers.
    pub fn standard() -> ProtocolRegistry {
        let mut registry = ProtocolRegistry::new();
        registry.register_socket_type(PF_INET, SOCK_DGRAM, Provider::Datagram);
        registry.register_socket_type(PF_INET, SOCK_RAW, Provider::Raw);
        registry.register_ip_protocol(ipv4_protocols::ICMP, IpHandler::Icmp);
        registry.register_ip_protocol(ipv4_protocols::UDP, IpHandler::Udp);
        registry
    }

    /// Registers a provider. Returns false if the pair already has one, which
    /// is kept.
    pub fn register_socket_type(&mut self, family: Family, socket_type: SocketType, provider: Provider) -> bool {
        if self.socket_types.contains_key(&(family, socket_type)) {
            return false;
        }
        self.socket_types.insert((family, socket_type), provider);
        true
    }

    /// Registers a handler. Returns false if the protocol already has one,
    /// which is kept.
    pub fn register_ip_protocol(&mut self, protocol: u8, handler: IpHandler) -> bool {
        if self.ip_protocols.contains_key(&protocol) {
            return false;
        }
        self.ip_protocols.insert(protocol, handler);
        true
    }

    pub fn provider(&self, family: Family, socket_type: SocketType) -> Result<Provider> {
        self.socket_types
            .get(&(family, socket_type))
            .cloned()
            .ok_or(Error::UnsupportedSocketType)
    }

    /// Creates a socket through the provider registered for (family, type).
    pub fn create(
        &self,
        family: Family,
        socket_type: SocketType,
        protocol: u8,
        sockets: &SocketSet,
        config: &StackConfig,
    ) -> Result<TaggedSocket> {
        self.provider(family, socket_type)?
            .create(protocol, sockets, config)
    }

    pub fn ip_handler(&self, protocol: u8) -> Option<IpHandler> {
        self.ip_protocols.get(&protocol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::socket::{
        PF_INET6,
        SOCK_STREAM,
    };

    fn create(family: Family, socket_type: SocketType, protocol: u8) -> Result<TaggedSocket> {
        ProtocolRegistry::standard().create(
            family,
            socket_type,
            protocol,
            &SocketSet::new(),
            &StackConfig::default(),
        )
    }

    #[test]
    fn test_raw_any_protocol() {
        for protocol in 0 ..= 255u8 {
            match create(PF_INET, SOCK_RAW, protocol) {
                Ok(TaggedSocket::Raw(socket)) => assert_eq!(socket.protocol(), protocol),
                other => panic!("Unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_datagram_protocols() {
        assert_matches!(create(PF_INET, SOCK_DGRAM, 0), Ok(TaggedSocket::Udp(_)));
        assert_matches!(
            create(PF_INET, SOCK_DGRAM, ipv4_protocols::UDP),
            Ok(TaggedSocket::Udp(_))
        );
        assert_matches!(
            create(PF_INET, SOCK_DGRAM, ipv4_protocols::ICMP),
            Ok(TaggedSocket::Icmp(_))
        );
        assert_matches!(
            create(PF_INET, SOCK_DGRAM, 6),
            Err(Error::UnsupportedSocketType)
        );
    }

    #[test]
    fn test_unregistered_pairs() {
        assert_matches!(
            create(PF_INET, SOCK_STREAM, 0),
            Err(Error::UnsupportedSocketType)
        );
        assert_matches!(
            create(PF_INET6, SOCK_DGRAM, 0),
            Err(Error::UnsupportedSocketType)
        );
        assert_matches!(
            ProtocolRegistry::new().provider(PF_INET, SOCK_RAW),
            Err(Error::UnsupportedSocketType)
        );
    }

    #[test]
    fn test_ephemeral_ports() {
        let registry = ProtocolRegistry::standard();
        let config = StackConfig::default();
        let mut sockets = SocketSet::new();

        let first = registry
            .create(PF_INET, SOCK_DGRAM, 0, &sockets, &config)
            .unwrap();
        sockets.add_socket(first);
        let mut second = registry
            .create(PF_INET, SOCK_DGRAM, 0, &sockets, &config)
            .unwrap();

        assert!(sockets.udp_port_in_use(EPHEMERAL_PORT_START));
        assert_eq!(second.as_udp_socket().port(), EPHEMERAL_PORT_START + 1);
    }

    #[test]
    fn test_registration_keeps_first() {
        let mut registry = ProtocolRegistry::standard();
        assert!(!registry.register_ip_protocol(ipv4_protocols::UDP, IpHandler::Icmp));
        assert_eq!(
            registry.ip_handler(ipv4_protocols::UDP),
            Some(IpHandler::Udp)
        );
        assert_eq!(registry.ip_handler(6), None);
    }
}
