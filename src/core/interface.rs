//! Network interfaces and the registry that owns them.

use core::arp_cache::ArpCache;
use core::config::StackConfig;
use core::dev::Device;
use core::dhcp_client::DhcpClient;
use core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use {
    Error,
    Result,
};

/// Stable handle of an attached interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub usize);

impl ::std::fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Where an outbound IPv4 datagram goes on the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextHop {
    Broadcast,
    Unicast(Ipv4Address),
}

#[derive(Debug)]
pub struct Interface {
    id: InterfaceId,
    ethernet_addr: EthernetAddress,
    ipv4_addr: Ipv4Address,
    netmask: Ipv4Address,
    gateway: Option<Ipv4Address>,
    dev: Box<dyn Device>,
    pub arp_cache: ArpCache,
    pub dhcp: DhcpClient,
}

impl Interface {
    fn new(id: InterfaceId, dev: Box<dyn Device>, config: &StackConfig) -> Interface {
        Interface {
            id,
            ethernet_addr: dev.ethernet_addr(),
            ipv4_addr: Ipv4Address::UNSPECIFIED,
            netmask: Ipv4Address::UNSPECIFIED,
            gateway: None,
            dev,
            arp_cache: ArpCache::new(
                config.arp_cache_capacity,
                config.arp_pending_capacity,
                config.arp_entry_ttl,
            ),
            dhcp: DhcpClient::new(),
        }
    }

    pub fn id(&self) -> InterfaceId {
        self.id
    }

    pub fn ethernet_addr(&self) -> EthernetAddress {
        self.ethernet_addr
    }

    /// Returns the current address, unspecified while unconfigured.
    pub fn ipv4_addr(&self) -> Ipv4Address {
        self.ipv4_addr
    }

    pub fn netmask(&self) -> Ipv4Address {
        self.netmask
    }

    pub fn gateway(&self) -> Option<Ipv4Address> {
        self.gateway
    }

    pub fn is_configured(&self) -> bool {
        !self.ipv4_addr.is_unspecified()
    }

    /// Replaces the IPv4 configuration of the interface.
    pub fn set_ipv4_addr(&mut self, addr: Ipv4Address, netmask: Ipv4Address, gateway: Option<Ipv4Address>) {
        self.ipv4_addr = addr;
        self.netmask = netmask;
        self.gateway = gateway;
    }

    pub fn clear_ipv4_addr(&mut self) {
        self.set_ipv4_addr(Ipv4Address::UNSPECIFIED, Ipv4Address::UNSPECIFIED, None);
    }

    /// Checks if an inbound datagram with the destination is for us.
    pub fn accepts(&self, dst_addr: Ipv4Address) -> bool {
        !self.is_configured() || dst_addr == self.ipv4_addr || dst_addr.is_broadcast()
            || dst_addr == self.ipv4_addr.subnet_broadcast(self.netmask)
    }

    /// Chooses the link destination for an outbound datagram.
    pub fn next_hop(&self, dst_addr: Ipv4Address) -> NextHop {
        if dst_addr.is_broadcast() || !self.is_configured()
            || dst_addr == self.ipv4_addr.subnet_broadcast(self.netmask)
        {
            NextHop::Broadcast
        } else if dst_addr.same_subnet(self.ipv4_addr, self.netmask) {
            NextHop::Unicast(dst_addr)
        } else {
            NextHop::Unicast(self.gateway.unwrap_or(dst_addr))
        }
    }

    pub fn max_transmission_unit(&self) -> usize {
        self.dev.max_transmission_unit()
    }

    /// Hands a complete frame to the device.
    pub fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        self.dev.send(frame)
    }

    /// Reads a frame from the device.
    pub fn receive(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.dev.recv(buffer)
    }
}

/// Owns every attached interface, addressed by InterfaceId.
#[derive(Debug, Default)]
pub struct Interfaces {
    slots: Vec<Option<Interface>>,
}

impl Interfaces {
    pub fn new() -> Interfaces {
        Interfaces { slots: Vec::new() }
    }

    /// Adds an interface for a device, reusing a free slot.
    pub fn attach(&mut self, dev: Box<dyn Device>, config: &StackConfig) -> InterfaceId {
        let slot = self.slots.iter().position(|slot| slot.is_none());
        let id = InterfaceId(slot.unwrap_or(self.slots.len()));
        let interface = Some(Interface::new(id, dev, config));

        match slot {
            Some(i) => self.slots[i] = interface,
            None => self.slots.push(interface),
        }
        id
    }

    pub fn detach(&mut self, id: InterfaceId) -> Result<Interface> {
        self.slots
            .get_mut(id.0)
            .and_then(|slot| slot.take())
            .ok_or(Error::NoInterface)
    }

    pub fn get(&self, id: InterfaceId) -> Result<&Interface> {
        match self.slots.get(id.0) {
            Some(Some(interface)) => Ok(interface),
            _ => Err(Error::NoInterface),
        }
    }

    pub fn get_mut(&mut self, id: InterfaceId) -> Result<&mut Interface> {
        match self.slots.get_mut(id.0) {
            Some(Some(interface)) => Ok(interface),
            _ => Err(Error::NoInterface),
        }
    }

    pub fn ids(&self) -> Vec<InterfaceId> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|interface| interface.id))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::dev::MemoryDevice;

    fn interface() -> Interface {
        let mut interfaces = Interfaces::new();
        let dev = MemoryDevice::new(EthernetAddress::new([0, 1, 2, 3, 4, 5]), 8);
        let id = interfaces.attach(Box::new(dev), &StackConfig::default());
        interfaces.detach(id).unwrap()
    }

    #[test]
    fn test_unconfigured_accepts_all() {
        let interface = interface();
        assert!(interface.accepts(Ipv4Address::new([10, 0, 0, 9])));
        assert_eq!(
            interface.next_hop(Ipv4Address::new([10, 0, 0, 9])),
            NextHop::Broadcast
        );
    }

    #[test]
    fn test_accepts_and_next_hop() {
        let mut interface = interface();
        interface.set_ipv4_addr(
            Ipv4Address::new([10, 0, 0, 5]),
            Ipv4Address::new([255, 255, 255, 0]),
            Some(Ipv4Address::new([10, 0, 0, 1])),
        );

        assert!(interface.accepts(Ipv4Address::new([10, 0, 0, 5])));
        assert!(interface.accepts(Ipv4Address::new([10, 0, 0, 255])));
        assert!(interface.accepts(Ipv4Address::BROADCAST));
        assert!(!interface.accepts(Ipv4Address::new([10, 0, 0, 6])));

        assert_eq!(
            interface.next_hop(Ipv4Address::new([10, 0, 0, 9])),
            NextHop::Unicast(Ipv4Address::new([10, 0, 0, 9]))
        );
        assert_eq!(
            interface.next_hop(Ipv4Address::new([8, 8, 8, 8])),
            NextHop::Unicast(Ipv4Address::new([10, 0, 0, 1]))
        );
        assert_eq!(
            interface.next_hop(Ipv4Address::new([10, 0, 0, 255])),
            NextHop::Broadcast
        );
    }

    #[test]
    fn test_reassignment_replaces() {
        let mut interface = interface();
        interface.set_ipv4_addr(
            Ipv4Address::new([10, 0, 0, 5]),
            Ipv4Address::new([255, 255, 255, 0]),
            None,
        );
        interface.set_ipv4_addr(
            Ipv4Address::new([10, 0, 1, 5]),
            Ipv4Address::new([255, 255, 255, 0]),
            None,
        );
        assert_eq!(interface.ipv4_addr(), Ipv4Address::new([10, 0, 1, 5]));

        interface.clear_ipv4_addr();
        assert!(!interface.is_configured());
    }

    #[test]
    fn test_detach_frees_slot() {
        let mut interfaces = Interfaces::new();
        let config = StackConfig::default();
        let dev = MemoryDevice::new(EthernetAddress::new([0, 1, 2, 3, 4, 5]), 8);

        let a = interfaces.attach(Box::new(dev.clone()), &config);
        let b = interfaces.attach(Box::new(dev.clone()), &config);
        interfaces.detach(a).unwrap();
        assert_matches!(interfaces.get(a), Err(Error::NoInterface));
        assert_matches!(interfaces.detach(a), Err(Error::NoInterface));
        assert_eq!(interfaces.ids(), vec![b]);

        assert_eq!(interfaces.attach(Box::new(dev), &config), a);
    }
}
