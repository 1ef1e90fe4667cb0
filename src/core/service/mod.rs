//! Packet processing services for different network layers.
//!
//! A `Stack` owns every piece of state of one network stack instance. The
//! submodules are sets of free functions implementing each layer on top of
//! it: inbound processing flows ethernet -> arp/ipv4 -> icmpv4/udp ->
//! dhcp/nbns/sockets and outbound processing flows the reverse.

pub mod arp;
pub mod dhcp;
pub mod ethernet;
pub mod icmpv4;
pub mod ipv4;
pub mod nbns;
pub mod socket;
pub mod udp;

use std::collections::HashMap;
use std::time::Instant;

use core::buffer::PacketBuffer;
use core::config::StackConfig;
use core::dev::Device;
use core::dhcp_client::DhcpState;
use core::interface::{
    Interface,
    InterfaceId,
    Interfaces,
};
use core::registry::ProtocolRegistry;
use core::repr::{
    Ipv4Address,
    NbnsName,
};
use core::socket::{
    Family,
    SocketHandle,
    SocketSet,
    SocketType,
    TaggedSocket,
};
use core::time::Env;
use core::timer::{
    Timer,
    TimerEvent,
};
use {
    Error,
    Result,
};

/// A network stack instance.
#[derive(Debug)]
pub struct Stack {
    config: StackConfig,
    env: Box<dyn Env>,
    timer: Box<dyn Timer>,
    interfaces: Interfaces,
    registry: ProtocolRegistry,
    sockets: SocketSet,
    nbns_names: HashMap<InterfaceId, NbnsName>,
}

impl Stack {
    /// Creates a stack with the standard protocol registry.
    pub fn new<E, T>(config: StackConfig, env: E, timer: T) -> Stack
    where
        E: Env + 'static,
        T: Timer + 'static,
    {
        Stack::with_registry(config, env, timer, ProtocolRegistry::standard())
    }

    pub fn with_registry<E, T>(config: StackConfig, env: E, timer: T, registry: ProtocolRegistry) -> Stack
    where
        E: Env + 'static,
        T: Timer + 'static,
    {
        Stack {
            config,
            env: Box::new(env),
            timer: Box::new(timer),
            interfaces: Interfaces::new(),
            registry,
            sockets: SocketSet::new(),
            nbns_names: HashMap::new(),
        }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> Instant {
        self.env.now_instant()
    }

    /// Attaches a device as a new, unconfigured interface.
    pub fn attach(&mut self, dev: Box<dyn Device>) -> InterfaceId {
        let id = self.interfaces.attach(dev, &self.config);
        info!(
            "Attached {} with address {}.",
            id,
            self.interfaces
                .get(id)
                .map(|interface| interface.ethernet_addr().to_string())
                .unwrap_or_default()
        );
        id
    }

    /// Detaches an interface, discarding packets awaiting address resolution
    /// and cancelling its ARP and DHCP timers.
    pub fn detach(&mut self, id: InterfaceId) -> Result<()> {
        let mut interface = self.interfaces.detach(id)?;

        for removed in interface.arp_cache.drain() {
            if let Some(handle) = removed.timer {
                self.timer.cancel(handle);
            }
            if !removed.pending.is_empty() {
                debug!(
                    "Discarding {} packets awaiting {} on {}.",
                    removed.pending.len(),
                    removed.addr,
                    id
                );
            }
        }

        for handle in interface.dhcp.take_timers() {
            self.timer.cancel(handle);
        }

        self.nbns_names.remove(&id);
        info!("Detached {}.", id);
        Ok(())
    }

    pub fn interface(&self, id: InterfaceId) -> Result<&Interface> {
        self.interfaces.get(id)
    }

    pub fn interface_mut(&mut self, id: InterfaceId) -> Result<&mut Interface> {
        self.interfaces.get_mut(id)
    }

    pub fn interface_ids(&self) -> Vec<InterfaceId> {
        self.interfaces.ids()
    }

    /// Statically configures the address of an interface.
    pub fn set_ipv4_addr(
        &mut self,
        id: InterfaceId,
        addr: Ipv4Address,
        netmask: Ipv4Address,
        gateway: Option<Ipv4Address>,
    ) -> Result<()> {
        self.interfaces
            .get_mut(id)?
            .set_ipv4_addr(addr, netmask, gateway);
        info!("{} configured with {}/{}.", id, addr, netmask);
        Ok(())
    }

    /// Processes a frame received on an interface.
    ///
    /// Frames that are malformed, not addressed to the interface or of an
    /// unsupported protocol are dropped and logged. Only a missing interface
    /// is reported as an error.
    pub fn dispatch_inbound(&mut self, id: InterfaceId, buffer: PacketBuffer) -> Result<()> {
        self.interfaces.get(id)?;

        match ethernet::recv_frame(self, id, buffer) {
            Ok(()) => Ok(()),
            Err(Error::NoInterface) => Err(Error::NoInterface),
            Err(err) => {
                debug!("Dropped frame on {} with {:?}.", id, err);
                Ok(())
            }
        }
    }

    /// Transmits an IPv4 packet to a next hop on the link, resolving its
    /// Ethernet address first if needed.
    pub fn arp_resolve(&mut self, id: InterfaceId, addr: Ipv4Address, buffer: PacketBuffer) -> Result<()> {
        arp::resolve(self, id, addr, buffer)
    }

    /// Reacts to an armed timer firing.
    pub fn on_timer(&mut self, event: TimerEvent) -> Result<()> {
        match event {
            TimerEvent::ArpRetry { interface, addr } => arp::retry(self, interface, addr),
            TimerEvent::Dhcp { interface, timeout } => dhcp::on_timeout(self, interface, timeout),
        }
    }

    /// Processes frames waiting on every device and transmits packets queued
    /// on sockets.
    pub fn poll(&mut self) {
        for id in self.interfaces.ids() {
            socket::recv(self, id);
        }
        socket::send(self);
    }

    /// Starts DHCP on an interface, restarting discovery if already running.
    pub fn dhcp_start(&mut self, id: InterfaceId) -> Result<()> {
        dhcp::start(self, id)
    }

    pub fn dhcp_state(&self, id: InterfaceId) -> Result<DhcpState> {
        Ok(self.interfaces.get(id)?.dhcp.state())
    }

    /// Registers the NetBIOS name of an interface. No traffic is generated.
    pub fn nbns_register_name(&mut self, id: InterfaceId, name: &str) -> Result<()> {
        nbns::register_name(self, id, name)
    }

    pub fn nbns_name(&self, id: InterfaceId) -> Option<NbnsName> {
        self.nbns_names.get(&id).cloned()
    }

    /// Creates a socket through the registered provider.
    pub fn socket(&mut self, family: Family, socket_type: SocketType, protocol: u8) -> Result<SocketHandle> {
        let socket = self.registry
            .create(family, socket_type, protocol, &self.sockets, &self.config)?;
        Ok(self.sockets.add_socket(socket))
    }

    pub fn socket_mut(&mut self, handle: SocketHandle) -> Option<&mut TaggedSocket> {
        self.sockets.socket(handle)
    }

    pub fn close(&mut self, handle: SocketHandle) -> Option<TaggedSocket> {
        self.sockets.remove_socket(handle)
    }
}
