//! NetBIOS name responder.
//!
//! Answers broadcast name queries for the name registered on an interface
//! and announces the name once the interface acquires an address.

use rand;

use core::interface::InterfaceId;
use core::repr::{
    nbns,
    Ipv4Address,
    Ipv4Repr,
    NbnsName,
    NbnsRepr,
};
use core::service::{
    udp,
    Stack,
};
use core::socket::SocketAddr;
use {
    Error,
    Result,
};

/// Registers the name the interface answers to. No traffic is generated.
pub fn register_name(stack: &mut Stack, id: InterfaceId, name: &str) -> Result<()> {
    stack.interfaces.get(id)?;

    let nbns_name = NbnsName::encode(name);
    info!("Registered NetBIOS name {:?} on {}.", nbns_name.decode(), id);
    stack.nbns_names.insert(id, nbns_name);
    Ok(())
}

/// Receives an NBNS message on the interface.
pub fn recv_packet(stack: &mut Stack, id: InterfaceId, ipv4_repr: &Ipv4Repr, payload: &[u8]) -> Result<()> {
    let (xid, name) = match NbnsRepr::deserialize(payload)? {
        NbnsRepr::Query { xid, name } => (xid, name),
        _ => return Err(Error::Ignored),
    };

    let own_name = stack.nbns_names.get(&id).cloned().ok_or(Error::Ignored)?;
    if name != own_name {
        debug!("Ignoring NetBIOS query for {:?}.", name.decode());
        return Err(Error::Ignored);
    }

    let interface = stack.interfaces.get(id)?;
    if !interface.is_configured() {
        debug!(
            "Ignoring NetBIOS query for {:?}, {} has no address.",
            name.decode(),
            id
        );
        return Err(Error::Ignored);
    }

    let nbns_repr = NbnsRepr::QueryResponse {
        xid,
        name,
        ttl: stack.config.nbns_ttl,
        addr: interface.ipv4_addr(),
    };

    debug!(
        "Got a NetBIOS query for {:?} from {}; Sending response...",
        name.decode(),
        ipv4_repr.src_addr
    );
    send_packet(stack, id, &nbns_repr, ipv4_repr.src_addr)
}

/// Broadcasts a registration of the interface's name and address.
pub fn announce(stack: &mut Stack, id: InterfaceId) -> Result<()> {
    let name = stack.nbns_names.get(&id).cloned().ok_or(Error::Ignored)?;
    let interface = stack.interfaces.get(id)?;

    let nbns_repr = NbnsRepr::Registration {
        xid: rand::random::<u16>(),
        name,
        addr: interface.ipv4_addr(),
    };

    let broadcast = interface.ipv4_addr().subnet_broadcast(interface.netmask());
    debug!("Announcing NetBIOS name {:?} to {}.", name.decode(), broadcast);
    send_packet(stack, id, &nbns_repr, broadcast)
}

fn send_packet(stack: &mut Stack, id: InterfaceId, nbns_repr: &NbnsRepr, dst_addr: Ipv4Address) -> Result<()> {
    let mut payload = vec![0; nbns_repr.buffer_len()];
    nbns_repr.serialize(&mut payload)?;

    udp::send_packet(
        stack,
        id,
        nbns::PORT,
        SocketAddr::new(dst_addr, nbns::PORT),
        &payload,
        None,
    )
}
