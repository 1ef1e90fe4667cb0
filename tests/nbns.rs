extern crate byteorder;
extern crate env_logger;
extern crate kernet;
#[macro_use]
extern crate lazy_static;

mod context;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use kernet::core::repr::{
    nbns,
    DhcpMessageType,
    EthernetAddress,
    Ipv4Address,
    NbnsName,
    NbnsRepr,
};
use kernet::core::socket::SocketAddr;

use context::*;

fn query_frame(name: &str) -> Vec<u8> {
    let query = NbnsRepr::Query {
        xid: 0xBEEF,
        name: NbnsName::encode(name),
    };
    let mut payload = vec![0; query.buffer_len()];
    query.serialize(&mut payload).unwrap();

    udp_frame(
        EthernetAddress::BROADCAST,
        *PEER_MAC,
        SocketAddr::new(*PEER_IP, nbns::PORT),
        SocketAddr::new(Ipv4Address::new([10, 0, 0, 255]), nbns::PORT),
        &payload,
    )
}

#[test]
fn register_name_is_silent() {
    let mut context = Context::configured();
    context
        .stack
        .nbns_register_name(context.id, "kernel")
        .unwrap();

    assert!(context.sent().is_empty());
    assert_eq!(
        context.stack.nbns_name(context.id),
        Some(NbnsName::encode("KERNEL"))
    );
}

#[test]
fn answers_query_for_registered_name() {
    let mut context = Context::configured();
    context
        .stack
        .nbns_register_name(context.id, "kernel")
        .unwrap();

    context.recv(query_frame("KERNEL"));

    // The querier is resolved before the unicast response.
    let sent = context.sent();
    assert_eq!(sent.len(), 1);
    assert!(parse_arp(&sent[0]).is_some());
    context.recv(arp_reply(*PEER_IP, *PEER_MAC));

    let sent = context.sent();
    assert_eq!(sent.len(), 1);
    let (ipv4_repr, udp_repr, payload) = parse_udp(&sent[0]).unwrap();
    assert_eq!(ipv4_repr.dst_addr, *PEER_IP);
    assert_eq!(udp_repr.src_port, nbns::PORT);
    assert_eq!(udp_repr.dst_port, nbns::PORT);

    assert_eq!(NetworkEndian::read_u16(&payload[0 .. 2]), 0xBEEF);
    assert_eq!(NetworkEndian::read_u16(&payload[2 .. 4]), 0x8500);
    assert_eq!(&payload[12 .. 46], NbnsName::encode("kernel").as_bytes());
    // TTL, data length, NB flags and address follow type and class.
    assert_eq!(NetworkEndian::read_u32(&payload[50 .. 54]), 300000);
    assert_eq!(&payload[58 .. 62], STACK_IP.as_bytes());
}

#[test]
fn ignores_query_for_other_name() {
    let mut context = Context::configured();
    context
        .stack
        .nbns_register_name(context.id, "kernel")
        .unwrap();

    context.recv(query_frame("OTHER"));

    assert!(context.sent().is_empty());
}

#[test]
fn ignores_query_without_registered_name() {
    let mut context = Context::configured();
    context.recv(query_frame("KERNEL"));

    assert!(context.sent().is_empty());
}

#[test]
fn ignores_query_when_unconfigured() {
    let mut context = Context::new();
    context
        .stack
        .nbns_register_name(context.id, "kernel")
        .unwrap();

    context.recv(query_frame("KERNEL"));

    assert!(context.sent().is_empty());
}

#[test]
fn announces_name_when_bound() {
    let mut context = Context::new();
    context
        .stack
        .nbns_register_name(context.id, "kernel")
        .unwrap();

    context.stack.dhcp_start(context.id).unwrap();
    context.fire();
    let (_, discover) = parse_dhcp(&context.sent()[0]).unwrap();
    context.recv(dhcp_reply(
        DhcpMessageType::Offer,
        discover.xid,
        *STACK_IP,
        3600,
    ));
    context.sent();
    context.recv(dhcp_reply(
        DhcpMessageType::Ack,
        discover.xid,
        *STACK_IP,
        3600,
    ));

    let sent = context.sent();
    assert_eq!(sent.len(), 1);
    let (ipv4_repr, udp_repr, payload) = parse_udp(&sent[0]).unwrap();
    assert_eq!(ipv4_repr.src_addr, *STACK_IP);
    assert_eq!(ipv4_repr.dst_addr, Ipv4Address::new([10, 0, 0, 255]));
    assert_eq!(udp_repr.dst_port, nbns::PORT);
    assert_eq!(NetworkEndian::read_u16(&payload[2 .. 4]), 0x2910);
    assert_eq!(&payload[payload.len() - 4 ..], STACK_IP.as_bytes());
}
