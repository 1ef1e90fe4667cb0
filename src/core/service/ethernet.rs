use core::buffer::{
    Layer,
    PacketBuffer,
};
use core::interface::InterfaceId;
use core::repr::{
    eth_types,
    EthernetAddress,
    EthernetFrame,
};
use core::service::{
    arp,
    ipv4,
    Stack,
};
use {
    Error,
    Result,
};

/// Fills the Ethernet header reserved at the front of the buffer and hands
/// the frame to the interface's device.
///
/// Never blocks. Fails with TransmitBusy if the device queue is full, the
/// frame is not retried.
pub fn send_frame(
    stack: &mut Stack,
    id: InterfaceId,
    dst_addr: EthernetAddress,
    payload_type: u16,
    mut buffer: PacketBuffer,
) -> Result<()> {
    let interface = stack.interfaces.get_mut(id)?;

    {
        let eth_buffer = buffer.view_layer_mut(Layer::Link).ok_or(Error::Layer)?;
        let mut eth_frame = EthernetFrame::try_new(eth_buffer)?;
        eth_frame.set_dst_addr(dst_addr);
        eth_frame.set_src_addr(interface.ethernet_addr());
        eth_frame.set_payload_type(payload_type);
    }

    let frame = buffer.view_layer(Layer::Link).ok_or(Error::Layer)?;
    interface.transmit(frame)
}

/// Receives an Ethernet frame from an interface.
///
/// The Ethernet header is consumed and the payload propagated up the network
/// stack by type.
pub fn recv_frame(stack: &mut Stack, id: InterfaceId, mut buffer: PacketBuffer) -> Result<()> {
    let (dst_addr, src_addr, payload_type) = {
        let eth_frame = EthernetFrame::try_new(buffer.as_bytes())?;
        (
            eth_frame.dst_addr(),
            eth_frame.src_addr(),
            eth_frame.payload_type(),
        )
    };

    let ethernet_addr = stack.interfaces.get(id)?.ethernet_addr();
    if dst_addr != ethernet_addr && !dst_addr.is_broadcast() {
        debug!("Ignoring ethernet frame with destination {}.", dst_addr);
        return Err(Error::Ignored);
    }

    buffer.push_header(Layer::Link, EthernetFrame::<&[u8]>::HEADER_LEN)?;

    match payload_type {
        eth_types::ARP => arp::recv_packet(stack, id, &buffer),
        eth_types::IPV4 => ipv4::recv_packet(stack, id, buffer, src_addr),
        i => {
            debug!("Ignoring ethernet frame with type {:#06x}.", i);
            Err(Error::Ignored)
        }
    }
}
