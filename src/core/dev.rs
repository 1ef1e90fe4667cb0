//! The driver seam: sending and receiving raw Ethernet frames.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::rc::Rc;

use core::repr::EthernetAddress;
use {
    Error,
    Result,
};

/// A network device that transmits and receives Ethernet frames.
pub trait Device: Debug {
    /// Queues a frame for transmission without blocking.
    ///
    /// Fails with TransmitBusy when the transmit queue is full. The frame is
    /// not retried.
    fn send(&mut self, buffer: &[u8]) -> Result<()>;

    /// Reads a received frame into the buffer and returns its size, or fails
    /// with Exhausted when no frame is waiting. The buffer should hold at least
    /// max_transmission_unit() bytes.
    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Returns the [MTU](https://en.wikipedia.org/wiki/Maximum_transmission_unit)
    /// of the device, including the Ethernet header.
    fn max_transmission_unit(&self) -> usize;

    /// Returns the hardware address of the device.
    fn ethernet_addr(&self) -> EthernetAddress;
}

#[derive(Debug)]
struct Queues {
    tx: VecDeque<Vec<u8>>,
    rx: VecDeque<Vec<u8>>,
}

/// A device backed by in-memory frame queues.
///
/// Clones share the same queues. The "wire" side injects frames with
/// inject() and collects transmitted frames with take_sent().
#[derive(Clone, Debug)]
pub struct MemoryDevice {
    queues: Rc<RefCell<Queues>>,
    tx_capacity: usize,
    max_transmission_unit: usize,
    eth_addr: EthernetAddress,
}

impl MemoryDevice {
    /// Creates a device with room for tx_capacity untaken transmitted frames.
    pub fn new(eth_addr: EthernetAddress, tx_capacity: usize) -> MemoryDevice {
        MemoryDevice {
            queues: Rc::new(RefCell::new(Queues {
                tx: VecDeque::new(),
                rx: VecDeque::new(),
            })),
            tx_capacity,
            max_transmission_unit: 1514,
            eth_addr,
        }
    }

    /// Queues a frame to be returned by recv().
    pub fn inject(&self, frame: Vec<u8>) {
        self.queues.borrow_mut().rx.push_back(frame);
    }

    /// Removes and returns every transmitted frame, oldest first.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        self.queues.borrow_mut().tx.drain(..).collect()
    }

    pub fn sent_len(&self) -> usize {
        self.queues.borrow().tx.len()
    }
}

impl Device for MemoryDevice {
    fn send(&mut self, buffer: &[u8]) -> Result<()> {
        let mut queues = self.queues.borrow_mut();
        if queues.tx.len() >= self.tx_capacity {
            return Err(Error::TransmitBusy);
        }
        if buffer.len() > self.max_transmission_unit {
            return Err(Error::CapacityExceeded);
        }

        queues.tx.push_back(buffer.to_vec());
        Ok(())
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut queues = self.queues.borrow_mut();
        match queues.rx.pop_front() {
            Some(frame) => {
                if frame.len() > buffer.len() {
                    return Err(Error::CapacityExceeded);
                }
                buffer[.. frame.len()].copy_from_slice(&frame);
                Ok(frame.len())
            }
            None => Err(Error::Exhausted),
        }
    }

    fn max_transmission_unit(&self) -> usize {
        self.max_transmission_unit
    }

    fn ethernet_addr(&self) -> EthernetAddress {
        self.eth_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transmit_busy() {
        let mut dev = MemoryDevice::new(EthernetAddress::new([0, 1, 2, 3, 4, 5]), 1);
        dev.send(&[1, 2, 3]).unwrap();
        assert_matches!(dev.send(&[4, 5, 6]), Err(Error::TransmitBusy));

        assert_eq!(dev.take_sent(), vec![vec![1, 2, 3]]);
        dev.send(&[4, 5, 6]).unwrap();
    }

    #[test]
    fn test_recv() {
        let mut dev = MemoryDevice::new(EthernetAddress::new([0, 1, 2, 3, 4, 5]), 1);
        let mut buffer = [0; 1514];
        assert_matches!(dev.recv(&mut buffer), Err(Error::Exhausted));

        dev.clone().inject(vec![9, 8, 7]);
        assert_eq!(dev.recv(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer[.. 3], &[9, 8, 7]);
    }
}
