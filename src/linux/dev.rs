use std::io::Error as IoError;

use libc;

use core::dev::Device;
use core::repr::{
    EthernetAddress,
    EthernetFrame,
};
use linux::libc as _libc;
use {
    Error,
    Result,
};

/// [TAP interface](https://www.kernel.org/doc/Documentation/networking/tuntap.txt)
/// for sending and receiving raw ethernet frames.
///
/// The stack acts as a separate host on the TAP link, so its Ethernet
/// address is chosen by the caller rather than read from the kernel.
#[derive(Debug)]
pub struct Tap {
    tapfd: libc::c_int,
    max_transmission_unit: usize,
    eth_addr: EthernetAddress,
}

impl Tap {
    /// Creates or binds to an existing, non blocking TAP interface.
    pub fn new(ifr_name: &str, eth_addr: EthernetAddress) -> Result<Tap> {
        unsafe {
            let ifreq = _libc::c_ifreq::with_name(ifr_name);

            let tapfd = libc::open(
                "/dev/net/tun\0".as_ptr() as *const libc::c_char,
                libc::O_RDWR | libc::O_NONBLOCK,
            );

            if tapfd < 0 {
                return Err(Error::IO(IoError::last_os_error()));
            }

            let mut _ifreq = ifreq;
            _ifreq.ifr_ifru.ifr_flags = _libc::IFF_TAP | _libc::IFF_NO_PI;
            if libc::ioctl(tapfd, _libc::TUNSETIFF, &mut _ifreq as *mut _libc::c_ifreq) == -1 {
                let err = IoError::last_os_error();
                libc::close(tapfd);
                return Err(Error::IO(err));
            }

            let max_transmission_unit = match Self::query_mtu(ifreq) {
                Ok(mtu) => mtu,
                Err(err) => {
                    libc::close(tapfd);
                    return Err(err);
                }
            };

            Ok(Tap {
                tapfd,
                max_transmission_unit,
                eth_addr,
            })
        }
    }

    /// Returns the size of the largest frame the link carries, the interface
    /// MTU plus the Ethernet header.
    unsafe fn query_mtu(ifreq: _libc::c_ifreq) -> Result<usize> {
        let sockfd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);

        if sockfd == -1 {
            return Err(Error::IO(IoError::last_os_error()));
        }

        let mut _ifreq = ifreq;
        if libc::ioctl(sockfd, _libc::SIOCGIFMTU, &mut _ifreq as *mut _libc::c_ifreq) == -1 {
            let err = IoError::last_os_error();
            libc::close(sockfd);
            return Err(Error::IO(err));
        }

        libc::close(sockfd);
        Ok(EthernetFrame::<&[u8]>::buffer_len(_ifreq.ifr_ifru.ifr_mtu as usize))
    }
}

impl Device for Tap {
    fn send(&mut self, buffer: &[u8]) -> Result<()> {
        unsafe {
            let wrote = libc::write(
                self.tapfd,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
            );

            if wrote < 0 && _libc::errno() == libc::EAGAIN {
                Err(Error::TransmitBusy)
            } else if wrote < 0 {
                Err(Error::IO(IoError::last_os_error()))
            } else {
                Ok(())
            }
        }
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize> {
        unsafe {
            let read = libc::read(
                self.tapfd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            );

            if read < 0 && _libc::errno() == libc::EAGAIN {
                Err(Error::Exhausted)
            } else if read < 0 {
                Err(Error::IO(IoError::last_os_error()))
            } else {
                Ok(read as usize)
            }
        }
    }

    fn max_transmission_unit(&self) -> usize {
        self.max_transmission_unit
    }

    fn ethernet_addr(&self) -> EthernetAddress {
        self.eth_addr
    }
}

impl Drop for Tap {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.tapfd);
        }
    }
}
