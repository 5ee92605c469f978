use crate::linux;
use libc;
use std::{
    ffi::CStr,
    io,
    mem::{self, MaybeUninit},
    os::unix::io::{AsRawFd, RawFd},
    ptr,
};

/// An unbound `AF_PACKET` socket. At this phase of a socket's lifecycle, it can be
/// configured.
pub struct Socket {
    fd: libc::c_int,
}

/// An `AF_PACKET` socket bound to one network interface. At this phase of a socket's
/// lifecycle, it can be read from and written to.
pub struct BoundSocket {
    fd: libc::c_int,
    send_addr: libc::sockaddr_ll,
}

impl Socket {
    /// Creates a new unbound socket that sees every ether type.
    pub fn new() -> io::Result<Self> {
        // Uses FFI only to create a descriptor; no Rust-owned memory is shared with the call.
        // Resources:
        // man 7 packet
        let fd = unsafe {
            let fd = libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                i32::from((libc::ETH_P_ALL as u16).to_be()),
            );
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            fd
        };
        Ok(Self { fd })
    }

    /// Configures the socket's non-blocking status.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        // Resources:
        // man 2 fcntl
        unsafe {
            let flags = libc::fcntl(self.fd, libc::F_GETFL);
            if flags < 0 {
                return Err(io::Error::last_os_error());
            }
            let new_flags = if nonblocking {
                flags | libc::O_NONBLOCK
            } else {
                flags & !libc::O_NONBLOCK
            };
            if libc::fcntl(self.fd, libc::F_SETFL, new_flags) < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    /// Binds the socket to a network interface. Consumes the `Socket`, no more
    /// configuration may be changed afterwards.
    pub fn bind(self, iface: impl AsRef<CStr>) -> io::Result<BoundSocket> {
        let name = iface.as_ref().to_bytes_with_nul();
        if name.len() > libc::IFNAMSIZ {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "interface name too long",
            ));
        }

        // The name is copied into a zeroed ifreq, bounded by the length checked above, and
        // the kernel only writes into structs owned by this frame.
        let send_addr = unsafe {
            let mut ifr: linux::ifreq = MaybeUninit::zeroed().assume_init();
            ptr::copy_nonoverlapping(
                name.as_ptr() as *const libc::c_char,
                ifr.ifr_ifrn.ifrn_name.as_mut_ptr(),
                name.len(),
            );
            // ioctl(SIOCGIFINDEX) fills in the index field of the ifreq object
            // Resources:
            // man 7 netdevice
            if libc::ioctl(self.fd, linux::SIOCGIFINDEX, &mut ifr) < 0 {
                return Err(io::Error::last_os_error());
            }

            let mut ll: libc::sockaddr_ll = MaybeUninit::zeroed().assume_init();
            ll.sll_family = libc::AF_PACKET as libc::c_ushort;
            ll.sll_protocol = (libc::ETH_P_ALL as u16).to_be();
            // expanded from `ifr_ifindex` in kernel headers
            ll.sll_ifindex = ifr.ifr_ifru.ifru_ivalue;
            let err = libc::bind(
                self.fd,
                &ll as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
            ll
        };

        let fd = self.fd;
        // The descriptor now belongs to the BoundSocket; skip our Drop so it stays open.
        mem::forget(self);
        Ok(BoundSocket { fd, send_addr })
    }
}

impl BoundSocket {
    /// Sends a frame out of the bound interface.
    pub fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        // `frame` is only borrowed for the duration of the call and its length is passed
        // along with it.
        unsafe {
            let bytes = libc::sendto(
                self.fd,
                frame.as_ptr() as *const _,
                frame.len(),
                0,
                &self.send_addr as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(bytes as usize)
            }
        }
    }

    /// Receives one frame into `frame`. Returns its length on the wire and the kernel's
    /// packet type (`PACKET_HOST`, `PACKET_BROADCAST`, `PACKET_OUTGOING`, ...). A length
    /// greater than `frame.len()` means the frame was truncated.
    pub fn recv(&mut self, frame: &mut [u8]) -> io::Result<(usize, libc::c_uchar)> {
        // See `send`.
        unsafe {
            let mut from = MaybeUninit::<libc::sockaddr_ll>::zeroed();
            let mut addrlen = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
            let bytes = libc::recvfrom(
                self.fd,
                frame.as_mut_ptr() as *mut _,
                frame.len(),
                libc::MSG_TRUNC,
                from.as_mut_ptr() as *mut libc::sockaddr,
                &mut addrlen,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok((bytes as usize, from.assume_init().sll_pkttype))
            }
        }
    }

    /// Whether a frame of `pkttype` is meant for this host. The socket also sees frames
    /// the host sent, and on a promiscuous port unicast for other stations.
    pub fn is_for_host(pkttype: libc::c_uchar) -> bool {
        pkttype != linux::PACKET_OUTGOING && pkttype != linux::PACKET_OTHERHOST
    }
}

impl AsRawFd for BoundSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
