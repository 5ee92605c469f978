use crate::ifaddrs::system_interfaces;
use crate::socket::{BoundSocket, Socket};
use iprouter_packets::EthernetFrame;
use iprouter_runtime::{Interface, NetError, NetIo, Received};
use libc;
use log::{debug, info};
use std::{
    ffi::CString,
    io,
    os::unix::io::AsRawFd,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// Room for a maximum size IPv4 datagram behind an Ethernet header, so neither jumbo
/// frames nor GRO-coalesced ones are cut short.
const RECV_BUFFER_LEN: usize = 14 + 65_535;

///
/// The router's ports as raw `AF_PACKET` sockets, one per interface.
///
/// `recv` polls every socket at once. Frames the host itself transmitted, and unicast
/// for other stations seen in promiscuous mode, are skipped.
/// Setting the shared `shutdown` flag (from a signal handler, say) makes the next `recv`
/// report `Received::Shutdown`; a signal that interrupts the poll is noticed right away,
/// otherwise within one receive timeout.
///
pub struct AfPacketNet {
    interfaces: Vec<Interface>,
    sockets: Vec<BoundSocket>,
    shutdown: Arc<AtomicBool>,
    buffer: Vec<u8>,
    // Port polled first on the next receive, so one busy port cannot starve the others.
    next: usize,
}

impl AfPacketNet {
    /// Opens a socket on each of `names`, or on every eligible interface when `names` is
    /// `None`. See `system_interfaces` for what is eligible.
    pub fn open(names: Option<&[String]>, shutdown: Arc<AtomicBool>) -> Result<Self, NetError> {
        let available = system_interfaces()?;
        let interfaces = match names {
            None => available,
            Some(names) => {
                let mut chosen = Vec::with_capacity(names.len());
                for name in names {
                    match available.iter().find(|i| i.name() == name.as_str()) {
                        Some(interface) => chosen.push(interface.clone()),
                        None => return Err(NetError::UnknownPort(name.clone())),
                    }
                }
                chosen
            }
        };

        let mut sockets = Vec::with_capacity(interfaces.len());
        for interface in &interfaces {
            let name = CString::new(interface.name())
                .map_err(|err| NetError::Io(io::Error::new(io::ErrorKind::InvalidInput, err)))?;
            let mut socket = Socket::new()?;
            socket.set_nonblocking(true)?;
            sockets.push(socket.bind(&name)?);
            info!("opened {}", interface);
        }

        Ok(AfPacketNet {
            interfaces,
            sockets,
            shutdown,
            buffer: vec![0; RECV_BUFFER_LEN],
            next: 0,
        })
    }

    // Reads one frame from `index`, `None` if there is nothing usable right now.
    fn read_from(&mut self, index: usize) -> Result<Option<Received>, NetError> {
        let (len, pkttype) = match self.sockets[index].recv(&mut self.buffer) {
            Ok(received) => received,
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if !BoundSocket::is_for_host(pkttype) {
            return Ok(None);
        }
        let port = self.interfaces[index].name().to_string();
        match decode(&self.buffer, len) {
            Ok(frame) => Ok(Some(Received::Frame { port, frame })),
            Err(reason) => {
                debug!("{}: {}", port, reason);
                Ok(None)
            }
        }
    }
}

// `len` is the frame's length on the wire; it exceeds the buffer when the frame was cut.
fn decode(buffer: &[u8], len: usize) -> Result<EthernetFrame, String> {
    if len > buffer.len() {
        return Err(format!("dropping truncated {} byte frame", len));
    }
    EthernetFrame::from_buffer(buffer[..len].to_vec(), 0).map_err(String::from)
}

impl NetIo for AfPacketNet {
    fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    fn recv(&mut self, timeout: Duration) -> Result<Received, NetError> {
        if self.shutdown.load(Ordering::SeqCst) || self.sockets.is_empty() {
            return Ok(Received::Shutdown);
        }

        let mut fds: Vec<libc::pollfd> = self
            .sockets
            .iter()
            .map(|socket| libc::pollfd {
                fd: socket.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();
        // Rounded up, so a deadline under a millisecond away does not poll with zero.
        let timeout_ms = ((timeout.as_micros() + 999) / 1000)
            .min(libc::c_int::max_value() as u128) as libc::c_int;

        // `fds` is owned here and its exact length is passed along.
        // Resources:
        // man 2 poll
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(if self.shutdown.load(Ordering::SeqCst) {
                    Received::Shutdown
                } else {
                    Received::Timeout
                });
            }
            return Err(err.into());
        }
        if self.shutdown.load(Ordering::SeqCst) {
            return Ok(Received::Shutdown);
        }

        let count = self.sockets.len();
        for offset in 0..count {
            let index = (self.next + offset) % count;
            if fds[index].revents & libc::POLLIN == 0 {
                continue;
            }
            if let Some(received) = self.read_from(index)? {
                self.next = (index + 1) % count;
                return Ok(received);
            }
        }
        Ok(Received::Timeout)
    }

    fn send(&mut self, port: &str, frame: &EthernetFrame) -> Result<(), NetError> {
        let index = self
            .interfaces
            .iter()
            .position(|i| i.name() == port)
            .ok_or_else(|| NetError::UnknownPort(port.to_string()))?;
        self.sockets[index].send(frame.as_bytes())?;
        Ok(())
    }

    fn shutdown(&mut self) {
        info!("closing {} sockets", self.sockets.len());
        self.sockets.clear();
    }
}
