use crate::error::NetError;
use crate::interface::Interface;
use iprouter_packets::EthernetFrame;
use std::net::Ipv4Addr;
use std::time::Duration;

mod channel;
pub use self::channel::*;

/// Outcome of waiting for the next inbound frame.
#[derive(Debug)]
pub enum Received {
    /// A frame arrived on the named port.
    Frame { port: String, frame: EthernetFrame },
    /// Nothing arrived within the timeout.
    Timeout,
    /// The substrate is going away; the event loop should stop.
    Shutdown,
}

///
/// The packet substrate the router runs on: a fixed set of ports, a blocking receive with
/// a timeout, and a synchronous send.
///
pub trait NetIo {
    /// The router's ports, enumerated once when the substrate was opened.
    fn interfaces(&self) -> &[Interface];

    fn recv(&mut self, timeout: Duration) -> Result<Received, NetError>;

    fn send(&mut self, port: &str, frame: &EthernetFrame) -> Result<(), NetError>;

    fn interface_by_name(&self, name: &str) -> Option<&Interface> {
        self.interfaces().iter().find(|i| i.name() == name)
    }

    fn interface_by_ip(&self, ip: Ipv4Addr) -> Option<&Interface> {
        self.interfaces().iter().find(|i| i.ip() == ip)
    }

    /// Releases whatever the substrate holds. Called once, when the event loop exits.
    fn shutdown(&mut self) {}
}
