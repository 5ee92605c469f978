use super::{NetIo, Received};
use crate::error::NetError;
use crate::interface::Interface;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use iprouter_packets::EthernetFrame;
use std::time::Duration;

/// In-memory substrate. Frames injected through the paired `ChannelPeer` are received by
/// the router, and every frame the router sends shows up on the peer's `sent` channel.
pub struct ChannelNet {
    interfaces: Vec<Interface>,
    inbound: Receiver<(String, EthernetFrame)>,
    outbound: Sender<(String, EthernetFrame)>,
}

/// The far side of a `ChannelNet`. Dropping `injector` shuts the router down once the
/// frames already injected have been drained.
pub struct ChannelPeer {
    pub injector: Sender<(String, EthernetFrame)>,
    pub sent: Receiver<(String, EthernetFrame)>,
}

impl ChannelNet {
    pub fn new(interfaces: Vec<Interface>) -> (ChannelNet, ChannelPeer) {
        let (injector, inbound) = channel::unbounded();
        let (outbound, sent) = channel::unbounded();
        let net = ChannelNet {
            interfaces,
            inbound,
            outbound,
        };
        (net, ChannelPeer { injector, sent })
    }
}

impl NetIo for ChannelNet {
    fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    fn recv(&mut self, timeout: Duration) -> Result<Received, NetError> {
        match self.inbound.recv_timeout(timeout) {
            Ok((port, frame)) => Ok(Received::Frame { port, frame }),
            Err(RecvTimeoutError::Timeout) => Ok(Received::Timeout),
            Err(RecvTimeoutError::Disconnected) => Ok(Received::Shutdown),
        }
    }

    fn send(&mut self, port: &str, frame: &EthernetFrame) -> Result<(), NetError> {
        if self.interface_by_name(port).is_none() {
            return Err(NetError::UnknownPort(port.to_string()));
        }
        self.outbound
            .send((port.to_string(), frame.clone()))
            .map_err(|_| NetError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iprouter_packets::MacAddr;
    use std::net::Ipv4Addr;

    fn net() -> (ChannelNet, ChannelPeer) {
        let eth0 = Interface::new(
            "eth0",
            MacAddr::new([2, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(10, 0, 0, 1),
            24,
        )
        .unwrap();
        ChannelNet::new(vec![eth0])
    }

    #[test]
    fn injected_frames_are_received() {
        let (mut net, peer) = net();
        peer.injector
            .send(("eth0".to_string(), EthernetFrame::empty()))
            .unwrap();
        match net.recv(Duration::from_millis(10)).unwrap() {
            Received::Frame { port, frame } => {
                assert_eq!(port, "eth0");
                assert_eq!(frame, EthernetFrame::empty());
            }
            other => panic!("unexpected {:?}", other),
        }
        match net.recv(Duration::from_millis(10)).unwrap() {
            Received::Timeout => {}
            other => panic!("unexpected {:?}", other),
        }
        drop(peer);
        match net.recv(Duration::from_millis(10)).unwrap() {
            Received::Shutdown => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn sends_are_captured() {
        let (mut net, peer) = net();
        net.send("eth0", &EthernetFrame::empty()).unwrap();
        let (port, _) = peer.sent.try_recv().unwrap();
        assert_eq!(port, "eth0");

        match net.send("eth1", &EthernetFrame::empty()) {
            Err(NetError::UnknownPort(port)) => assert_eq!(port, "eth1"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn lookups() {
        let (net, _peer) = net();
        assert!(net.interface_by_name("eth0").is_some());
        assert!(net.interface_by_ip(Ipv4Addr::new(10, 0, 0, 1)).is_some());
        assert!(net.interface_by_ip(Ipv4Addr::new(10, 0, 0, 2)).is_none());
    }
}
