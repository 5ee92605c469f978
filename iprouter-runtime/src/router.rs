use crate::arp_cache::ArpCache;
use crate::config::{RouterConfig, StaticRoute};
use crate::error::{ConfigError, NetError};
use crate::forwarding::ForwardingTable;
use crate::icmp::{IcmpError, IcmpGenerator};
use crate::interface::Interface;
use crate::net::{NetIo, Received};
use crate::pending::{PendingQueue, PendingResolution};
use iprouter_packets::{
    ArpFrame, ArpOp, EthernetFrame, Frame, IcmpMessage, Ipv4Packet, MacAddr, UnreachableCode,
};
use log::{debug, info, warn};
use std::cmp;
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use std::time::Instant;

/// Where a datagram on the send path came from. Only forwarded traffic earns a
/// Net-Unreachable when it has no route; anything the router built itself is dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Origin {
    Forwarded,
    Local,
    Error,
}

///
/// A static IPv4 router over some `NetIo`.
///
/// Owns the forwarding table, the ARP cache and the pending-resolution queue. Everything
/// runs on the caller's thread: `run` alternates between servicing ARP retries and
/// waiting for the next frame. Methods that depend on time take the current `Instant`.
///
pub struct Router<N: NetIo> {
    net: N,
    forwarding: ForwardingTable,
    arp_cache: ArpCache,
    pending: PendingQueue,
    icmp: IcmpGenerator,
    config: RouterConfig,
}

impl<N: NetIo> Router<N> {
    pub fn new(
        net: N,
        routes: &[StaticRoute],
        config: RouterConfig,
    ) -> Result<Router<N>, ConfigError> {
        if net.interfaces().is_empty() {
            return Err(ConfigError::NoInterfaces);
        }
        let forwarding = ForwardingTable::build(net.interfaces(), routes)?;

        for interface in net.interfaces() {
            info!("interface {}", interface);
        }
        for entry in forwarding.entries() {
            info!("route {}", entry);
        }

        let local_addrs = net.interfaces().iter().map(Interface::ip).collect();
        let icmp = IcmpGenerator::new(config.icmp_ttl, local_addrs);

        Ok(Router {
            net,
            forwarding,
            arp_cache: ArpCache::new(),
            pending: PendingQueue::new(),
            icmp,
            config,
        })
    }

    /// Runs until the substrate reports shutdown or fails to receive. The substrate is
    /// shut down either way.
    pub fn run(&mut self) -> Result<(), NetError> {
        info!(
            "router started on {} interfaces",
            self.net.interfaces().len()
        );
        let result = self.event_loop();
        self.net.shutdown();
        match &result {
            Ok(()) => info!("router stopped"),
            Err(err) => warn!("router stopped: {}", err),
        }
        result
    }

    fn event_loop(&mut self) -> Result<(), NetError> {
        loop {
            let now = Instant::now();
            self.service_pending(now);
            // Wake up in time for the next ARP retry even if the link stays idle.
            let timeout = match self.pending.next_deadline(self.config.retry_interval) {
                Some(deadline) => cmp::min(
                    self.config.recv_timeout,
                    deadline.saturating_duration_since(now),
                ),
                None => self.config.recv_timeout,
            };
            match self.net.recv(timeout)? {
                Received::Frame { port, frame } => self.handle_frame(&port, frame, Instant::now()),
                Received::Timeout => {}
                Received::Shutdown => return Ok(()),
            }
        }
    }

    /// Processes one inbound frame that arrived on `port`.
    pub fn handle_frame(&mut self, port: &str, frame: EthernetFrame, now: Instant) {
        match Frame::from(frame) {
            Frame::Arp(arp) => self.handle_arp(port, &arp),
            Frame::Ipv4(packet) => self.handle_ipv4(port, packet, now),
            Frame::Other(frame) => debug!(
                "{}: ignoring frame with ether type {:#06x}",
                port,
                frame.ether_type()
            ),
        }
    }

    fn handle_arp(&mut self, port: &str, arp: &ArpFrame) {
        if !arp.is_ethernet_ipv4() {
            debug!("{}: ignoring non Ethernet/IPv4 ARP {:?}", port, arp);
            return;
        }
        let (sender_mac, sender_ip, target_ip) = match (
            arp.sender_mac_addr(),
            arp.sender_ipv4_addr(),
            arp.target_ipv4_addr(),
        ) {
            (Some(mac), Some(sender), Some(target)) => (mac, sender, target),
            _ => return,
        };

        if self.arp_cache.update(sender_ip, sender_mac) {
            info!("arp cache: {} is at {}", sender_ip, sender_mac);
        }

        let owner = match self.net.interface_by_ip(target_ip) {
            Some(owner) => owner.clone(),
            None => return,
        };
        match arp.op() {
            Some(ArpOp::Request) => {
                debug!("{}: {} is at {}, telling {}", port, owner.ip(), owner.mac(), sender_ip);
                let reply = ArpFrame::reply(owner.mac(), owner.ip(), sender_mac, sender_ip);
                self.transmit(port, reply.frame_ref());
            }
            Some(ArpOp::Reply) => self.resolved(sender_ip, sender_mac),
            None => debug!("{}: ignoring ARP opcode {}", port, arp.opcode()),
        }
    }

    // Flushes everything waiting on `ip`.
    fn resolved(&mut self, ip: Ipv4Addr, mac: MacAddr) {
        let PendingResolution {
            interface, packets, ..
        } = match self.pending.remove(ip) {
            Some(entry) => entry,
            None => return,
        };
        let src_mac = match self.net.interface_by_name(&interface) {
            Some(egress) => egress.mac(),
            None => return,
        };
        info!(
            "{} resolved to {}, sending {} queued packets on {}",
            ip,
            mac,
            packets.len(),
            interface
        );
        for packet in &packets {
            let frame = EthernetFrame::encap_ipv4(packet, src_mac, mac);
            self.transmit(&interface, &frame);
        }
    }

    fn handle_ipv4(&mut self, port: &str, mut packet: Ipv4Packet, now: Instant) {
        if !packet.validate_checksum() {
            debug!("{}: dropping IPv4 packet with bad header checksum", port);
            return;
        }
        let dest = packet.dest_addr();

        if self.net.interface_by_ip(dest).is_some() {
            self.handle_local(packet, now);
            return;
        }
        if dest.is_broadcast() || dest.is_multicast() {
            debug!("{}: not forwarding packet for {}", port, dest);
            return;
        }

        let ttl = packet.ttl().saturating_sub(1);
        packet.set_ttl(ttl);
        packet.set_checksum();
        if ttl == 0 {
            debug!(
                "{}: TTL expired on packet {} -> {} id {}",
                port,
                packet.src_addr(),
                dest,
                packet.identification()
            );
            self.send_error(IcmpError::TimeExceeded, &packet, now);
            return;
        }
        self.send_ipv4(packet, Origin::Forwarded, now);
    }

    // Packets addressed to one of the router's own IPs. Only pings are answered.
    fn handle_local(&mut self, packet: Ipv4Packet, now: Instant) {
        if let Ok(message) = IcmpMessage::try_from(packet.clone()) {
            if let Some(reply) = self.icmp.echo_reply(&message) {
                debug!(
                    "echo reply {} -> {} seq {}",
                    reply.src_addr(),
                    reply.dest_addr(),
                    message.sequence()
                );
                self.send_ipv4(reply, Origin::Local, now);
                return;
            }
        }
        self.send_error(IcmpError::Unreachable(UnreachableCode::Port), &packet, now);
    }

    fn send_error(&mut self, kind: IcmpError, offending: &Ipv4Packet, now: Instant) {
        match self.icmp.error(kind, offending) {
            Some(error) => {
                debug!("{:?} to {}", kind, error.dest_addr());
                self.send_ipv4(error, Origin::Error, now);
            }
            None => debug!(
                "not sending {:?} about packet {} -> {}",
                kind,
                offending.src_addr(),
                offending.dest_addr()
            ),
        }
    }

    fn send_ipv4(&mut self, mut packet: Ipv4Packet, origin: Origin, now: Instant) {
        let dest = packet.dest_addr();
        let entry = match self.forwarding.lookup(dest) {
            Some(entry) => entry.clone(),
            None => {
                if origin == Origin::Forwarded {
                    debug!("no route to {}", dest);
                    self.send_error(IcmpError::Unreachable(UnreachableCode::Net), &packet, now);
                } else {
                    debug!("no route to {}, dropping {:?} packet", dest, origin);
                }
                return;
            }
        };
        // ForwardingTable::build checked every route's interface
        let egress = match self.net.interface_by_name(&entry.interface) {
            Some(egress) => egress.clone(),
            None => return,
        };

        if packet.src_addr().is_unspecified() {
            packet.set_src_addr(egress.ip());
        }
        packet.set_checksum();

        let next_hop = entry.next_hop_for(dest);
        match self.arp_cache.lookup(next_hop) {
            Some(mac) => {
                let frame = EthernetFrame::encap_ipv4(&packet, egress.mac(), mac);
                self.transmit(egress.name(), &frame);
            }
            None => self.enqueue(next_hop, &egress, packet, now),
        }
    }

    fn enqueue(&mut self, next_hop: Ipv4Addr, egress: &Interface, packet: Ipv4Packet, now: Instant) {
        if let Some(entry) = self.pending.get_mut(next_hop) {
            entry.packets.push(packet);
            debug!(
                "{} packets waiting on {}",
                entry.packets.len(),
                next_hop
            );
            return;
        }

        let mut entry = PendingResolution::new(egress.name(), now, self.config.arp_retries);
        entry.packets.push(packet);
        if entry.retries_left > 0 {
            entry.retries_left -= 1;
            self.send_arp_request(egress, next_hop);
        }
        self.pending.push(next_hop, entry);
    }

    /// Retries or expires every pending resolution whose last request is at least one
    /// retry interval old, oldest first.
    pub fn service_pending(&mut self, now: Instant) {
        // Entries pushed during this pass are not revisited.
        let mut budget = self.pending.len();
        while budget > 0 {
            budget -= 1;
            let due = match self.pending.peek_oldest() {
                Some((_, entry)) => {
                    now.saturating_duration_since(entry.last_sent) >= self.config.retry_interval
                }
                None => false,
            };
            if !due {
                break;
            }
            let (next_hop, mut entry) = match self.pending.pop_oldest() {
                Some(oldest) => oldest,
                None => break,
            };

            if entry.retries_left > 0 {
                entry.retries_left -= 1;
                entry.last_sent = now;
                if let Some(egress) = self.net.interface_by_name(&entry.interface).cloned() {
                    self.send_arp_request(&egress, next_hop);
                }
                self.pending.push(next_hop, entry);
            } else {
                info!(
                    "{} did not answer ARP, dropping {} packets",
                    next_hop,
                    entry.packets.len()
                );
                for packet in &entry.packets {
                    self.send_error(IcmpError::Unreachable(UnreachableCode::Host), packet, now);
                }
            }
        }
    }

    fn send_arp_request(&mut self, egress: &Interface, target: Ipv4Addr) {
        debug!("{}: who has {}, tell {}", egress.name(), target, egress.ip());
        let request = ArpFrame::request(egress.mac(), egress.ip(), target);
        self.transmit(egress.name(), request.frame_ref());
    }

    fn transmit(&mut self, port: &str, frame: &EthernetFrame) {
        if let Err(err) = self.net.send(port, frame) {
            warn!("{}: dropping outbound frame: {}", port, err);
        }
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn forwarding_table(&self) -> &ForwardingTable {
        &self.forwarding
    }

    pub fn arp_cache(&self) -> &ArpCache {
        &self.arp_cache
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }
}
