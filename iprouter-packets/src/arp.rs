use crate::{EthernetFrame, MacAddr, ARP_ETHER_TYPE, IPV4_ETHER_TYPE};
use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::net::Ipv4Addr;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_RANGE: (usize, usize) = (4, 5);
const PROTOCOL_ADDR_LEN_RANGE: (usize, usize) = (5, 6);
const OPCODE_RANGE: (usize, usize) = (6, 8);

/// Payload length of an Ethernet/IPv4 ARP packet.
pub const ARP_IPV4_PAYLOAD_LEN: usize = 28;

///
/// EthernetFrame wrapper with getters/setters for the packet structure described in RFC 826
/// https://tools.ietf.org/html/rfc826
///
/// Address fields are located through the length fields, so the view works for any
/// hardware/protocol pair. The typed `*_ipv4_addr`/`*_mac_addr` accessors return `None`
/// unless the packet is Ethernet/IPv4.
///
#[derive(Clone)]
pub struct ArpFrame {
    frame: EthernetFrame,
}

impl ArpFrame {
    /// Zeroed packet with room for the given address lengths.
    pub fn new(hardware_addr_len: u8, protocol_addr_len: u8) -> Self {
        let payload_len = 8 + 2 * usize::from(hardware_addr_len) + 2 * usize::from(protocol_addr_len);

        let mut frame = EthernetFrame::empty();
        frame.set_payload(&vec![0; payload_len]);
        frame.set_ether_type(ARP_ETHER_TYPE);

        let mut arp_frame = ArpFrame { frame };
        arp_frame.set_hardware_addr_len(hardware_addr_len);
        arp_frame.set_protocol_addr_len(protocol_addr_len);
        arp_frame
    }

    /// Broadcast who-has `target_ip`, asked by `sender_mac`/`sender_ip`.
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        let mut arp = ArpFrame::ethernet_ipv4(ArpOp::Request);
        arp.set_sender_hardware_addr(sender_mac);
        arp.set_sender_ipv4_addr(sender_ip);
        arp.set_target_hardware_addr(MacAddr::zero());
        arp.set_target_ipv4_addr(target_ip);
        arp.frame.set_src_mac(sender_mac);
        arp.frame.set_dest_mac(MacAddr::broadcast());
        arp
    }

    /// Unicast answer telling `target_mac`/`target_ip` that `sender_ip` is at `sender_mac`.
    pub fn reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        let mut arp = ArpFrame::ethernet_ipv4(ArpOp::Reply);
        arp.set_sender_hardware_addr(sender_mac);
        arp.set_sender_ipv4_addr(sender_ip);
        arp.set_target_hardware_addr(target_mac);
        arp.set_target_ipv4_addr(target_ip);
        arp.frame.set_src_mac(sender_mac);
        arp.frame.set_dest_mac(target_mac);
        arp
    }

    fn ethernet_ipv4(op: ArpOp) -> Self {
        let mut arp = ArpFrame::new(6, 4);
        arp.set_hardware_type(ArpHardwareType::Ethernet as u16);
        arp.set_protocol_type(IPV4_ETHER_TYPE);
        arp.set_opcode(op as u16);
        arp
    }

    pub fn hardware_type(&self) -> u16 {
        self.read_u16(HARDWARE_TYPE_RANGE)
    }

    pub fn protocol_type(&self) -> u16 {
        self.read_u16(PROTOCOL_TYPE_RANGE)
    }

    pub fn hardware_addr_len(&self) -> u8 {
        self.arp_data(HARDWARE_ADDR_LEN_RANGE)[0]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        self.arp_data(PROTOCOL_ADDR_LEN_RANGE)[0]
    }

    pub fn opcode(&self) -> u16 {
        self.read_u16(OPCODE_RANGE)
    }

    /// The opcode, if it is one this crate knows.
    pub fn op(&self) -> Option<ArpOp> {
        match self.opcode() {
            1 => Some(ArpOp::Request),
            2 => Some(ArpOp::Reply),
            _ => None,
        }
    }

    /// Hardware type is Ethernet and protocol type is IPv4, with matching lengths.
    pub fn is_ethernet_ipv4(&self) -> bool {
        self.hardware_type() == ArpHardwareType::Ethernet as u16
            && self.protocol_type() == IPV4_ETHER_TYPE
            && self.hardware_addr_len() == 6
            && self.protocol_addr_len() == 4
    }

    pub fn sender_hardware_addr(&self) -> &[u8] {
        self.arp_data(self.sender_hardware_addr_range())
    }

    pub fn sender_protocol_addr(&self) -> &[u8] {
        self.arp_data(self.sender_protocol_addr_range())
    }

    pub fn target_hardware_addr(&self) -> &[u8] {
        self.arp_data(self.target_hardware_addr_range())
    }

    pub fn target_protocol_addr(&self) -> &[u8] {
        self.arp_data(self.target_protocol_addr_range())
    }

    pub fn sender_mac_addr(&self) -> Option<MacAddr> {
        self.mac_field(self.sender_hardware_addr())
    }

    pub fn sender_ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4_field(self.sender_protocol_addr())
    }

    pub fn target_mac_addr(&self) -> Option<MacAddr> {
        self.mac_field(self.target_hardware_addr())
    }

    pub fn target_ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4_field(self.target_protocol_addr())
    }

    pub fn set_hardware_type(&mut self, htype: u16) {
        self.set_arp_data(&htype.to_be_bytes(), HARDWARE_TYPE_RANGE);
    }

    pub fn set_protocol_type(&mut self, ptype: u16) {
        self.set_arp_data(&ptype.to_be_bytes(), PROTOCOL_TYPE_RANGE);
    }

    pub fn set_hardware_addr_len(&mut self, len: u8) {
        self.set_arp_data(&[len], HARDWARE_ADDR_LEN_RANGE);
    }

    pub fn set_protocol_addr_len(&mut self, len: u8) {
        self.set_arp_data(&[len], PROTOCOL_ADDR_LEN_RANGE);
    }

    pub fn set_opcode(&mut self, code: u16) {
        self.set_arp_data(&code.to_be_bytes(), OPCODE_RANGE);
    }

    pub fn set_sender_hardware_addr(&mut self, addr: MacAddr) {
        let range = self.sender_hardware_addr_range();
        self.set_arp_data(&addr.bytes, range);
    }

    pub fn set_sender_ipv4_addr(&mut self, addr: Ipv4Addr) {
        let range = self.sender_protocol_addr_range();
        self.set_arp_data(&addr.octets(), range);
    }

    pub fn set_target_hardware_addr(&mut self, addr: MacAddr) {
        let range = self.target_hardware_addr_range();
        self.set_arp_data(&addr.bytes, range);
    }

    pub fn set_target_ipv4_addr(&mut self, addr: Ipv4Addr) {
        let range = self.target_protocol_addr_range();
        self.set_arp_data(&addr.octets(), range);
    }

    pub fn frame_ref(&self) -> &EthernetFrame {
        &self.frame
    }

    // Move ownership of the frame back to the caller
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }

    fn mac_field(&self, bytes: &[u8]) -> Option<MacAddr> {
        if !self.is_ethernet_ipv4() {
            return None;
        }
        bytes.try_into().ok().map(MacAddr::new)
    }

    fn ipv4_field(&self, bytes: &[u8]) -> Option<Ipv4Addr> {
        if !self.is_ethernet_ipv4() {
            return None;
        }
        let octets: [u8; 4] = bytes.try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    fn read_u16(&self, range: (usize, usize)) -> u16 {
        let bytes = self.arp_data(range);
        u16::from_be_bytes([bytes[0], bytes[1]])
    }

    // Payload bytes in [start, end)
    fn arp_data(&self, (start, end): (usize, usize)) -> &[u8] {
        let base = self.frame.payload_offset;
        &self.frame.data[base + start..base + end]
    }

    fn set_arp_data(&mut self, bytes: &[u8], (start, end): (usize, usize)) {
        let base = self.frame.payload_offset;
        self.frame.data[base + start..base + end].copy_from_slice(bytes);
    }

    fn sender_hardware_addr_range(&self) -> (usize, usize) {
        let hlen = usize::from(self.hardware_addr_len());
        (8, 8 + hlen)
    }

    fn sender_protocol_addr_range(&self) -> (usize, usize) {
        let (_, start) = self.sender_hardware_addr_range();
        (start, start + usize::from(self.protocol_addr_len()))
    }

    fn target_hardware_addr_range(&self) -> (usize, usize) {
        let (_, start) = self.sender_protocol_addr_range();
        (start, start + usize::from(self.hardware_addr_len()))
    }

    fn target_protocol_addr_range(&self) -> (usize, usize) {
        let (_, start) = self.target_hardware_addr_range();
        (start, start + usize::from(self.protocol_addr_len()))
    }
}

impl fmt::Debug for ArpFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArpFrame")
            .field("op", &self.opcode())
            .field("sender_mac", &self.sender_mac_addr())
            .field("sender_ip", &self.sender_ipv4_addr())
            .field("target_mac", &self.target_mac_addr())
            .field("target_ip", &self.target_ipv4_addr())
            .finish()
    }
}

impl TryFrom<EthernetFrame> for ArpFrame {
    type Error = &'static str;

    ///
    /// Decorates the given EthernetFrame with ArpFrame getters/setters.
    /// Validates
    /// - The frame has an ARP ether type
    /// - The frame has a payload big enough for the hardware/protocol address lengths
    ///
    /// Trailing bytes past the ARP body (Ethernet minimum-size padding) are dropped.
    ///
    fn try_from(mut frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != ARP_ETHER_TYPE {
            return Err("Frame does not have ARP ether type.");
        };

        let payload_len = frame.data.len() - frame.payload_offset;
        if payload_len < 8 {
            return Err("Frame payload is too small");
        }

        let base = frame.payload_offset;
        let hlen = usize::from(frame.data[base + 4]);
        let plen = usize::from(frame.data[base + 5]);
        let arp_len = 8 + 2 * hlen + 2 * plen;
        if payload_len < arp_len {
            return Err("Frame payload doesn't match address length fields");
        }
        frame.data.truncate(base + arp_len);

        Ok(ArpFrame { frame })
    }
}
