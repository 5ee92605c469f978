use crate::*;
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};

/// Length of an untagged Ethernet II header.
pub const ETHERNET_HEADER_LEN: usize = 14;

#[derive(Clone, Debug)]
pub struct EthernetFrame {
    pub data: PacketData,
    pub layer2_offset: usize,
    pub payload_offset: usize,
}

impl Packet for EthernetFrame {}

impl EthernetFrame {
    pub fn from_buffer(
        frame: PacketData,
        layer2_offset: usize,
    ) -> Result<EthernetFrame, &'static str> {
        // 0                    6                    12                      14
        // |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
        // 802.1Q tagged frames are not recognised, their ether type reads as 0x8100.
        if frame.len() < layer2_offset + ETHERNET_HEADER_LEN {
            return Err("Frame is less than the minimum of 14 bytes");
        }

        Ok(EthernetFrame {
            data: frame,
            layer2_offset,
            payload_offset: layer2_offset + ETHERNET_HEADER_LEN,
        })
    }

    /// A zeroed header with no payload.
    pub fn empty() -> EthernetFrame {
        EthernetFrame {
            data: vec![0; ETHERNET_HEADER_LEN],
            layer2_offset: 0,
            payload_offset: ETHERNET_HEADER_LEN,
        }
    }

    pub fn dest_mac(&self) -> MacAddr {
        MacAddr::new(self.header_bytes(0))
    }

    pub fn src_mac(&self) -> MacAddr {
        MacAddr::new(self.header_bytes(6))
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        let start = self.layer2_offset;
        self.data[start..start + 6].copy_from_slice(&mac.bytes);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        let start = self.layer2_offset + 6;
        self.data[start..start + 6].copy_from_slice(&mac.bytes);
    }

    pub fn ether_type(&self) -> u16 {
        let start = self.layer2_offset + 12;
        u16::from_be_bytes([self.data[start], self.data[start + 1]])
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        let start = self.layer2_offset + 12;
        self.data[start..start + 2].copy_from_slice(&ether_type.to_be_bytes());
    }

    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..])
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        self.data.reserve_exact(payload.len());
        self.data.extend_from_slice(payload);
    }

    /// Bytes from the start of the Ethernet header, which is what goes on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.layer2_offset..]
    }

    /// Wraps the layer 3 bytes of `ipv4` in a fresh header addressed `src` -> `dest`.
    pub fn encap_ipv4(ipv4: &Ipv4Packet, src: MacAddr, dest: MacAddr) -> EthernetFrame {
        let mut frame = EthernetFrame::empty();
        frame.set_payload(ipv4.as_bytes());
        frame.set_src_mac(src);
        frame.set_dest_mac(dest);
        frame.set_ether_type(IPV4_ETHER_TYPE);
        frame
    }

    fn header_bytes(&self, offset: usize) -> [u8; 6] {
        let start = self.layer2_offset + offset;
        // from_buffer guarantees the full header is present
        self.data[start..start + 6].try_into().unwrap_or([0; 6])
    }
}

/// EthernetFrames are considered the same if they have the same data from the layer 2
/// header and onward.
impl PartialEq for EthernetFrame {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for EthernetFrame {}

impl TryFrom<Ipv4Packet> for EthernetFrame {
    type Error = &'static str;

    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        match packet.layer2_offset {
            Some(layer2_offset) => EthernetFrame::from_buffer(packet.data, layer2_offset),
            None => Err("IPv4 Packet does not contain an Ethernet Frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn ethernet_frame() {
        let data: Vec<u8> = vec![0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 1, 2, 3, 4, 5, 6, 8, 6];
        let frame = EthernetFrame::from_buffer(data, 0).unwrap();
        assert_eq!(
            frame.dest_mac(),
            MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0xff, 0xff])
        );
        assert_eq!(frame.src_mac(), MacAddr::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(frame.ether_type(), ARP_ETHER_TYPE);
        assert_eq!(frame.payload().len(), 0);
    }

    #[test]
    #[should_panic(expected = "Frame is less than the minimum of 14 bytes")]
    fn invalid_data_length() {
        let data: Vec<u8> = vec![0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 1, 2, 3, 4, 5, 6];
        let _frame = EthernetFrame::from_buffer(data, 0).unwrap();
    }

    #[test]
    fn set_payload_replaces_old_payload() {
        let mut frame = EthernetFrame::empty();
        frame.set_payload(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        frame.set_payload(&[9, 8]);
        assert_eq!(frame.payload(), vec![9, 8]);
        assert_eq!(frame.data.len(), ETHERNET_HEADER_LEN + 2);
    }

    #[test]
    fn set_macs() {
        let mut frame = EthernetFrame::empty();
        let dest = MacAddr::new([0x98, 0x88, 0x18, 0x12, 0xb4, 0xdf]);
        let src = MacAddr::new([2, 0, 0, 0, 0, 7]);
        frame.set_dest_mac(dest);
        frame.set_src_mac(src);
        assert_eq!(frame.dest_mac(), dest);
        assert_eq!(frame.src_mac(), src);
    }

    #[test]
    fn offset_header_is_respected() {
        let mut data = vec![0xaa; 4];
        data.extend_from_slice(&[1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 0x08, 0x00, 0x45]);
        let frame = EthernetFrame::from_buffer(data, 4).unwrap();
        assert_eq!(frame.dest_mac(), MacAddr::new([1; 6]));
        assert_eq!(frame.ether_type(), IPV4_ETHER_TYPE);
        assert_eq!(frame.payload(), vec![0x45]);
        assert_eq!(frame.as_bytes().len(), 15);
    }

    #[test]
    fn encap_ipv4() {
        let mut packet = Ipv4Packet::empty();
        packet.set_dest_addr(Ipv4Addr::new(10, 0, 0, 1));
        let src = MacAddr::new([2, 0, 0, 0, 0, 1]);
        let frame = EthernetFrame::encap_ipv4(&packet, src, MacAddr::broadcast());
        assert_eq!(frame.ether_type(), IPV4_ETHER_TYPE);
        assert_eq!(frame.src_mac(), src);
        assert!(frame.dest_mac().is_broadcast());
        assert_eq!(frame.payload(), packet.as_bytes());

        let decoded = Ipv4Packet::try_from(frame).unwrap();
        assert_eq!(decoded.dest_addr(), Ipv4Addr::new(10, 0, 0, 1));
    }
}
