use crate::*;
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

/// Length of an IPv4 header without options.
pub const IPV4_MIN_HEADER_LEN: usize = 20;

#[derive(Clone, Debug)]
pub struct Ipv4Packet {
    pub data: PacketData,
    pub layer2_offset: Option<usize>,
    pub layer3_offset: usize,
    pub payload_offset: usize,
}

impl Packet for Ipv4Packet {}

impl Ipv4Packet {
    pub fn from_buffer(
        mut data: PacketData,
        layer2_offset: Option<usize>,
        layer3_offset: usize,
    ) -> Result<Ipv4Packet, &'static str> {
        if data.len() < layer3_offset + IPV4_MIN_HEADER_LEN {
            return Err("Data is too short to be an IPv4 Packet");
        }

        let version = data[layer3_offset] >> 4;
        if version != 4 {
            return Err("Packet has incorrect version, is not Ipv4Packet");
        }

        let header_len = usize::from(data[layer3_offset] & 0x0F) * 4;
        if header_len < IPV4_MIN_HEADER_LEN {
            return Err("Packet has an IHL below the minimum header length");
        }

        let total_len =
            usize::from(u16::from_be_bytes([data[layer3_offset + 2], data[layer3_offset + 3]]));
        if total_len < header_len || data.len() < layer3_offset + total_len {
            return Err("Packet has invalid total length field");
        }
        // Short frames are padded on the wire; the padding is not part of the datagram.
        data.truncate(layer3_offset + total_len);

        Ok(Ipv4Packet {
            data,
            layer2_offset,
            layer3_offset,
            payload_offset: layer3_offset + header_len,
        })
    }

    /// A minimal 20 byte header with no payload: version 4, IHL 5, every other field zero.
    pub fn empty() -> Ipv4Packet {
        let mut data = vec![0; IPV4_MIN_HEADER_LEN];
        data[0] = 0x45;
        data[3] = IPV4_MIN_HEADER_LEN as u8;
        Ipv4Packet {
            data,
            layer2_offset: None,
            layer3_offset: 0,
            payload_offset: IPV4_MIN_HEADER_LEN,
        }
    }

    /// Builds a datagram carrying `payload`, with the given addressing and TTL.
    pub fn with_payload(
        src: Ipv4Addr,
        dest: Ipv4Addr,
        protocol: IpProtocol,
        ttl: u8,
        payload: &[u8],
    ) -> Ipv4Packet {
        let mut packet = Ipv4Packet::empty();
        packet.set_src_addr(src);
        packet.set_dest_addr(dest);
        packet.set_protocol(protocol);
        packet.set_ttl(ttl);
        packet.set_payload(payload);
        packet.set_checksum();
        packet
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        self.addr_at(12)
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.set_addr_at(12, addr);
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        self.addr_at(16)
    }

    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.set_addr_at(16, addr);
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.data[self.layer3_offset + 9])
    }

    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.data[self.layer3_offset + 9] = protocol.into();
    }

    pub fn total_len(&self) -> u16 {
        self.read_u16(2)
    }

    pub fn ttl(&self) -> u8 {
        self.data[self.layer3_offset + 8]
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.data[self.layer3_offset + 8] = ttl;
    }

    pub fn identification(&self) -> u16 {
        self.read_u16(4)
    }

    /// Fragment offset in 8 byte units.
    pub fn fragment_offset(&self) -> u16 {
        self.read_u16(6) & 0x1FFF
    }

    pub fn checksum(&self) -> u16 {
        self.read_u16(10)
    }

    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..])
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        self.data.reserve_exact(payload.len());
        self.data.extend_from_slice(payload);

        let total_len = (self.data.len() - self.layer3_offset) as u16;
        let start = self.layer3_offset + 2;
        self.data[start..start + 2].copy_from_slice(&total_len.to_be_bytes());
    }

    /// Layer 3 bytes: header, options and payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.layer3_offset..]
    }

    /// True when the header sums to zero, checksum field included.
    pub fn validate_checksum(&self) -> bool {
        internet_checksum(&self.data[self.layer3_offset..self.payload_offset]) == 0
    }

    /// Checksum the header should carry, computed with the checksum field treated as zero.
    pub fn calculate_checksum(&self) -> u16 {
        let mut header = self.data[self.layer3_offset..self.payload_offset].to_vec();
        header[10] = 0;
        header[11] = 0;
        internet_checksum(&header)
    }

    pub fn set_checksum(&mut self) {
        let checksum = self.calculate_checksum();
        let start = self.layer3_offset + 10;
        self.data[start..start + 2].copy_from_slice(&checksum.to_be_bytes());
    }

    fn read_u16(&self, offset: usize) -> u16 {
        let start = self.layer3_offset + offset;
        u16::from_be_bytes([self.data[start], self.data[start + 1]])
    }

    fn addr_at(&self, offset: usize) -> Ipv4Addr {
        let start = self.layer3_offset + offset;
        let octets: [u8; 4] = self.data[start..start + 4]
            .try_into()
            .unwrap_or([0; 4]);
        Ipv4Addr::from(octets)
    }

    fn set_addr_at(&mut self, offset: usize, addr: Ipv4Addr) {
        let start = self.layer3_offset + offset;
        self.data[start..start + 4].copy_from_slice(&addr.octets());
    }
}

/// Ipv4Packets are considered the same if they have the same data from the layer 3
/// header and onward.
impl PartialEq for Ipv4Packet {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Ipv4Packet {}

impl TryFrom<EthernetFrame> for Ipv4Packet {
    type Error = &'static str;

    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != IPV4_ETHER_TYPE {
            return Err("Frame does not have IPv4 ether type.");
        }
        Ipv4Packet::from_buffer(frame.data, Some(frame.layer2_offset), frame.payload_offset)
    }
}
