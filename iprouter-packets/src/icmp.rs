use crate::*;
use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;
use std::net::Ipv4Addr;

/// Type, code, checksum and the four "rest of header" bytes.
pub const ICMP_HEADER_LEN: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IcmpType {
    EchoReply,
    DestinationUnreachable,
    EchoRequest,
    TimeExceeded,
    Other(u8),
}

impl IcmpType {
    /// RFC 1812 4.3.2.7: error messages never trigger further errors.
    pub fn is_error(self) -> bool {
        match self {
            IcmpType::DestinationUnreachable | IcmpType::TimeExceeded => true,
            // Source quench, redirect, parameter problem
            IcmpType::Other(4) | IcmpType::Other(5) | IcmpType::Other(12) => true,
            _ => false,
        }
    }
}

impl From<u8> for IcmpType {
    fn from(value: u8) -> Self {
        match value {
            0 => IcmpType::EchoReply,
            3 => IcmpType::DestinationUnreachable,
            8 => IcmpType::EchoRequest,
            11 => IcmpType::TimeExceeded,
            other => IcmpType::Other(other),
        }
    }
}

impl From<IcmpType> for u8 {
    fn from(icmp_type: IcmpType) -> u8 {
        match icmp_type {
            IcmpType::EchoReply => 0,
            IcmpType::DestinationUnreachable => 3,
            IcmpType::EchoRequest => 8,
            IcmpType::TimeExceeded => 11,
            IcmpType::Other(other) => other,
        }
    }
}

/// Codes of Destination Unreachable used by the router.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnreachableCode {
    Net = 0,
    Host = 1,
    Port = 3,
}

///
/// Ipv4Packet wrapper with getters/setters for ICMP messages, RFC 792
/// https://tools.ietf.org/html/rfc792
///
/// Echo messages carry identifier and sequence number in the rest-of-header field; error
/// messages leave it zero and carry the offending datagram's header in the data.
///
#[derive(Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    packet: Ipv4Packet,
}

impl IcmpMessage {
    /// Wraps a fresh ICMP message in an IPv4 header. The checksums are filled in.
    pub fn new(
        src: Ipv4Addr,
        dest: Ipv4Addr,
        ttl: u8,
        icmp_type: IcmpType,
        code: u8,
        rest_of_header: [u8; 4],
        data: &[u8],
    ) -> IcmpMessage {
        let mut body = Vec::with_capacity(ICMP_HEADER_LEN + data.len());
        body.push(icmp_type.into());
        body.push(code);
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(&rest_of_header);
        body.extend_from_slice(data);

        let packet = Ipv4Packet::with_payload(src, dest, IpProtocol::ICMP, ttl, &body);
        let mut message = IcmpMessage { packet };
        message.set_checksum();
        message
    }

    pub fn icmp_type(&self) -> IcmpType {
        IcmpType::from(self.byte(0))
    }

    pub fn code(&self) -> u8 {
        self.byte(1)
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.byte(2), self.byte(3)])
    }

    /// Echo identifier, meaningful for echo request/reply only.
    pub fn identifier(&self) -> u16 {
        u16::from_be_bytes([self.byte(4), self.byte(5)])
    }

    /// Echo sequence number, meaningful for echo request/reply only.
    pub fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.byte(6), self.byte(7)])
    }

    pub fn rest_of_header(&self) -> [u8; 4] {
        [self.byte(4), self.byte(5), self.byte(6), self.byte(7)]
    }

    pub fn data(&self) -> Cow<[u8]> {
        Cow::from(&self.packet.data[self.packet.payload_offset + ICMP_HEADER_LEN..])
    }

    pub fn validate_checksum(&self) -> bool {
        internet_checksum(&self.packet.data[self.packet.payload_offset..]) == 0
    }

    /// Recomputes the ICMP checksum over header and data.
    pub fn set_checksum(&mut self) {
        let start = self.packet.payload_offset;
        self.packet.data[start + 2] = 0;
        self.packet.data[start + 3] = 0;
        let checksum = internet_checksum(&self.packet.data[start..]);
        self.packet.data[start + 2..start + 4].copy_from_slice(&checksum.to_be_bytes());
    }

    pub fn packet(&self) -> &Ipv4Packet {
        &self.packet
    }

    // Move ownership of the IPv4 packet back to the caller
    pub fn into_packet(self) -> Ipv4Packet {
        self.packet
    }

    fn byte(&self, offset: usize) -> u8 {
        self.packet.data[self.packet.payload_offset + offset]
    }
}

impl fmt::Debug for IcmpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IcmpMessage")
            .field("src", &self.packet.src_addr())
            .field("dest", &self.packet.dest_addr())
            .field("type", &self.icmp_type())
            .field("code", &self.code())
            .field("data_len", &self.data().len())
            .finish()
    }
}

impl TryFrom<Ipv4Packet> for IcmpMessage {
    type Error = &'static str;

    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        if packet.protocol() != IpProtocol::ICMP {
            return Err("Packet protocol is not ICMP");
        }
        if packet.fragment_offset() != 0 {
            return Err("Only the first fragment carries the ICMP header");
        }
        if packet.data.len() < packet.payload_offset + ICMP_HEADER_LEN {
            return Err("Packet payload is too short to hold an ICMP header");
        }
        Ok(IcmpMessage { packet })
    }
}
