use iprouter_packets::{IcmpMessage, IcmpType, IpProtocol, Ipv4Packet, UnreachableCode};
use std::cmp;
use std::net::Ipv4Addr;

/// How much of the offending datagram an error quotes: its IP header plus the first
/// 8 bytes of payload, assuming no options.
pub const ERROR_QUOTE_LEN: usize = 28;

/// The error messages the router originates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IcmpError {
    TimeExceeded,
    Unreachable(UnreachableCode),
}

impl IcmpError {
    fn type_and_code(self) -> (IcmpType, u8) {
        match self {
            IcmpError::TimeExceeded => (IcmpType::TimeExceeded, 0),
            IcmpError::Unreachable(code) => (IcmpType::DestinationUnreachable, code as u8),
        }
    }
}

/// Builds echo replies and error messages.
pub struct IcmpGenerator {
    ttl: u8,
    local_addrs: Vec<Ipv4Addr>,
}

impl IcmpGenerator {
    /// Create a generator
    ///
    /// # Arguments
    ///
    /// * `ttl` - TTL of every generated datagram
    /// * `local_addrs` - The router's own addresses. Packets sourced from them never
    /// produce an error, they would only be routed back to the router itself
    pub fn new(ttl: u8, local_addrs: Vec<Ipv4Addr>) -> IcmpGenerator {
        IcmpGenerator { ttl, local_addrs }
    }

    /// Answer to an echo request. Identifier, sequence and data are copied, the addresses
    /// are swapped. Returns `None` for any other message type.
    pub fn echo_reply(&self, request: &IcmpMessage) -> Option<Ipv4Packet> {
        if request.icmp_type() != IcmpType::EchoRequest {
            return None;
        }
        let reply = IcmpMessage::new(
            request.packet().dest_addr(),
            request.packet().src_addr(),
            self.ttl,
            IcmpType::EchoReply,
            0,
            request.rest_of_header(),
            &request.data(),
        );
        Some(reply.into_packet())
    }

    /// Error message about `offending`, addressed back to its source. The source address
    /// is left unspecified for the send path to fill in from the egress interface.
    /// Returns `None` when no error may be sent, and the packet should be silently
    /// discarded instead.
    pub fn error(&self, kind: IcmpError, offending: &Ipv4Packet) -> Option<Ipv4Packet> {
        if !self.should_generate_error(offending) {
            return None;
        }

        let bytes = offending.as_bytes();
        let quote = &bytes[..cmp::min(ERROR_QUOTE_LEN, bytes.len())];
        let (icmp_type, code) = kind.type_and_code();
        let message = IcmpMessage::new(
            Ipv4Addr::UNSPECIFIED,
            offending.src_addr(),
            self.ttl,
            icmp_type,
            code,
            [0; 4],
            quote,
        );
        Some(message.into_packet())
    }

    // RFC 1812 4.3.2.7 (When Not to Send ICMP Errors)
    fn should_generate_error(&self, packet: &Ipv4Packet) -> bool {
        // Only the first fragment
        if packet.fragment_offset() != 0 {
            return false;
        }
        // No errors about errors. A truncated ICMP header is treated as one.
        if packet.protocol() == IpProtocol::ICMP {
            let is_error = packet
                .payload()
                .first()
                .map_or(true, |&icmp_type| IcmpType::from(icmp_type).is_error());
            if is_error {
                return false;
            }
        }
        let src = packet.src_addr();
        if src.is_unspecified() || src.is_broadcast() || src.is_multicast() || src.is_loopback() {
            return false;
        }
        !self.local_addrs.contains(&src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    const ROUTER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const HOST: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 9);
    const FAR: Ipv4Addr = Ipv4Addr::new(20, 0, 0, 5);

    fn generator() -> IcmpGenerator {
        IcmpGenerator::new(65, vec![ROUTER])
    }

    fn udp(src: Ipv4Addr, dest: Ipv4Addr, payload: &[u8]) -> Ipv4Packet {
        Ipv4Packet::with_payload(src, dest, IpProtocol::UDP, 1, payload)
    }

    #[test]
    fn echo_reply_mirrors_request() {
        let request = IcmpMessage::new(
            HOST,
            ROUTER,
            64,
            IcmpType::EchoRequest,
            0,
            [0xbe, 0xef, 0x00, 0x02],
            b"abcdefgh",
        );
        let reply = generator().echo_reply(&request).unwrap();
        assert_eq!(reply.src_addr(), ROUTER);
        assert_eq!(reply.dest_addr(), HOST);
        assert_eq!(reply.ttl(), 65);
        assert!(reply.validate_checksum());

        let reply = IcmpMessage::try_from(reply).unwrap();
        assert_eq!(reply.icmp_type(), IcmpType::EchoReply);
        assert_eq!(reply.identifier(), 0xbeef);
        assert_eq!(reply.sequence(), 2);
        assert_eq!(&reply.data()[..], b"abcdefgh");
        assert!(reply.validate_checksum());
    }

    #[test]
    fn echo_reply_ignores_non_requests() {
        let reply = IcmpMessage::new(HOST, ROUTER, 64, IcmpType::EchoReply, 0, [0; 4], b"");
        assert!(generator().echo_reply(&reply).is_none());
    }

    #[test]
    fn error_quotes_first_28_bytes() {
        let offending = udp(HOST, FAR, &[7; 100]);
        let error = generator()
            .error(IcmpError::TimeExceeded, &offending)
            .unwrap();
        assert_eq!(error.src_addr(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(error.dest_addr(), HOST);
        assert_eq!(error.ttl(), 65);

        let message = IcmpMessage::try_from(error).unwrap();
        assert_eq!(message.icmp_type(), IcmpType::TimeExceeded);
        assert_eq!(message.code(), 0);
        assert_eq!(message.rest_of_header(), [0; 4]);
        assert_eq!(&message.data()[..], &offending.as_bytes()[..ERROR_QUOTE_LEN]);
        assert!(message.validate_checksum());
    }

    #[test]
    fn short_packets_are_quoted_whole() {
        let offending = udp(HOST, FAR, &[1, 2]);
        let error = generator()
            .error(IcmpError::Unreachable(UnreachableCode::Host), &offending)
            .unwrap();
        let message = IcmpMessage::try_from(error).unwrap();
        assert_eq!(message.icmp_type(), IcmpType::DestinationUnreachable);
        assert_eq!(message.code(), 1);
        assert_eq!(message.data().len(), 22);
    }

    #[test]
    fn no_error_about_an_error() {
        let gen = generator();
        let mut first = gen
            .error(IcmpError::Unreachable(UnreachableCode::Net), &udp(HOST, FAR, b"x"))
            .unwrap();
        first.set_src_addr(Ipv4Addr::new(10, 0, 0, 3));
        assert!(gen.error(IcmpError::TimeExceeded, &first).is_none());
    }

    #[test]
    fn echo_requests_do_get_errors() {
        let request = IcmpMessage::new(HOST, FAR, 1, IcmpType::EchoRequest, 0, [0; 4], b"");
        assert!(generator()
            .error(IcmpError::TimeExceeded, request.packet())
            .is_some());
    }

    #[test]
    fn suppressed_sources() {
        let gen = generator();
        for src in &[
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::BROADCAST,
            Ipv4Addr::LOCALHOST,
            Ipv4Addr::new(224, 0, 0, 5),
            ROUTER,
        ] {
            let packet = udp(*src, FAR, b"payload");
            assert!(gen.error(IcmpError::TimeExceeded, &packet).is_none(), "{}", src);
        }
    }

    #[test]
    fn non_initial_fragments_are_suppressed() {
        let mut packet = udp(HOST, FAR, b"payload");
        // fragment offset 185 * 8 bytes
        packet.data[6] = 0x00;
        packet.data[7] = 185;
        packet.set_checksum();
        assert!(generator()
            .error(IcmpError::TimeExceeded, &packet)
            .is_none());
    }
}
