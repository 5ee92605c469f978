use crate::*;
use std::convert::TryFrom;

/// An inbound frame sorted by what it carries.
///
/// Frames whose ether type claims ARP or IPv4 but whose body does not decode land in
/// `Other` together with everything else.
#[derive(Clone, Debug)]
pub enum Frame {
    Arp(ArpFrame),
    Ipv4(Ipv4Packet),
    Other(EthernetFrame),
}

impl From<EthernetFrame> for Frame {
    fn from(frame: EthernetFrame) -> Self {
        match frame.ether_type() {
            ARP_ETHER_TYPE => match ArpFrame::try_from(frame.clone()) {
                Ok(arp) => Frame::Arp(arp),
                Err(_) => Frame::Other(frame),
            },
            IPV4_ETHER_TYPE => match Ipv4Packet::try_from(frame.clone()) {
                Ok(packet) => Frame::Ipv4(packet),
                Err(_) => Frame::Other(frame),
            },
            _ => Frame::Other(frame),
        }
    }
}
