use crate::error::ConfigError;
use cidr::{Cidr, Ipv4Cidr};
use iprouter_packets::MacAddr;
use std::fmt;
use std::net::Ipv4Addr;

/// One router port: name, hardware address, and the IPv4 address with its attached
/// network. Immutable once enumerated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    name: String,
    mac: MacAddr,
    ip: Ipv4Addr,
    network: Ipv4Cidr,
}

impl Interface {
    pub fn new<S: Into<String>>(
        name: S,
        mac: MacAddr,
        ip: Ipv4Addr,
        prefix_len: u8,
    ) -> Result<Interface, ConfigError> {
        let name = name.into();
        if prefix_len > 32 {
            return Err(ConfigError::BadPrefix {
                interface: name,
                prefix_len,
            });
        }
        let network_addr = Ipv4Addr::from(u32::from(ip) & prefix_mask(prefix_len));
        let network =
            Ipv4Cidr::new(network_addr, prefix_len).map_err(|_| ConfigError::BadPrefix {
                interface: name.clone(),
                prefix_len,
            })?;
        Ok(Interface {
            name,
            mac,
            ip,
            network,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// The directly connected network, host bits cleared.
    pub fn network(&self) -> &Ipv4Cidr {
        &self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.network.network_length()
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}/{}",
            self.name,
            self.mac,
            self.ip,
            self.prefix_len()
        )
    }
}

/// Netmask with the top `prefix_len` bits set.
pub fn prefix_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        len if len >= 32 => u32::max_value(),
        len => u32::max_value() << (32 - u32::from(len)),
    }
}

/// Prefix length of a contiguous netmask, `None` for masks like 255.0.255.0.
pub fn mask_to_prefix(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let len = (!bits).leading_zeros() as u8;
    if prefix_mask(len) == bits {
        Some(len)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_network_clears_host_bits() {
        let iface = Interface::new(
            "eth0",
            MacAddr::new([2, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(10, 0, 0, 1),
            24,
        )
        .unwrap();
        assert_eq!(iface.prefix_len(), 24);
        assert!(iface.network().contains(&Ipv4Addr::new(10, 0, 0, 200)));
        assert!(!iface.network().contains(&Ipv4Addr::new(10, 0, 1, 1)));
        assert_eq!(iface.to_string(), "eth0 02:00:00:00:00:01 10.0.0.1/24");
    }

    #[test]
    fn oversized_prefix_is_rejected() {
        let result = Interface::new("eth0", MacAddr::zero(), Ipv4Addr::new(10, 0, 0, 1), 33);
        assert!(result.is_err());
    }

    #[test]
    fn masks() {
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 255, 255, 0)), Some(24));
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 255, 255, 255)), Some(32));
        assert_eq!(mask_to_prefix(Ipv4Addr::new(0, 0, 0, 0)), Some(0));
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 255, 128, 0)), Some(17));
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 0, 255, 0)), None);
        assert_eq!(mask_to_prefix(Ipv4Addr::new(0, 255, 255, 255)), None);
        assert_eq!(prefix_mask(8), 0xFF00_0000);
    }
}
