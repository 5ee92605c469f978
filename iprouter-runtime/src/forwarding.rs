use crate::config::StaticRoute;
use crate::error::ConfigError;
use crate::interface::Interface;
use cidr::{Cidr, Ipv4Cidr};
use std::fmt;
use std::net::Ipv4Addr;

/// A destination network and how to reach it. Connected networks have no next hop: the
/// destination itself is resolved on the outgoing interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardingEntry {
    pub network: Ipv4Cidr,
    pub next_hop: Option<Ipv4Addr>,
    pub interface: String,
}

impl ForwardingEntry {
    pub fn is_connected(&self) -> bool {
        self.next_hop.is_none()
    }

    /// The address that must be resolved to deliver a packet for `dest` over this entry.
    pub fn next_hop_for(&self, dest: Ipv4Addr) -> Ipv4Addr {
        self.next_hop.unwrap_or(dest)
    }
}

impl fmt::Display for ForwardingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ",
            self.network.first_address(),
            self.network.network_length()
        )?;
        match self.next_hop {
            Some(hop) => write!(f, "via {} dev {}", hop, self.interface),
            None => write!(f, "dev {} (connected)", self.interface),
        }
    }
}

///
/// Longest prefix match over a flat list of entries.
///
/// Connected networks are inserted first, in interface order, followed by the static
/// routes in file order. A lookup walks every entry and keeps the longest matching
/// prefix; on a tie the earlier entry wins, so a connected network shadows a static route
/// for the same prefix. The table is built once and never modified afterwards.
///
#[derive(Clone, Debug, Default)]
pub struct ForwardingTable {
    entries: Vec<ForwardingEntry>,
}

impl ForwardingTable {
    pub fn build(
        interfaces: &[Interface],
        routes: &[StaticRoute],
    ) -> Result<ForwardingTable, ConfigError> {
        let mut entries = Vec::with_capacity(interfaces.len() + routes.len());

        for interface in interfaces {
            entries.push(ForwardingEntry {
                network: interface.network().clone(),
                next_hop: None,
                interface: interface.name().to_string(),
            });
        }

        for route in routes {
            if !interfaces.iter().any(|i| i.name() == route.interface) {
                return Err(ConfigError::UnknownInterface {
                    network: format!(
                        "{}/{}",
                        route.network.first_address(),
                        route.network.network_length()
                    ),
                    interface: route.interface.clone(),
                });
            }
            entries.push(ForwardingEntry {
                network: route.network.clone(),
                next_hop: Some(route.next_hop),
                interface: route.interface.clone(),
            });
        }

        Ok(ForwardingTable { entries })
    }

    pub fn lookup(&self, dest: Ipv4Addr) -> Option<&ForwardingEntry> {
        let mut best: Option<&ForwardingEntry> = None;
        for entry in &self.entries {
            if !entry.network.contains(&dest) {
                continue;
            }
            match best {
                Some(current)
                    if current.network.network_length() >= entry.network.network_length() => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    pub fn entries(&self) -> &[ForwardingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
