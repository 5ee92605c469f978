use crate::error::ConfigError;
use crate::interface::mask_to_prefix;
use cidr::{Cidr, Ipv4Cidr};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Tunables of the event loop.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Minimum time between two ARP requests for the same next hop.
    pub retry_interval: Duration,
    /// ARP requests sent for a next hop before its queued packets are bounced.
    pub arp_retries: u32,
    /// TTL of every ICMP message the router originates.
    pub icmp_ttl: u8,
    /// Longest the loop blocks waiting for a frame before servicing timers again.
    pub recv_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            retry_interval: Duration::from_secs(1),
            arp_retries: 5,
            icmp_ttl: 65,
            recv_timeout: Duration::from_secs(1),
        }
    }
}

/// One line of the route file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticRoute {
    pub network: Ipv4Cidr,
    pub next_hop: Ipv4Addr,
    pub interface: String,
}

impl StaticRoute {
    /// Parses `<network> <mask> <next_hop> <interface>`; `line` is only used in errors.
    pub fn parse(text: &str, line: usize) -> Result<StaticRoute, ConfigError> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        let (network, mask, next_hop, interface) = match fields.as_slice() {
            [network, mask, next_hop, interface] => (*network, *mask, *next_hop, *interface),
            _ => {
                return Err(ConfigError::MalformedRoute {
                    line,
                    text: text.to_string(),
                })
            }
        };

        let network = parse_addr(network, "network", line)?;
        let mask_addr = parse_addr(mask, "mask", line)?;
        let next_hop = parse_addr(next_hop, "next hop", line)?;

        let prefix_len = mask_to_prefix(mask_addr).ok_or_else(|| ConfigError::BadMask {
            line,
            mask: mask.to_string(),
        })?;
        let network =
            Ipv4Cidr::new(network, prefix_len).map_err(|err| ConfigError::InvalidNetwork {
                line,
                reason: err.to_string(),
            })?;

        Ok(StaticRoute {
            network,
            next_hop,
            interface: interface.to_string(),
        })
    }
}

impl FromStr for StaticRoute {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StaticRoute::parse(s, 1)
    }
}

fn parse_addr(value: &str, field: &'static str, line: usize) -> Result<Ipv4Addr, ConfigError> {
    value.parse().map_err(|_| ConfigError::BadAddress {
        line,
        field,
        value: value.to_string(),
    })
}

/// Parses a whole route file body. Blank lines and `#` comments are skipped; any other
/// line that does not parse fails the whole file.
pub fn parse_routes(contents: &str) -> Result<Vec<StaticRoute>, ConfigError> {
    contents
        .lines()
        .enumerate()
        .map(|(index, text)| (index + 1, text.trim()))
        .filter(|(_, text)| !text.is_empty() && !text.starts_with('#'))
        .map(|(line, text)| StaticRoute::parse(text, line))
        .collect()
}

pub fn load_routes<P: AsRef<Path>>(path: P) -> Result<Vec<StaticRoute>, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|cause| ConfigError::Io {
        path: path.display().to_string(),
        cause,
    })?;
    parse_routes(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_route_line() {
        let route: StaticRoute = "172.16.0.0 255.255.0.0 192.168.1.2 router-eth0"
            .parse()
            .unwrap();
        assert_eq!(route.network.network_length(), 16);
        assert!(route.network.contains(&Ipv4Addr::new(172, 16, 42, 1)));
        assert_eq!(route.next_hop, Ipv4Addr::new(192, 168, 1, 2));
        assert_eq!(route.interface, "router-eth0");
    }

    #[test]
    fn extra_whitespace_is_fine() {
        let route = StaticRoute::parse("  10.0.0.0\t255.0.0.0   10.1.1.1  eth1 ", 4).unwrap();
        assert_eq!(route.network.network_length(), 8);
        assert_eq!(route.interface, "eth1");
    }

    #[test]
    fn malformed_lines() {
        match StaticRoute::parse("10.0.0.0 255.0.0.0 10.1.1.1", 2) {
            Err(ConfigError::MalformedRoute { line: 2, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match StaticRoute::parse("10.0.0.0 255.0.0.0 10.1.1 eth1", 3) {
            Err(ConfigError::BadAddress {
                line: 3,
                field: "next hop",
                ..
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match StaticRoute::parse("10.0.0.0 255.0.255.0 10.1.1.1 eth1", 5) {
            Err(ConfigError::BadMask { line: 5, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        // host bits set under the mask
        match StaticRoute::parse("10.0.0.1 255.0.0.0 10.1.1.1 eth1", 6) {
            Err(ConfigError::InvalidNetwork { line: 6, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parse_routes_skips_blank_and_comment_lines() {
        let routes = parse_routes(
            "# static routes\n\
             172.16.0.0 255.255.0.0 192.168.1.2 eth0\n\
             \n\
             172.16.42.0 255.255.255.0 10.10.0.254 eth2\n",
        )
        .unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].interface, "eth2");
    }

    #[test]
    fn parse_routes_reports_line_number() {
        let result = parse_routes("172.16.0.0 255.255.0.0 192.168.1.2 eth0\n# ok\nbogus\n");
        match result {
            Err(ConfigError::MalformedRoute { line: 3, text }) => assert_eq!(text, "bogus"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn load_routes_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "20.0.0.0 255.255.255.0 10.0.0.2 eth0").unwrap();
        let routes = load_routes(file.path()).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].next_hop, Ipv4Addr::new(10, 0, 0, 2));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        match load_routes(dir.path().join("forwarding_table.txt")) {
            Err(ConfigError::Io { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.retry_interval, Duration::from_secs(1));
        assert_eq!(config.arp_retries, 5);
        assert_eq!(config.icmp_ttl, 65);
    }
}
