//! Static IPv4 router core.
//!
//! A `Router` owns the forwarding table, the ARP cache and the queue of packets waiting on
//! address resolution, and drives them from a single event loop over any `NetIo`
//! implementation.

/// Failure types for startup configuration and the packet I/O layer.
pub mod error;

/// Router-owned network attachment points.
pub mod interface;

/// Runtime knobs and the static route file.
pub mod config;

/// Longest-prefix-match forwarding table.
pub mod forwarding;

/// IP to hardware address bindings learned from ARP traffic.
pub mod arp_cache;

/// Packets parked until their next hop answers an ARP request.
pub mod pending;

/// ICMP echo replies and error messages originated by the router.
pub mod icmp;

/// The packet I/O collaborator and an in-memory implementation of it.
pub mod net;

/// The event loop tying everything together.
pub mod router;

pub use config::{RouterConfig, StaticRoute};
pub use error::{ConfigError, NetError};
pub use interface::Interface;
pub use net::{ChannelNet, ChannelPeer, NetIo, Received};
pub use router::Router;
