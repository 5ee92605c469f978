//! Runs the router on real Linux interfaces through `AF_PACKET` raw sockets.
#![cfg(target_os = "linux")]

mod ifaddrs;
mod linux;
mod net;
mod socket;

pub use ifaddrs::system_interfaces;
pub use net::AfPacketNet;
pub use socket::{BoundSocket, Socket};
