use failure::Fail;
use std::io;

/// Anything wrong with the router's startup configuration. Always fatal.
#[derive(Debug, Fail)]
pub enum ConfigError {
    #[fail(display = "could not read route file {}: {}", path, cause)]
    Io {
        path: String,
        #[fail(cause)]
        cause: io::Error,
    },

    #[fail(
        display = "route file line {}: expected `<network> <mask> <next_hop> <interface>`, got {:?}",
        line, text
    )]
    MalformedRoute { line: usize, text: String },

    #[fail(display = "route file line {}: {} {:?} is not a dotted-decimal address", line, field, value)]
    BadAddress {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[fail(display = "route file line {}: mask {} is not contiguous", line, mask)]
    BadMask { line: usize, mask: String },

    #[fail(display = "route file line {}: invalid network: {}", line, reason)]
    InvalidNetwork { line: usize, reason: String },

    #[fail(display = "route to {} names unknown interface {}", network, interface)]
    UnknownInterface { network: String, interface: String },

    #[fail(display = "interface {} has invalid prefix length /{}", interface, prefix_len)]
    BadPrefix { interface: String, prefix_len: u8 },

    #[fail(display = "no usable interfaces")]
    NoInterfaces,
}

/// Failures of the packet I/O layer.
#[derive(Debug, Fail)]
pub enum NetError {
    #[fail(display = "no such port: {}", _0)]
    UnknownPort(String),

    #[fail(display = "packet I/O failed: {}", _0)]
    Io(#[fail(cause)] io::Error),

    #[fail(display = "packet channel disconnected")]
    Disconnected,
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        NetError::Io(err)
    }
}
