use std::{
    fmt::{self, Display},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
};

/// Target of a CONNECT request as decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationAddress {
    Domain(String, u16),
    Ip(SocketAddr),
}

impl DestinationAddress {
    pub fn from_ipv4(octets: [u8; 4], port: u16) -> Self {
        DestinationAddress::Ip(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::from(octets),
            port,
        )))
    }

    pub fn from_ipv6(octets: [u8; 16], port: u16) -> Self {
        DestinationAddress::Ip(SocketAddr::V6(SocketAddrV6::new(
            Ipv6Addr::from(octets),
            port,
            0,
            0,
        )))
    }

    /// The hostname is taken verbatim; bytes that are not UTF-8 are replaced.
    pub fn from_domain(domain: &[u8], port: u16) -> Self {
        DestinationAddress::Domain(String::from_utf8_lossy(domain).into_owned(), port)
    }

    /// SOCKS5 address type byte for this address.
    pub fn address_type(&self) -> u8 {
        match self {
            DestinationAddress::Ip(SocketAddr::V4(_)) => 1,
            DestinationAddress::Domain(_, _) => 3,
            DestinationAddress::Ip(SocketAddr::V6(_)) => 4,
        }
    }

    pub fn host(&self) -> String {
        match self {
            DestinationAddress::Domain(domain, _) => domain.clone(),
            DestinationAddress::Ip(addr) => addr.ip().to_string(),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            DestinationAddress::Domain(_, port) => *port,
            DestinationAddress::Ip(addr) => addr.port(),
        }
    }

    pub fn set_port(&mut self, new_port: u16) {
        match self {
            DestinationAddress::Domain(_, port) => *port = new_port,
            DestinationAddress::Ip(addr) => addr.set_port(new_port),
        }
    }

    /// Address bytes followed by the big-endian port, without the type byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            DestinationAddress::Domain(domain, port) => [
                [domain.len() as u8].as_ref(),
                domain.as_bytes(),
                port.to_be_bytes().as_ref(),
            ]
            .concat(),
            DestinationAddress::Ip(SocketAddr::V4(addr)) => {
                [&addr.ip().octets(), addr.port().to_be_bytes().as_ref()].concat()
            }
            DestinationAddress::Ip(SocketAddr::V6(addr)) => {
                [&addr.ip().octets(), addr.port().to_be_bytes().as_ref()].concat()
            }
        }
    }
}

impl Default for DestinationAddress {
    fn default() -> Self {
        DestinationAddress::Ip(SocketAddr::from(([0, 0, 0, 0], 0)))
    }
}

impl Display for DestinationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // a hostname that looks like an ipv6 literal still needs brackets
            DestinationAddress::Domain(domain, port) if domain.contains(':') => {
                write!(f, "[{}]:{}", domain, port)
            }
            DestinationAddress::Domain(domain, port) => write!(f, "{}:{}", domain, port),
            DestinationAddress::Ip(addr) => addr.fmt(f),
        }
    }
}
