use std::fmt;

use thiserror::Error;

/// The read or write step of the handshake an I/O failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Greeting,
    Methods,
    MethodSelection,
    Request,
    Ipv4Address,
    DomainLength,
    Domain,
    Ipv6Address,
    Port,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::Greeting => "greeting",
            Stage::Methods => "auth methods",
            Stage::MethodSelection => "method selection",
            Stage::Request => "request",
            Stage::Ipv4Address => "ipv4 address",
            Stage::DomainLength => "hostname length",
            Stage::Domain => "hostname",
            Stage::Ipv6Address => "ipv6 address",
            Stage::Port => "port",
        };
        f.write_str(stage)
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid Version: {0}")]
    InvalidVersion(u8),
    #[error("Read short during {stage}: {source}")]
    ShortRead {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
    #[error("Write short during {stage}: {source}")]
    ShortWrite {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

impl ProtocolError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ProtocolError::InvalidVersion(_) => None,
            ProtocolError::ShortRead { stage, .. } | ProtocolError::ShortWrite { stage, .. } => {
                Some(*stage)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid Request: {0:?}")]
    InvalidRequest([u8; 4]),
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),
}
