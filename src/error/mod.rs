use thiserror::Error;
pub(crate) mod forward;
pub(crate) mod socks;

pub use forward::ForwardError;
pub use socks::{ProtocolError, RequestError, Stage};

/// Outcome of a failed connection, or of a failed listener.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("ProtocolError: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("AuthError: no acceptable authentication method offered")]
    Auth,
    #[error("RequestError: {0}")]
    Request(#[from] RequestError),
    #[error("ForwardError: {0}")]
    Forward(#[from] ForwardError),
    #[error("Cancelled")]
    Cancelled,
    #[error("IOError: {0}")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Protocol,
    Auth,
    Request,
    Forward,
    Cancelled,
    Io,
}

impl ProxyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::Protocol(_) => ErrorKind::Protocol,
            ProxyError::Auth => ErrorKind::Auth,
            ProxyError::Request(_) => ErrorKind::Request,
            ProxyError::Forward(_) => ErrorKind::Forward,
            ProxyError::Cancelled => ErrorKind::Cancelled,
            ProxyError::IO(_) => ErrorKind::Io,
        }
    }
}
