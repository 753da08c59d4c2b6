use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("Host unreachable: {0}")]
    Unreachable(#[source] std::io::Error),
    #[error("Unable to write connect reply: {0}")]
    Reply(#[source] std::io::Error),
    #[error("Relay failed: {0}")]
    Relay(#[source] std::io::Error),
    #[error("Forwarder finished without confirming the connection")]
    Unconfirmed,
    #[error("Cancelled")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}
