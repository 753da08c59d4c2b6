mod direct;

use std::fmt::{self, Display};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use direct::{DirectConfig, DirectForwarder};

use crate::{
    address::DestinationAddress,
    error::ForwardError,
    socks5::{Reply, ReplyStatus},
    AsyncSocket,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Tcp,
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Tcp => f.write_str("tcp"),
        }
    }
}

/// Establishes the outbound path for an accepted CONNECT request and relays
/// bytes once it is up.
///
/// Implementations must call [`ForwardRequest::connected`] as soon as the path
/// is established and before relaying anything. If `forward` fails before that,
/// the client is sent a "host unreachable" reply.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        token: CancellationToken,
        request: ForwardRequest<'_>,
    ) -> Result<(), ForwardError>;
}

/// A decoded request handed to a [`Forwarder`].
///
/// The client stream stays out of reach until [`connected`](Self::connected)
/// has written the success reply, which can happen at most once.
pub struct ForwardRequest<'a> {
    network: Network,
    destination: DestinationAddress,
    address: String,
    client: &'a mut dyn AsyncSocket,
    confirmed: &'a mut bool,
}

impl<'a> ForwardRequest<'a> {
    pub(crate) fn new(
        network: Network,
        destination: DestinationAddress,
        client: &'a mut dyn AsyncSocket,
        confirmed: &'a mut bool,
    ) -> Self {
        ForwardRequest {
            network,
            address: destination.to_string(),
            destination,
            client,
            confirmed,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Target rendered as `host:port`.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn destination(&self) -> &DestinationAddress {
        &self.destination
    }

    /// Confirms the path, sends the success reply and releases the client
    /// stream for relaying.
    pub async fn connected(mut self) -> Result<&'a mut dyn AsyncSocket, ForwardError> {
        *self.confirmed = true;
        Reply::new(ReplyStatus::Succeeded)
            .write(&mut *self.client)
            .await
            .map_err(ForwardError::Reply)?;
        Ok(self.client)
    }
}
