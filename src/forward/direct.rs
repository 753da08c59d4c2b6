use async_trait::async_trait;
use log::debug;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::{ForwardRequest, Forwarder, Network};
use crate::error::ForwardError;

pub struct DirectConfig {
    pub nodelay: bool,
}

impl Default for DirectConfig {
    fn default() -> Self {
        DirectConfig { nodelay: true }
    }
}

/// Dials the target itself and copies bytes both ways until either side
/// closes.
#[derive(Default)]
pub struct DirectForwarder {
    config: DirectConfig,
}

impl DirectForwarder {
    pub fn new(config: DirectConfig) -> Self {
        DirectForwarder { config }
    }
}

#[async_trait]
impl Forwarder for DirectForwarder {
    async fn forward(
        &self,
        token: CancellationToken,
        request: ForwardRequest<'_>,
    ) -> Result<(), ForwardError> {
        let address = request.address().to_owned();
        let mut upstream = match request.network() {
            Network::Tcp => tokio::select! {
                _ = token.cancelled() => return Err(ForwardError::Cancelled),
                upstream = TcpStream::connect(&address) => upstream.map_err(ForwardError::Unreachable)?,
            },
        };
        if self.config.nodelay {
            if let Err(e) = upstream.set_nodelay(true) {
                debug!("unable to set nodelay for {}: {}", address, e);
            }
        }
        debug!("connected to {}", address);

        let client = request.connected().await?;
        tokio::select! {
            _ = token.cancelled() => Err(ForwardError::Cancelled),
            copied = tokio::io::copy_bidirectional(client, &mut upstream) => {
                let (sent, received) = copied.map_err(ForwardError::Relay)?;
                debug!("{} closed, {} bytes sent, {} bytes received", address, sent, received);
                Ok(())
            }
        }
    }
}
