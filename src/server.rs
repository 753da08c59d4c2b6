use std::sync::Arc;

use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    error::ProxyError,
    forward::Forwarder,
    socks5::{Handshake, SocksConfig, SCRATCH_LEN},
    AsyncSocket,
};

/// Accepts SOCKS5 clients and hands their CONNECT requests to a [`Forwarder`].
pub struct Socks5Server<F> {
    config: SocksConfig,
    forwarder: Arc<F>,
}

impl<F: Forwarder + 'static> Socks5Server<F> {
    pub fn new(config: SocksConfig, forwarder: F) -> Self {
        Socks5Server {
            config,
            forwarder: Arc::new(forwarder),
        }
    }

    /// Binds the configured address and serves until `token` is cancelled.
    ///
    /// Only listener failures are returned; per-connection failures are logged.
    pub async fn listen_and_serve(&self, token: &CancellationToken) -> Result<(), ProxyError> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        self.serve(token, listener).await
    }

    pub async fn serve(
        &self,
        token: &CancellationToken,
        listener: TcpListener,
    ) -> Result<(), ProxyError> {
        // sessions are torn down along with the accept loop, whatever ends it
        let token = token.child_token();
        let _guard = token.clone().drop_guard();

        info!("socks5 server started on {}", listener.local_addr()?);
        loop {
            let (stream, remote_addr) = tokio::select! {
                _ = token.cancelled() => {
                    info!("socks5 server stopped");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?,
            };
            if self.config.nodelay {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("unable to set nodelay for {}: {}", remote_addr, e);
                }
            }

            let session = Session::new(stream, token.child_token());
            let forwarder = self.forwarder.clone();
            tokio::spawn(async move {
                match session.run(&*forwarder).await {
                    Ok(()) => debug!("socks5 client {} handling finished", remote_addr),
                    Err(ProxyError::Cancelled) => {
                        debug!("socks5 client {} cancelled", remote_addr)
                    }
                    Err(e) => warn!("socks5 client {} handle error: {}", remote_addr, e),
                }
            });
        }
    }

    /// Runs a single session on an already accepted stream.
    pub async fn serve_connection(
        &self,
        token: &CancellationToken,
        stream: impl AsyncSocket,
    ) -> Result<(), ProxyError> {
        Session::new(stream, token.child_token())
            .run(&*self.forwarder)
            .await
    }
}

struct Session<S> {
    stream: S,
    token: CancellationToken,
    buf: [u8; SCRATCH_LEN],
}

impl<S: AsyncSocket> Session<S> {
    fn new(stream: S, token: CancellationToken) -> Self {
        Session {
            stream,
            token,
            buf: [0u8; SCRATCH_LEN],
        }
    }

    /// The stream is closed when the session is dropped, on return or on
    /// cancellation of the parent token.
    async fn run(mut self, forwarder: &dyn Forwarder) -> Result<(), ProxyError> {
        let token = self.token.clone();
        let _guard = self.token.drop_guard();
        let handshake = Handshake::new(&mut self.stream, &mut self.buf);
        tokio::select! {
            _ = token.cancelled() => Err(ProxyError::Cancelled),
            result = handshake.run(forwarder, token.clone()) => result,
        }
    }
}
