pub mod address;
mod error;
pub mod forward;
mod server;
mod socks5;

use tokio::io::{AsyncRead, AsyncWrite};

pub use address::DestinationAddress;
pub use error::{ErrorKind, ForwardError, ProtocolError, ProxyError, RequestError, Stage};
pub use forward::{DirectConfig, DirectForwarder, ForwardRequest, Forwarder, Network};
pub use server::Socks5Server;
pub use socks5::{AuthMethod, MethodSelection, Reply, ReplyStatus, SocksConfig};
pub use tokio_util::sync::CancellationToken;

pub trait AsyncSocket: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
impl<T> AsyncSocket for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
