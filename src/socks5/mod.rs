mod config;

use log::trace;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

pub use config::Config as SocksConfig;

use crate::{
    address::DestinationAddress,
    error::{ForwardError, ProtocolError, ProxyError, RequestError, Stage},
    forward::{ForwardRequest, Forwarder, Network},
    AsyncSocket,
};

/// Large enough for the longest variable field: 255 methods or a 255 byte hostname.
pub(crate) const SCRATCH_LEN: usize = 256;

#[derive(PartialEq, Clone, Copy)]
pub enum Version {
    V5 = 5,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum AuthMethod {
    #[default]
    NoAuth,
    GssApi,
    UsernamePassword,
    NoAcceptableMethod,
    Other(u8),
}

impl From<AuthMethod> for u8 {
    fn from(v: AuthMethod) -> Self {
        match v {
            AuthMethod::NoAuth => 0,
            AuthMethod::GssApi => 1,
            AuthMethod::UsernamePassword => 2,
            AuthMethod::NoAcceptableMethod => 0xff,
            AuthMethod::Other(v) => v,
        }
    }
}

impl From<u8> for AuthMethod {
    fn from(v: u8) -> Self {
        match v {
            0 => AuthMethod::NoAuth,
            1 => AuthMethod::GssApi,
            2 => AuthMethod::UsernamePassword,
            0xff => AuthMethod::NoAcceptableMethod,
            v => AuthMethod::Other(v),
        }
    }
}

impl AuthMethod {
    /// Only "no authentication" is ever selected.
    pub fn select(offered: &[u8]) -> Self {
        if offered
            .iter()
            .any(|m| AuthMethod::from(*m) == AuthMethod::NoAuth)
        {
            AuthMethod::NoAuth
        } else {
            AuthMethod::NoAcceptableMethod
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Command {
    Connect = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Succeeded,
    HostUnreachable,
    /// Also sent for a bad reserved byte and for unknown address types.
    CommandNotSupported,
}

impl From<ReplyStatus> for u8 {
    fn from(v: ReplyStatus) -> Self {
        match v {
            ReplyStatus::Succeeded => 0,
            ReplyStatus::HostUnreachable => 4,
            ReplyStatus::CommandNotSupported => 7,
        }
    }
}

pub struct MethodSelection {
    version: Version,
    method: AuthMethod,
}

impl MethodSelection {
    pub fn new(method: AuthMethod) -> Self {
        MethodSelection {
            version: Version::V5,
            method,
        }
    }
    pub fn encode(&self) -> [u8; 2] {
        [self.version as u8, self.method.into()]
    }
    pub async fn write(&self, mut writer: impl AsyncWrite + Unpin) -> std::io::Result<()> {
        writer.write_all(&self.encode()).await
    }
}

/// Reply to a request. The bound address is never reported: it is always
/// the zero IPv4 address and port.
pub struct Reply {
    version: Version,
    status: ReplyStatus,
    bound: DestinationAddress,
}

impl Reply {
    pub const LEN: usize = 10;

    pub fn new(status: ReplyStatus) -> Self {
        Reply {
            version: Version::V5,
            status,
            bound: DestinationAddress::default(),
        }
    }
    pub fn status(&self) -> ReplyStatus {
        self.status
    }
    pub fn encode(&self) -> [u8; Reply::LEN] {
        let mut buf = [0u8; Reply::LEN];
        buf[0] = self.version as u8;
        buf[1] = self.status.into();
        buf[3] = self.bound.address_type();
        buf[4..].copy_from_slice(&self.bound.to_bytes());
        buf
    }
    pub async fn write(&self, mut writer: impl AsyncWrite + Unpin) -> std::io::Result<()> {
        writer.write_all(&self.encode()).await
    }
}

/// Drives one client connection from the greeting up to the forwarder handoff.
pub(crate) struct Handshake<'a, S> {
    stream: &'a mut S,
    buf: &'a mut [u8; SCRATCH_LEN],
}

impl<'a, S: AsyncSocket> Handshake<'a, S> {
    pub fn new(stream: &'a mut S, buf: &'a mut [u8; SCRATCH_LEN]) -> Self {
        Handshake { stream, buf }
    }

    pub async fn run(
        mut self,
        forwarder: &dyn Forwarder,
        token: CancellationToken,
    ) -> Result<(), ProxyError> {
        self.negotiate().await?;
        let addr = self.read_request().await?;
        self.forward(addr, forwarder, token).await
    }

    async fn read_exact(&mut self, len: usize, stage: Stage) -> Result<&[u8], ProtocolError> {
        self.stream
            .read_exact(&mut self.buf[..len])
            .await
            .map_err(|source| ProtocolError::ShortRead { stage, source })?;
        Ok(&self.buf[..len])
    }

    async fn negotiate(&mut self) -> Result<(), ProxyError> {
        let greeting = self.read_exact(2, Stage::Greeting).await?;
        let (version, number_of_methods) = (greeting[0], greeting[1] as usize);
        if version != Version::V5 as u8 {
            Err(ProtocolError::InvalidVersion(version))?;
        }
        let methods = self.read_exact(number_of_methods, Stage::Methods).await?;
        let method = AuthMethod::select(methods);
        trace!("offered {} auth methods, selected {:?}", number_of_methods, method);

        MethodSelection::new(method)
            .write(&mut *self.stream)
            .await
            .map_err(|source| ProtocolError::ShortWrite {
                stage: Stage::MethodSelection,
                source,
            })?;
        if method != AuthMethod::NoAuth {
            return Err(ProxyError::Auth);
        }
        Ok(())
    }

    async fn read_request(&mut self) -> Result<DestinationAddress, ProxyError> {
        let mut request = [0u8; 4];
        request.copy_from_slice(self.read_exact(4, Stage::Request).await?);
        if request[0] != Version::V5 as u8 || request[1] != Command::Connect as u8 || request[2] != 0
        {
            self.reply(ReplyStatus::CommandNotSupported).await;
            Err(RequestError::InvalidRequest(request))?;
        }

        let mut addr = match request[3] {
            1 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(self.read_exact(4, Stage::Ipv4Address).await?);
                DestinationAddress::from_ipv4(octets, 0)
            }
            3 => {
                let len = self.read_exact(1, Stage::DomainLength).await?[0] as usize;
                let domain = self.read_exact(len, Stage::Domain).await?;
                DestinationAddress::from_domain(domain, 0)
            }
            4 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(self.read_exact(16, Stage::Ipv6Address).await?);
                DestinationAddress::from_ipv6(octets, 0)
            }
            address_type => {
                self.reply(ReplyStatus::CommandNotSupported).await;
                Err(RequestError::AddressTypeNotSupported(address_type))?
            }
        };

        let port = self.read_exact(2, Stage::Port).await?;
        addr.set_port(u16::from_be_bytes([port[0], port[1]]));
        Ok(addr)
    }

    async fn forward(
        mut self,
        addr: DestinationAddress,
        forwarder: &dyn Forwarder,
        token: CancellationToken,
    ) -> Result<(), ProxyError> {
        trace!("forwarding to {}", addr);
        let mut confirmed = false;
        let request = ForwardRequest::new(Network::Tcp, addr, &mut *self.stream, &mut confirmed);
        let result = forwarder.forward(token, request).await;

        match result {
            Ok(()) if confirmed => Ok(()),
            Ok(()) => {
                self.reply(ReplyStatus::HostUnreachable).await;
                Err(ForwardError::Unconfirmed.into())
            }
            Err(e) => {
                if !confirmed {
                    self.reply(ReplyStatus::HostUnreachable).await;
                }
                Err(e.into())
            }
        }
    }

    /// Error replies are best effort, the connection is closed right after.
    async fn reply(&mut self, status: ReplyStatus) {
        if let Err(e) = Reply::new(status).write(&mut *self.stream).await {
            trace!("unable to write {:?} reply: {}", status, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::error::ErrorKind;

    struct Confirming;

    #[async_trait]
    impl Forwarder for Confirming {
        async fn forward(
            &self,
            _token: CancellationToken,
            request: ForwardRequest<'_>,
        ) -> Result<(), ForwardError> {
            request.connected().await?;
            Ok(())
        }
    }

    #[test]
    fn selects_no_auth_anywhere_in_list() {
        assert_eq!(AuthMethod::select(&[2, 1, 0]), AuthMethod::NoAuth);
        assert_eq!(AuthMethod::select(&[0]), AuthMethod::NoAuth);
        assert_eq!(AuthMethod::select(&[1, 2, 0x80]), AuthMethod::NoAcceptableMethod);
        assert_eq!(AuthMethod::select(&[]), AuthMethod::NoAcceptableMethod);
    }

    #[test]
    fn method_selection_bytes() {
        assert_eq!(MethodSelection::new(AuthMethod::NoAuth).encode(), [5, 0]);
        assert_eq!(
            MethodSelection::new(AuthMethod::NoAcceptableMethod).encode(),
            [5, 0xff]
        );
    }

    #[test]
    fn reply_bytes() {
        assert_eq!(
            Reply::new(ReplyStatus::Succeeded).encode(),
            [5, 0, 0, 1, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            Reply::new(ReplyStatus::HostUnreachable).encode(),
            [5, 4, 0, 1, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            Reply::new(ReplyStatus::CommandNotSupported).encode(),
            [5, 7, 0, 1, 0, 0, 0, 0, 0, 0]
        );
    }

    #[tokio::test]
    async fn rejected_auth_leaves_request_unread() {
        let (mut client, mut server) = duplex(1024);
        client
            .write_all(&[5, 1, 2, 5, 1, 0, 1, 127, 0, 0, 1, 0, 80])
            .await
            .unwrap();

        let mut buf = [0u8; SCRATCH_LEN];
        let err = Handshake::new(&mut server, &mut buf)
            .run(&Confirming, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);

        let mut selection = [0u8; 2];
        client.read_exact(&mut selection).await.unwrap();
        assert_eq!(selection, [5, 0xff]);

        let mut leftover = [0u8; 10];
        server.read_exact(&mut leftover).await.unwrap();
        assert_eq!(leftover, [5, 1, 0, 1, 127, 0, 0, 1, 0, 80]);
    }

    #[tokio::test]
    async fn bad_version_sends_nothing() {
        let (mut client, mut server) = duplex(1024);
        client.write_all(&[4, 1, 0]).await.unwrap();

        let mut buf = [0u8; SCRATCH_LEN];
        let err = Handshake::new(&mut server, &mut buf)
            .run(&Confirming, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProxyError::Protocol(ProtocolError::InvalidVersion(4))
        ));

        drop(server);
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn short_port_is_protocol_error() {
        let (mut client, mut server) = duplex(1024);
        client
            .write_all(&[5, 1, 0, 5, 1, 0, 1, 10, 0, 0, 1, 0])
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        let mut buf = [0u8; SCRATCH_LEN];
        let err = Handshake::new(&mut server, &mut buf)
            .run(&Confirming, CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ProxyError::Protocol(e) => assert_eq!(e.stage(), Some(Stage::Port)),
            e => panic!("unexpected error: {}", e),
        }
    }

    #[tokio::test]
    async fn full_length_domain_fits_scratch_buffer() {
        let (mut client, mut server) = duplex(1024);
        let domain = vec![b'a'; 255];
        let mut frame = vec![5, 1, 0, 5, 1, 0, 3, 255];
        frame.extend_from_slice(&domain);
        frame.extend_from_slice(&[0x1f, 0x90]);
        client.write_all(&frame).await.unwrap();

        let mut buf = [0u8; SCRATCH_LEN];
        Handshake::new(&mut server, &mut buf)
            .run(&Confirming, CancellationToken::new())
            .await
            .unwrap();

        let mut replies = [0u8; 12];
        client.read_exact(&mut replies).await.unwrap();
        assert_eq!(replies, [5, 0, 5, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
    }
}
