//! Loopback socket rendezvous
//!
//! [`ReplyListener`] is the scoped resource of an exchange: binding it
//! acquires an OS-assigned port on 127.0.0.1, [`ReplyListener::receive`]
//! consumes it, and the socket is closed when the value is dropped, whatever
//! the outcome. Only the wait for the peer to connect is bounded; once the
//! peer is connected it is read until it closes the connection.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{debug, info};

use crate::errors::{SourceError, SourceResult};
use crate::host::{ActionExecutor, HostAction};
use crate::transport::{peer_label, Transport, TriggerPlaceholder};
use crate::utils::url::UrlUtils;

/// Bound and listening reply socket, accepting a single connection
pub struct ReplyListener {
    listener: TcpListener,
    port: u16,
}

impl ReplyListener {
    /// Bind to loopback on an ephemeral port with a backlog of one
    pub fn bind() -> SourceResult<Self> {
        let socket = TcpSocket::new_v4()?;
        socket.bind(SocketAddr::from(([127, 0, 0, 1], 0)))?;
        let listener = socket.listen(1)?;
        let port = listener.local_addr()?.port();

        debug!("Bound on port {}...", port);
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait up to `connect_timeout` for one peer, then read until EOF
    pub async fn receive(self, connect_timeout: Duration, peer: &str) -> SourceResult<Vec<u8>> {
        let Self { listener, port } = self;

        debug!("Waiting for a connection from {} on port {}...", peer, port);
        let accepted = tokio::time::timeout(connect_timeout, listener.accept()).await;
        // Only one connection is ever accepted
        drop(listener);

        let (mut stream, remote) = match accepted {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                return Err(SourceError::fetch_failed(format!(
                    "Accept failed on port {port}: {e}"
                )))
            }
            Err(_) => {
                debug!("Closing socket on port {}", port);
                return Err(SourceError::TransportTimeout {
                    endpoint: format!("127.0.0.1:{port}"),
                    timeout: connect_timeout,
                });
            }
        };

        debug!("Connected to {}! Waiting for result...", remote);

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        debug!("Received {} bytes from {} on port {}", buffer.len(), peer, port);

        if buffer.is_empty() {
            return Err(SourceError::EmptyReply {
                source_name: peer.to_string(),
            });
        }

        Ok(buffer)
    }
}

/// Exchange over a loopback socket
pub struct SocketTransport {
    connect_timeout: Duration,
}

impl SocketTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn exchange(
        &self,
        template: &str,
        executor: &dyn ActionExecutor,
    ) -> SourceResult<Vec<u8>> {
        let peer = peer_label(template);
        let listener = ReplyListener::bind()?;

        let uri = TriggerPlaceholder::for_port(template)
            .substitute(template, &listener.port().to_string());

        info!("Executing RunPlugin({})...", UrlUtils::obfuscate_credentials(&uri));
        executor
            .execute(HostAction::RunPlugin(uri))
            .await
            .map_err(|e| SourceError::fetch_failed(format!("Could not trigger {peer}: {e}")))?;

        listener.receive(self.connect_timeout, &peer).await
    }
}
