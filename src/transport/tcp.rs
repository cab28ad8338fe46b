//! TCP transport provider.
//!
//! Plain TCP is the simplest NETCONF carrier (and what test tooling
//! speaks); SSH and TLS providers plug in the same way by wrapping their
//! established streams in [`TransportChannel`]s.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use super::{ChannelListener, TransportChannel};
use crate::error::{NetconfError, Result};

/// Server-side TCP transport: accepts connections and hands each one to
/// the protocol layer without blocking the accept loop.
#[derive(Debug, Clone)]
pub struct TcpServerTransport {
    listen_addr: SocketAddr,
}

impl TcpServerTransport {
    /// Create a transport bound to the given address on `serve`.
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self { listen_addr }
    }

    /// Create with a localhost address.
    pub fn localhost(port: u16) -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    /// Listen address.
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Accept connections forever, delivering each established channel to
    /// the listener. Runs until the socket fails.
    pub async fn serve(&self, listener: Arc<dyn ChannelListener>) -> Result<()> {
        let socket = TcpListener::bind(self.listen_addr).await.map_err(|e| {
            NetconfError::Config(format!("failed to bind {}: {e}", self.listen_addr))
        })?;
        tracing::info!("NETCONF TCP transport listening on {}", self.listen_addr);

        loop {
            let (stream, peer) = socket.accept().await?;
            tracing::debug!(%peer, "accepted transport connection");
            let channel = Arc::new(TransportChannel::with_peer(stream, peer));
            listener.on_transport_channel_established(channel);
        }
    }
}

impl Default for TcpServerTransport {
    fn default() -> Self {
        Self::localhost(830)
    }
}

/// Client-side TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    /// Connect to a NETCONF peer and wrap the socket in a channel.
    pub async fn connect(addr: SocketAddr) -> Result<Arc<TransportChannel>> {
        let stream = TcpStream::connect(addr).await?;
        let peer = stream.peer_addr()?;
        tracing::debug!(%peer, "transport connection established");
        Ok(Arc::new(TransportChannel::with_peer(stream, peer)))
    }
}
