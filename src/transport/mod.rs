//! Transport layer abstraction.
//!
//! The protocol core does not speak TCP/TLS/SSH itself; an external
//! transport provider establishes byte-stream connections and hands them
//! over as [`TransportChannel`]s through a [`ChannelListener`]. A channel
//! has two independent shutdown origins — the protocol layer (negotiation
//! failure, `<close-session>`) and the transport layer (peer disconnect,
//! network error) — and exactly one of them performs teardown: the live
//! stream reference is claimed atomically, so a session is never torn
//! down twice.

mod tcp;

pub use tcp::{TcpConnector, TcpServerTransport};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex};

use crate::error::{NetconfError, Result};

/// Any established duplex byte stream (TCP socket, SSH subsystem channel,
/// TLS stream, in-memory pipe in tests).
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ByteStream for T {}

/// Which side initiated channel teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOrigin {
    /// The protocol layer decided to end the session.
    Protocol,
    /// The underlying transport reported closure.
    Transport,
}

/// An established byte-stream connection with dual-origin shutdown.
///
/// Reads and writes race the shutdown signal, so an in-flight operation
/// fails with [`NetconfError::ChannelClosed`] instead of hanging when the
/// channel is closed from either origin.
pub struct TransportChannel {
    peer: Option<SocketAddr>,
    /// The live stream. Teardown claims it; afterwards it is absent.
    io: Mutex<Option<Box<dyn ByteStream>>>,
    shutdown: watch::Sender<bool>,
    claimed: AtomicBool,
}

impl TransportChannel {
    /// Wrap an established stream.
    pub fn new<S: ByteStream + 'static>(stream: S) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            peer: None,
            io: Mutex::new(Some(Box::new(stream))),
            shutdown,
            claimed: AtomicBool::new(false),
        }
    }

    /// Wrap an established stream, recording the peer address.
    pub fn with_peer<S: ByteStream + 'static>(stream: S, peer: SocketAddr) -> Self {
        let mut channel = Self::new(stream);
        channel.peer = Some(peer);
        channel
    }

    /// Remote peer address, when the transport knows one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// True once either close origin has run.
    pub fn is_closed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Read up to `buf.len()` bytes. `Ok(0)` signals end of stream.
    pub async fn read_some(&self, buf: &mut [u8]) -> Result<usize> {
        let mut shutdown = self.shutdown.subscribe();
        let mut io = self.io.lock().await;
        let stream = io.as_mut().ok_or(NetconfError::ChannelClosed)?;
        tokio::select! {
            _ = shutdown.wait_for(|closed| *closed) => Err(NetconfError::ChannelClosed),
            read = stream.read(buf) => Ok(read?),
        }
    }

    /// Write the whole buffer and flush.
    pub async fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        let mut io = self.io.lock().await;
        let stream = io.as_mut().ok_or(NetconfError::ChannelClosed)?;
        tokio::select! {
            _ = shutdown.wait_for(|closed| *closed) => Err(NetconfError::ChannelClosed),
            written = async {
                stream.write_all(data).await?;
                stream.flush().await
            } => {
                written?;
                Ok(())
            }
        }
    }

    /// Close because the protocol layer decided to end the session.
    /// Idempotent; returns whether this call performed the teardown.
    pub async fn close_from_protocol(&self) -> bool {
        self.close(CloseOrigin::Protocol).await
    }

    /// Close because the underlying transport reported closure.
    /// Idempotent with respect to a concurrent protocol-side close.
    pub async fn close_from_transport(&self) -> bool {
        self.close(CloseOrigin::Transport).await
    }

    async fn close(&self, origin: CloseOrigin) -> bool {
        // First origin to flip the claim owns teardown; the loser sees
        // the channel as closed and does nothing.
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let _ = self.shutdown.send(true);
        let stream = self.io.lock().await.take();
        if let Some(mut stream) = stream {
            let _ = stream.shutdown().await;
        }
        tracing::debug!(?origin, peer = ?self.peer, "transport channel closed");
        true
    }
}

impl std::fmt::Debug for TransportChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportChannel")
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Handover point between the transport provider and the protocol layer.
///
/// Called once per established connection. Implementations must not block
/// the provider's accept loop; anything long-running (negotiation, the
/// session message loop) belongs on a spawned task.
pub trait ChannelListener: Send + Sync + 'static {
    /// A new channel is ready for protocol use.
    fn on_transport_channel_established(&self, channel: Arc<TransportChannel>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let client = TransportChannel::new(client);
        let server = TransportChannel::new(server);

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 16];
        let read = server.read_some(&mut buf).await.unwrap();
        assert_eq!(&buf[..read], b"ping");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, _server) = tokio::io::duplex(64);
        let channel = TransportChannel::new(client);

        assert!(channel.close_from_protocol().await);
        assert!(!channel.close_from_protocol().await);
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_concurrent_close_single_teardown() {
        for _ in 0..64 {
            let (client, _server) = tokio::io::duplex(64);
            let channel = Arc::new(TransportChannel::new(client));

            let a = tokio::spawn({
                let channel = Arc::clone(&channel);
                async move { channel.close_from_protocol().await }
            });
            let b = tokio::spawn({
                let channel = Arc::clone(&channel);
                async move { channel.close_from_transport().await }
            });

            let (a, b) = (a.await.unwrap(), b.await.unwrap());
            assert!(a ^ b, "exactly one close path must perform teardown");
            assert!(channel.is_closed());
        }
    }

    #[tokio::test]
    async fn test_blocked_read_fails_on_close() {
        let (client, _server) = tokio::io::duplex(64);
        let channel = Arc::new(TransportChannel::new(client));

        let reader = tokio::spawn({
            let channel = Arc::clone(&channel);
            async move {
                let mut buf = [0u8; 8];
                channel.read_some(&mut buf).await
            }
        });

        tokio::task::yield_now().await;
        channel.close_from_transport().await;

        assert!(matches!(
            reader.await.unwrap(),
            Err(NetconfError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_io_after_close_fails() {
        let (client, _server) = tokio::io::duplex(64);
        let channel = TransportChannel::new(client);
        channel.close_from_protocol().await;

        let mut buf = [0u8; 8];
        assert!(matches!(
            channel.read_some(&mut buf).await,
            Err(NetconfError::ChannelClosed)
        ));
        assert!(matches!(
            channel.write_all(b"x").await,
            Err(NetconfError::ChannelClosed)
        ));
    }
}
