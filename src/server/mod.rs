//! Server-side channel handling.
//!
//! [`NetconfServer`] is the protocol-side consumer of the transport
//! layer: it receives established channels through
//! [`ChannelListener::on_transport_channel_established`], spawns one task
//! per channel, runs the hello exchange there and then pumps framed
//! messages into a [`SessionHandler`]. The accept loop is never blocked;
//! negotiation and dispatch always run on the per-channel task.

use std::sync::Arc;

use crate::config::NetconfConfig;
use crate::error::Result;
use crate::protocol::{CapabilitySet, Session, SessionIdAllocator, SessionNegotiator};
use crate::transport::{ChannelListener, TcpServerTransport, TransportChannel};

/// Application hook for established sessions.
///
/// Message processing for one session is strictly sequential — calls for
/// a given session happen in wire order on that session's task.
pub trait SessionHandler: Send + Sync + 'static {
    /// A session finished its hello exchange.
    fn on_established(&self, _session: &Session) {}

    /// One inbound message payload. Return a payload to send back, or
    /// `None` when no reply is due.
    fn on_message(&self, session: &Session, payload: &[u8]) -> Option<Vec<u8>>;

    /// The session's channel was closed (either origin).
    fn on_closed(&self, _session_id: u64) {}
}

/// Protocol-side server: negotiates and dispatches every channel the
/// transport layer hands over.
pub struct NetconfServer {
    capabilities: CapabilitySet,
    config: NetconfConfig,
    allocator: Arc<SessionIdAllocator>,
    handler: Arc<dyn SessionHandler>,
}

impl NetconfServer {
    /// Create a server advertising the given capabilities.
    pub fn new(
        capabilities: CapabilitySet,
        config: NetconfConfig,
        handler: Arc<dyn SessionHandler>,
    ) -> Self {
        Self {
            capabilities,
            config,
            allocator: Arc::new(SessionIdAllocator::new()),
            handler,
        }
    }

    /// Bind a TCP transport from the configuration and serve forever.
    pub async fn serve(self: Arc<Self>) -> Result<()> {
        let transport = TcpServerTransport::new(self.config.bind_addr()?);
        transport.serve(self).await
    }

    async fn drive_channel(
        capabilities: CapabilitySet,
        config: NetconfConfig,
        allocator: Arc<SessionIdAllocator>,
        handler: Arc<dyn SessionHandler>,
        channel: Arc<TransportChannel>,
    ) {
        let mut negotiator = SessionNegotiator::server(capabilities, allocator)
            .with_timeout(config.negotiation_timeout())
            .with_max_chunk_size(config.max_chunk_size);

        let mut session = match negotiator.negotiate(channel).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "session negotiation failed");
                return;
            }
        };
        handler.on_established(&session);

        loop {
            match session.read_message().await {
                Ok(Some(payload)) => {
                    if let Some(reply) = handler.on_message(&session, &payload) {
                        if let Err(e) = session.send_message(&reply).await {
                            tracing::warn!(
                                session_id = session.id(),
                                error = %e,
                                "failed to send reply"
                            );
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(session_id = session.id(), error = %e, "session failed");
                    break;
                }
            }
        }

        let session_id = session.id();
        session.close().await;
        handler.on_closed(session_id);
        tracing::debug!(session_id, "session finished");
    }
}

impl ChannelListener for NetconfServer {
    fn on_transport_channel_established(&self, channel: Arc<TransportChannel>) {
        let capabilities = self.capabilities.clone();
        let config = self.config.clone();
        let allocator = Arc::clone(&self.allocator);
        let handler = Arc::clone(&self.handler);
        tokio::spawn(Self::drive_channel(
            capabilities,
            config,
            allocator,
            handler,
            channel,
        ));
    }
}
