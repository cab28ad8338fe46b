//! Hello exchange and session establishment.
//!
//! The negotiator drives one channel from handover to an established
//! [`Session`] or a typed failure:
//!
//! ```text
//!                    peer hello received
//!  [AwaitingHello] ────────────────────> [NegotiatingCapabilities]
//!        │                                        │
//!        │ timeout / bad hello /                  │ capabilities computed,
//!        │ channel closed                         │ framing switched
//!        v                                        v
//!     [Failed]                            [Established]
//! ```
//!
//! The hello exchange always runs in end-of-message framing; the switch
//! to chunked framing happens exactly once, after both peers advertised
//! base:1.1. Any failure closes the channel from the protocol side and
//! surfaces the reason to the caller.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{NetconfError, Result};
use crate::framing::{encode_message, FrameDecoder, FramingMode, DEFAULT_MAX_CHUNK_SIZE};
use crate::protocol::capabilities::CapabilitySet;
use crate::protocol::hello::{AdditionalHeader, HelloMessage};
use crate::protocol::session::Session;
use crate::protocol::session_id::SessionIdAllocator;
use crate::protocol::DEFAULT_NEGOTIATION_TIMEOUT;
use crate::transport::TransportChannel;

/// Negotiation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Local hello sent (or being sent), waiting for the peer's.
    AwaitingHello,
    /// Peer hello received, computing the effective capability set.
    NegotiatingCapabilities,
    /// Terminal: session established.
    Established,
    /// Terminal: channel torn down.
    Failed,
}

/// Which end of the session this negotiator drives, with the role's
/// private state.
#[derive(Debug)]
enum Role {
    /// Sends a client hello, receives the session id from the peer.
    Client { header: Option<AdditionalHeader> },
    /// Allocates the session id and sends it in the server hello.
    Server { allocator: Arc<SessionIdAllocator> },
}

impl Role {
    fn name(&self) -> &'static str {
        match self {
            Self::Client { .. } => "client",
            Self::Server { .. } => "server",
        }
    }
}

/// One-shot hello-exchange driver for a single channel.
pub struct SessionNegotiator {
    role: Role,
    local_caps: CapabilitySet,
    timeout: Duration,
    max_chunk_size: u64,
    state: NegotiationState,
}

impl SessionNegotiator {
    /// Negotiator for the server role: sends a server hello with a
    /// freshly allocated session id, expects a client hello back.
    pub fn server(local_caps: CapabilitySet, allocator: Arc<SessionIdAllocator>) -> Self {
        Self {
            role: Role::Server { allocator },
            local_caps,
            timeout: DEFAULT_NEGOTIATION_TIMEOUT,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            state: NegotiationState::AwaitingHello,
        }
    }

    /// Negotiator for the client role: sends a client hello (optionally
    /// carrying transport metadata), expects the server hello with the
    /// session id.
    pub fn client(local_caps: CapabilitySet, header: Option<AdditionalHeader>) -> Self {
        Self {
            role: Role::Client { header },
            local_caps,
            timeout: DEFAULT_NEGOTIATION_TIMEOUT,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            state: NegotiationState::AwaitingHello,
        }
    }

    /// Override the negotiation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the maximum incoming chunk size for the session.
    pub fn with_max_chunk_size(mut self, max_chunk_size: u64) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Current negotiation state.
    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Run the hello exchange on the channel.
    ///
    /// On any failure — timeout, malformed hello, protocol violation,
    /// transport loss — the channel is closed from the protocol side and
    /// the typed reason is returned.
    pub async fn negotiate(&mut self, channel: Arc<TransportChannel>) -> Result<Session> {
        if self.state != NegotiationState::AwaitingHello {
            return Err(NetconfError::Protocol(
                "negotiation already started on this negotiator".to_string(),
            ));
        }

        let outcome =
            tokio::time::timeout(self.timeout, self.run(Arc::clone(&channel))).await;
        match outcome {
            Ok(Ok(session)) => {
                self.set_state(NegotiationState::Established);
                Ok(session)
            }
            Ok(Err(e)) => {
                self.set_state(NegotiationState::Failed);
                channel.close_from_protocol().await;
                Err(e)
            }
            Err(_) => {
                self.set_state(NegotiationState::Failed);
                channel.close_from_protocol().await;
                tracing::warn!(
                    timeout = ?self.timeout,
                    "no hello received within the negotiation window"
                );
                Err(NetconfError::NegotiationTimeout(self.timeout))
            }
        }
    }

    async fn run(&mut self, channel: Arc<TransportChannel>) -> Result<Session> {
        let (local_hello, allocated_id) = match &self.role {
            Role::Server { allocator } => {
                let id = allocator.next_session_id();
                (
                    HelloMessage::server_hello(self.local_caps.clone(), id)?,
                    Some(id),
                )
            }
            Role::Client { header } => (
                HelloMessage::client_hello(self.local_caps.clone(), header.clone()),
                None,
            ),
        };

        // the hello itself always travels in end-of-message framing
        let wire = encode_message(&local_hello.to_bytes()?, FramingMode::EndOfMessage)?;
        channel.write_all(&wire).await?;
        tracing::debug!(role = self.role.name(), "hello sent, awaiting peer hello");

        let mut decoder = FrameDecoder::new(self.max_chunk_size);
        let frame = loop {
            if let Some(frame) = decoder.next_message() {
                break frame;
            }
            let mut buf = [0u8; 4096];
            let read = channel.read_some(&mut buf).await?;
            if read == 0 {
                return Err(NetconfError::IncompleteMessage(
                    "peer disconnected before sending a hello".to_string(),
                ));
            }
            decoder.push(&buf[..read])?;
        };

        let peer_hello = HelloMessage::from_bytes(&frame)?;
        self.set_state(NegotiationState::NegotiatingCapabilities);

        let session_id = match (&peer_hello, allocated_id) {
            (HelloMessage::Client { .. }, Some(id)) => id,
            (HelloMessage::Server { session_id, .. }, None) => *session_id,
            (HelloMessage::Server { .. }, Some(_)) => {
                return Err(NetconfError::HelloParse(
                    "peer hello unexpectedly carries a session-id".to_string(),
                ))
            }
            (HelloMessage::Client { .. }, None) => {
                return Err(NetconfError::HelloParse(
                    "server hello carries no session-id".to_string(),
                ))
            }
        };

        let negotiated = self.local_caps.negotiate(peer_hello.capabilities());
        if negotiated.framing == FramingMode::Chunked {
            decoder.upgrade_to_chunked()?;
        }
        tracing::debug!(
            session_id,
            base = %negotiated.base,
            framing = %negotiated.framing,
            "session established"
        );

        Ok(Session::new(session_id, negotiated, channel, decoder))
    }

    fn set_state(&mut self, next: NegotiationState) {
        tracing::debug!(from = ?self.state, to = ?next, "negotiation state change");
        self.state = next;
    }
}
