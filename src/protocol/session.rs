//! Established-session message loop.
//!
//! A [`Session`] is created once negotiation succeeds and owns the framed
//! read/write path for its channel. All message processing for one
//! session happens on one task; the only concurrent entry points are the
//! channel's close origins.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::framing::{encode_message, FrameDecoder, FramingMode};
use crate::protocol::capabilities::{BaseVersion, CapabilitySet, NegotiatedCapabilities};
use crate::transport::TransportChannel;

/// One negotiated NETCONF session bound to one transport channel.
pub struct Session {
    id: u64,
    negotiated: NegotiatedCapabilities,
    channel: Arc<TransportChannel>,
    decoder: FrameDecoder,
    messages_sent: u64,
    messages_received: u64,
}

impl Session {
    pub(crate) fn new(
        id: u64,
        negotiated: NegotiatedCapabilities,
        channel: Arc<TransportChannel>,
        decoder: FrameDecoder,
    ) -> Self {
        Self {
            id,
            negotiated,
            channel,
            decoder,
            messages_sent: 0,
            messages_received: 0,
        }
    }

    /// Session id assigned during the hello exchange.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Effective capability set.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.negotiated.effective
    }

    /// Effective base protocol version.
    pub fn base_version(&self) -> BaseVersion {
        self.negotiated.base
    }

    /// Framing mechanism in effect.
    pub fn framing_mode(&self) -> FramingMode {
        self.negotiated.framing
    }

    /// The underlying transport channel.
    pub fn channel(&self) -> &Arc<TransportChannel> {
        &self.channel
    }

    /// True once the channel has been closed from either origin.
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Receive the next message payload, in wire order.
    ///
    /// `Ok(None)` means the peer shut the stream down cleanly between
    /// messages; the channel is then closed from the transport side. A
    /// mid-message disconnect surfaces as an incomplete-message error,
    /// wire garbage as a framing error; both also close the channel.
    pub async fn read_message(&mut self) -> Result<Option<Bytes>> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(message) = self.decoder.next_message() {
                self.messages_received += 1;
                return Ok(Some(message));
            }

            let read = self.channel.read_some(&mut buf).await?;
            if read == 0 {
                let ended = self.decoder.finish();
                self.channel.close_from_transport().await;
                return ended.map(|()| None);
            }
            if let Err(e) = self.decoder.push(&buf[..read]) {
                // a peer that sent garbage gets no further attempts
                self.channel.close_from_protocol().await;
                return Err(e);
            }
        }
    }

    /// Frame and send one message payload.
    pub async fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        let wire = encode_message(payload, self.negotiated.framing)?;
        self.channel.write_all(&wire).await?;
        self.messages_sent += 1;
        Ok(())
    }

    /// Close the session from the protocol side. Returns whether this
    /// call performed the teardown.
    pub async fn close(&self) -> bool {
        self.channel.close_from_protocol().await
    }

    /// Message counters for monitoring.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id,
            messages_sent: self.messages_sent,
            messages_received: self.messages_received,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("base", &self.negotiated.base)
            .field("framing", &self.negotiated.framing)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Session message counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Session id.
    pub session_id: u64,
    /// Messages sent on this session.
    pub messages_sent: u64,
    /// Messages received on this session.
    pub messages_received: u64,
}
