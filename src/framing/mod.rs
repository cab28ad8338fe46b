//! Message framing over the NETCONF byte stream.
//!
//! Two framing mechanisms exist on the wire:
//!
//! - **End-of-message** (`]]>]]>` delimited) — the only mechanism a
//!   session may use until the hello exchange completes, and the
//!   permanent mechanism when either peer lacks base:1.1.
//! - **Chunked** (RFC 6242 `\n#<len>\n` chunks, `\n##\n` trailer) — used
//!   once both peers advertise base:1.1.
//!
//! [`FrameDecoder`] starts in end-of-message mode and can be upgraded to
//! chunked mode exactly once, immediately after a successful hello
//! exchange. Messages decoded before the switch stay queued in arrival
//! order, and raw bytes that followed the hello terminator are replayed
//! into the chunked decoder, so nothing is lost across the transition.

mod chunked;
mod eom;

pub use chunked::ChunkedDecoder;
pub use eom::EomDecoder;

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::{NetconfError, Result};

/// End-of-message terminator, RFC 6242 §4.3.
pub const EOM_TERMINATOR: &[u8] = b"]]>]]>";

/// Chunked-mode message trailer, RFC 6242 §4.2.
pub const CHUNK_TRAILER: &[u8] = b"\n##\n";

/// Default upper bound on the size of a single incoming chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Wire framing mechanism for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FramingMode {
    /// Legacy `]]>]]>` delimiting (base:1.0).
    #[default]
    EndOfMessage,
    /// RFC 6242 length-prefixed chunks (base:1.1).
    Chunked,
}

impl std::fmt::Display for FramingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfMessage => write!(f, "end-of-message"),
            Self::Chunked => write!(f, "chunked"),
        }
    }
}

/// Serialize one message payload into its wire form.
///
/// End-of-message mode appends the terminator; chunked mode emits the
/// payload as a single chunk followed by the trailer. Chunk lengths are
/// plain decimal with no leading zeros, which also makes an empty payload
/// unrepresentable in chunked mode.
pub fn encode_message(payload: &[u8], mode: FramingMode) -> Result<Vec<u8>> {
    match mode {
        FramingMode::EndOfMessage => {
            let mut wire = Vec::with_capacity(payload.len() + EOM_TERMINATOR.len());
            wire.extend_from_slice(payload);
            wire.extend_from_slice(EOM_TERMINATOR);
            Ok(wire)
        }
        FramingMode::Chunked => {
            if payload.is_empty() {
                return Err(NetconfError::Framing(
                    "cannot encode an empty payload as a chunk".to_string(),
                ));
            }
            let header = format!("\n#{}\n", payload.len());
            let mut wire =
                Vec::with_capacity(header.len() + payload.len() + CHUNK_TRAILER.len());
            wire.extend_from_slice(header.as_bytes());
            wire.extend_from_slice(payload);
            wire.extend_from_slice(CHUNK_TRAILER);
            Ok(wire)
        }
    }
}

enum Inner {
    Eom(EomDecoder),
    Chunked(ChunkedDecoder),
}

/// Stream decoder handling the one-shot end-of-message → chunked switch.
pub struct FrameDecoder {
    inner: Inner,
    queue: VecDeque<Bytes>,
    max_chunk_size: u64,
}

impl FrameDecoder {
    /// Create a decoder in end-of-message mode, the mode every session
    /// starts in.
    pub fn new(max_chunk_size: u64) -> Self {
        Self {
            inner: Inner::Eom(EomDecoder::new()),
            queue: VecDeque::new(),
            max_chunk_size,
        }
    }

    /// Current framing mode.
    pub fn mode(&self) -> FramingMode {
        match self.inner {
            Inner::Eom(_) => FramingMode::EndOfMessage,
            Inner::Chunked(_) => FramingMode::Chunked,
        }
    }

    /// Feed transport bytes; decoded messages queue up for
    /// [`next_message`](Self::next_message).
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.inner {
            Inner::Eom(dec) => self.queue.extend(dec.push(data)),
            Inner::Chunked(dec) => self.queue.extend(dec.push(data)?),
        }
        Ok(())
    }

    /// Pop the next complete message, in arrival order.
    pub fn next_message(&mut self) -> Option<Bytes> {
        self.queue.pop_front()
    }

    /// Switch to chunked framing. Permitted exactly once, after the hello
    /// exchange negotiated base:1.1 on both sides. Bytes buffered past the
    /// hello terminator are replayed into the chunked decoder; messages
    /// already decoded remain queued ahead of any chunked ones.
    pub fn upgrade_to_chunked(&mut self) -> Result<()> {
        let residual = match &mut self.inner {
            Inner::Eom(dec) => dec.take_residual(),
            Inner::Chunked(_) => {
                return Err(NetconfError::Protocol(
                    "framing already switched to chunked".to_string(),
                ))
            }
        };
        let mut chunked = ChunkedDecoder::new(self.max_chunk_size);
        if !residual.is_empty() {
            self.queue.extend(chunked.push(&residual)?);
        }
        self.inner = Inner::Chunked(chunked);
        tracing::debug!("framing switched to chunked");
        Ok(())
    }

    /// Signal end of stream; errors if the peer disconnected mid-message.
    pub fn finish(&self) -> Result<()> {
        match &self.inner {
            Inner::Eom(dec) => dec.finish(),
            Inner::Chunked(dec) => dec.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_end_of_message() {
        let wire = encode_message(b"<rpc/>", FramingMode::EndOfMessage).unwrap();
        assert_eq!(&wire[..], b"<rpc/>]]>]]>");
    }

    #[test]
    fn test_encode_chunked() {
        let wire = encode_message(b"<rpc/>", FramingMode::Chunked).unwrap();
        assert_eq!(&wire[..], b"\n#6\n<rpc/>\n##\n");
    }

    #[test]
    fn test_encode_chunked_rejects_empty() {
        assert!(matches!(
            encode_message(b"", FramingMode::Chunked),
            Err(NetconfError::Framing(_))
        ));
    }

    #[test]
    fn test_roundtrip_both_modes() {
        for mode in [FramingMode::EndOfMessage, FramingMode::Chunked] {
            let payload = b"<rpc message-id=\"1\"><get/></rpc>";
            let wire = encode_message(payload, mode).unwrap();

            let mut dec = FrameDecoder::new(DEFAULT_MAX_CHUNK_SIZE);
            if mode == FramingMode::Chunked {
                dec.upgrade_to_chunked().unwrap();
            }
            dec.push(&wire).unwrap();
            assert_eq!(&dec.next_message().unwrap()[..], payload);
            assert!(dec.next_message().is_none());
        }
    }

    #[test]
    fn test_upgrade_replays_residual_bytes() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_CHUNK_SIZE);
        // hello in EOM framing with the first chunked message glued on
        dec.push(b"<hello/>]]>]]>\n#5\n<get/\n#1\n>\n##\n").unwrap();
        assert_eq!(&dec.next_message().unwrap()[..], b"<hello/>");

        dec.upgrade_to_chunked().unwrap();
        assert_eq!(dec.mode(), FramingMode::Chunked);
        assert_eq!(&dec.next_message().unwrap()[..], b"<get/>");
    }

    #[test]
    fn test_upgrade_only_once() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_CHUNK_SIZE);
        dec.upgrade_to_chunked().unwrap();
        assert!(dec.upgrade_to_chunked().is_err());
    }

    #[test]
    fn test_pre_switch_messages_stay_queued_in_order() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_CHUNK_SIZE);
        dec.push(b"<hello/>]]>]]><early/>]]>]]>").unwrap();
        dec.upgrade_to_chunked().unwrap();
        dec.push(b"\n#7\n<late/>\n##\n").unwrap();

        assert_eq!(&dec.next_message().unwrap()[..], b"<hello/>");
        assert_eq!(&dec.next_message().unwrap()[..], b"<early/>");
        assert_eq!(&dec.next_message().unwrap()[..], b"<late/>");
    }
}
