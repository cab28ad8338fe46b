//! Legacy end-of-message framing.
//!
//! Before base:1.1 is negotiated every NETCONF message is terminated by
//! the literal byte sequence `]]>]]>`. The decoder accumulates socket
//! reads and scans for the terminator; a partial terminator at the end of
//! one read is matched when the remaining bytes arrive.

use bytes::{Bytes, BytesMut};

use super::EOM_TERMINATOR;
use crate::error::{NetconfError, Result};

/// Decoder for `]]>]]>`-delimited messages.
#[derive(Debug, Default)]
pub struct EomDecoder {
    buffer: BytesMut,
    /// Offset below which no terminator can start. Avoids rescanning
    /// bytes already checked on earlier pushes.
    scan_pos: usize,
}

impl EomDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            scan_pos: 0,
        }
    }

    /// Feed bytes from the transport and extract complete messages.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        while self.scan_pos + EOM_TERMINATOR.len() <= self.buffer.len() {
            if &self.buffer[self.scan_pos..self.scan_pos + EOM_TERMINATOR.len()]
                == EOM_TERMINATOR
            {
                let payload = self.buffer.split_to(self.scan_pos).freeze();
                let _ = self.buffer.split_to(EOM_TERMINATOR.len());
                self.scan_pos = 0;
                messages.push(payload);
            } else {
                self.scan_pos += 1;
            }
        }
        messages
    }

    /// True when no partial message is buffered.
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Signal end of stream. A partially buffered message at this point
    /// means the peer disconnected mid-message.
    pub fn finish(&self) -> Result<()> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(NetconfError::IncompleteMessage(format!(
                "stream ended with {} unterminated bytes",
                self.buffer.len()
            )))
        }
    }

    /// Take the undecoded residue, leaving the decoder empty. Used when
    /// the session switches to chunked framing: bytes that arrived after
    /// the hello terminator already belong to the chunked stream.
    pub fn take_residual(&mut self) -> Bytes {
        self.scan_pos = 0;
        self.buffer.split().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_message() {
        let mut dec = EomDecoder::new();
        let msgs = dec.push(b"<hello/>]]>]]>");
        assert_eq!(msgs.len(), 1);
        assert_eq!(&msgs[0][..], b"<hello/>");
        assert!(dec.is_idle());
    }

    #[test]
    fn test_terminator_split_across_reads() {
        let mut dec = EomDecoder::new();
        assert!(dec.push(b"<rpc/>]]").is_empty());
        assert!(dec.push(b">]]").is_empty());
        let msgs = dec.push(b">");
        assert_eq!(msgs.len(), 1);
        assert_eq!(&msgs[0][..], b"<rpc/>");
    }

    #[test]
    fn test_multiple_messages_in_one_read() {
        let mut dec = EomDecoder::new();
        let msgs = dec.push(b"<a/>]]>]]><b/>]]>]]>");
        assert_eq!(msgs.len(), 2);
        assert_eq!(&msgs[0][..], b"<a/>");
        assert_eq!(&msgs[1][..], b"<b/>");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut dec = EomDecoder::new();
        let wire = b"<rpc><get/></rpc>]]>]]>";
        let mut msgs = Vec::new();
        for b in wire {
            msgs.extend(dec.push(&[*b]));
        }
        assert_eq!(msgs.len(), 1);
        assert_eq!(&msgs[0][..], b"<rpc><get/></rpc>");
    }

    #[test]
    fn test_finish_mid_message_is_incomplete() {
        let mut dec = EomDecoder::new();
        dec.push(b"<rpc>");
        assert!(matches!(
            dec.finish(),
            Err(NetconfError::IncompleteMessage(_))
        ));
    }

    #[test]
    fn test_residual_after_message() {
        let mut dec = EomDecoder::new();
        let msgs = dec.push(b"<hello/>]]>]]>\n#4\nabcd");
        assert_eq!(msgs.len(), 1);
        assert_eq!(&dec.take_residual()[..], b"\n#4\nabcd");
        assert!(dec.is_idle());
    }
}
