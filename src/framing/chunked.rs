//! RFC 6242 chunked framing.
//!
//! A chunked message is a sequence of `\n#<len>\n<payload>` chunks closed
//! by the trailer `\n##\n`. The decoder is a byte-level state machine:
//! every header/trailer byte is verified individually so a malformed
//! stream is detected at the first offending byte, and payload bytes are
//! consumed in bulk. Chunk lengths start with a non-zero digit, so a
//! zero-length chunk is rejected at the first length byte, and `##` where
//! a length is expected (a trailer with no preceding chunk) is equally a
//! framing error.
//!
//! Framing errors latch the decoder: a peer that has sent garbage is not
//! given another attempt on the same connection.

use bytes::{Bytes, BytesMut};

use crate::error::{NetconfError, Result};

/// Per-byte decoding states, named for the wire bytes they expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// `\n` opening a chunk header.
    HeaderNewline,
    /// `#` after the header newline.
    HeaderHash,
    /// First length digit, `[1-9]`.
    LengthFirst,
    /// Further length digits or the `\n` closing the header.
    LengthRest,
    /// Reading `chunk_size` payload bytes.
    Data,
    /// `\n` opening a trailer or the next chunk header.
    TrailerNewline,
    /// `#` after the trailer newline.
    TrailerHash,
    /// Either `#` (message trailer) or `[1-9]` (next chunk length).
    TrailerHashOrDigit,
    /// `\n` closing the `\n##\n` trailer.
    TrailerFinalNewline,
    /// A framing error occurred; all further input is rejected.
    Failed,
}

/// Decoder for RFC 6242 chunked messages.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: State,
    chunk_size: u64,
    remaining: u64,
    message: BytesMut,
    max_chunk_size: u64,
}

impl ChunkedDecoder {
    /// Create a decoder enforcing the given per-chunk size limit.
    pub fn new(max_chunk_size: u64) -> Self {
        Self {
            state: State::HeaderNewline,
            chunk_size: 0,
            remaining: 0,
            message: BytesMut::new(),
            max_chunk_size,
        }
    }

    /// Feed bytes from the transport and extract complete messages.
    ///
    /// An unterminated message is not an error; the decoder simply waits
    /// for more input. Any wire-format violation is a fatal
    /// [`NetconfError::Framing`] and permanently poisons the decoder.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        let mut messages = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            if self.state == State::Data {
                let take = (data.len() - pos).min(self.remaining as usize);
                self.message.extend_from_slice(&data[pos..pos + take]);
                self.remaining -= take as u64;
                pos += take;
                if self.remaining == 0 {
                    self.state = State::TrailerNewline;
                }
                continue;
            }

            let byte = data[pos];
            pos += 1;
            if let Some(message) = self.decode_byte(byte)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    fn decode_byte(&mut self, byte: u8) -> Result<Option<Bytes>> {
        match self.state {
            State::HeaderNewline => {
                self.expect(byte, b'\n', "malformed chunk header (byte 0)")?;
                self.state = State::HeaderHash;
            }
            State::HeaderHash => {
                self.expect(byte, b'#', "malformed chunk header (byte 1)")?;
                self.state = State::LengthFirst;
            }
            State::LengthFirst => {
                if byte == b'#' {
                    return Err(self.fail("chunk trailer without a preceding chunk"));
                }
                if !byte.is_ascii_digit() || byte == b'0' {
                    return Err(self.fail(&format!(
                        "invalid chunk size start byte 0x{byte:02x}"
                    )));
                }
                self.chunk_size = u64::from(byte - b'0');
                if self.chunk_size > self.max_chunk_size {
                    return Err(self.fail(&format!(
                        "chunk size {} exceeds maximum {}",
                        self.chunk_size, self.max_chunk_size
                    )));
                }
                self.state = State::LengthRest;
            }
            State::LengthRest => {
                if byte == b'\n' {
                    self.remaining = self.chunk_size;
                    self.state = State::Data;
                } else if byte.is_ascii_digit() {
                    self.chunk_size = self.chunk_size * 10 + u64::from(byte - b'0');
                    if self.chunk_size > self.max_chunk_size {
                        return Err(self.fail(&format!(
                            "chunk size {} exceeds maximum {}",
                            self.chunk_size, self.max_chunk_size
                        )));
                    }
                } else {
                    return Err(
                        self.fail(&format!("invalid chunk size byte 0x{byte:02x}"))
                    );
                }
            }
            State::Data => unreachable!("payload bytes are consumed in bulk"),
            State::TrailerNewline => {
                self.expect(byte, b'\n', "malformed chunk trailer (byte 0)")?;
                self.state = State::TrailerHash;
            }
            State::TrailerHash => {
                self.expect(byte, b'#', "malformed chunk trailer (byte 1)")?;
                self.state = State::TrailerHashOrDigit;
            }
            State::TrailerHashOrDigit => {
                if byte == b'#' {
                    self.state = State::TrailerFinalNewline;
                } else if byte.is_ascii_digit() && byte != b'0' {
                    // not a trailer after all: the next chunk of the same message
                    self.chunk_size = u64::from(byte - b'0');
                    self.state = State::LengthRest;
                } else {
                    return Err(
                        self.fail(&format!("malformed chunk trailer byte 0x{byte:02x}"))
                    );
                }
            }
            State::TrailerFinalNewline => {
                self.expect(byte, b'\n', "malformed chunk trailer (byte 3)")?;
                self.state = State::HeaderNewline;
                self.chunk_size = 0;
                return Ok(Some(self.message.split().freeze()));
            }
            State::Failed => {
                return Err(NetconfError::Framing(
                    "decoder poisoned by earlier framing error".to_string(),
                ));
            }
        }
        Ok(None)
    }

    fn expect(&mut self, byte: u8, expected: u8, context: &str) -> Result<()> {
        if byte == expected {
            Ok(())
        } else {
            Err(self.fail(&format!("{context}: got 0x{byte:02x}")))
        }
    }

    fn fail(&mut self, reason: &str) -> NetconfError {
        tracing::warn!(reason, "chunked framing violation");
        self.state = State::Failed;
        self.message.clear();
        NetconfError::Framing(reason.to_string())
    }

    /// True when the decoder sits between messages.
    pub fn is_idle(&self) -> bool {
        self.state == State::HeaderNewline && self.message.is_empty()
    }

    /// Signal end of stream. Mid-message state means the peer
    /// disconnected before terminating its message.
    pub fn finish(&self) -> Result<()> {
        if self.is_idle() || self.state == State::Failed {
            Ok(())
        } else {
            Err(NetconfError::IncompleteMessage(
                "stream ended inside a chunked message".to_string(),
            ))
        }
    }
}
