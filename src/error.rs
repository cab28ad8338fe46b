//! NETCONF core error types.
//!
//! Every documented failure mode of the wire core maps to a distinct
//! variant so callers can decide retry/teardown/reporting policy without
//! string matching. Framing and negotiation errors are fatal to the
//! affected session; filter errors are synchronous call-boundary errors
//! with no partial output.

use thiserror::Error;

/// NETCONF core errors.
#[derive(Error, Debug)]
pub enum NetconfError {
    /// Wire-format violation: malformed chunk header, chunk terminator
    /// without content, oversized chunk. Fatal to the connection.
    #[error("Framing error: {0}")]
    Framing(String),

    /// The byte stream ended in the middle of a message. Signals an
    /// ordinary peer disconnect, not protocol abuse.
    #[error("Incomplete message: {0}")]
    IncompleteMessage(String),

    /// Malformed or missing required hello fields. Fatal to negotiation
    /// on this channel only.
    #[error("Hello parse error: {0}")]
    HelloParse(String),

    /// No valid hello arrived within the configured negotiation window.
    #[error("Negotiation timed out after {0:?}")]
    NegotiationTimeout(std::time::Duration),

    /// Structurally invalid filter tree. Rejected before any recursion,
    /// no partial filtering is performed.
    #[error("Filter validation error: {0}")]
    FilterValidation(String),

    /// Protocol-level violation outside the hello exchange.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation attempted on a channel that has been closed from either
    /// the protocol or the transport side.
    #[error("Channel closed")]
    ChannelClosed,

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// XML reader/writer failure while handling a message envelope.
    #[error("XML error: {0}")]
    Xml(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for NETCONF core operations
pub type Result<T> = std::result::Result<T, NetconfError>;

impl From<quick_xml::Error> for NetconfError {
    fn from(err: quick_xml::Error) -> Self {
        NetconfError::Xml(err.to_string())
    }
}

impl From<toml::de::Error> for NetconfError {
    fn from(err: toml::de::Error) -> Self {
        NetconfError::Config(err.to_string())
    }
}
