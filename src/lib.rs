//! # NETCONF Core - RFC 6241/6242 Wire Machinery
//!
//! Wire-level core of the NETCONF network-management protocol: message
//! framing over a byte stream, hello/capability negotiation, session
//! lifecycle with dual-origin teardown, and RFC 6241 §6 subtree
//! filtering.
//!
//! ## Features
//!
//! - **Dual framing**: legacy `]]>]]>` end-of-message delimiting and
//!   RFC 6242 chunked framing, switched once at hello time
//! - **Session negotiation**: hello exchange with capability
//!   intersection, session id assignment and a hard timeout
//! - **Transport abstraction**: bytes in, bytes out, two independent
//!   close origins with single-teardown semantics
//! - **Subtree filtering**: containment, selection, content-match and
//!   attribute-selector semantics over an abstract tree model
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │            transport provider (TCP, …)          │
//! │   on_transport_channel_established(channel)     │
//! └───────────────────────┬─────────────────────────┘
//!                         ▼
//! ┌─────────────────┐   bytes   ┌──────────────────┐
//! │ TransportChannel │ ───────> │   FrameDecoder   │
//! └─────────────────┘           └────────┬─────────┘
//!                                        ▼ messages
//!                  first message ┌──────────────────┐
//!               ┌─────────────── │ SessionNegotiator│
//!               ▼                └────────┬─────────┘
//!        HelloMessage                     ▼
//!        CapabilitySet  ──────────>   Session ──> dispatch loop
//!                                         │
//!                                         ▼ on request
//!                                   SubtreeFilter
//! ```
//!
//! ## Wire Formats
//!
//! | Mechanism      | Form                                | Used when            |
//! |----------------|-------------------------------------|----------------------|
//! | End-of-message | `<payload>]]>]]>`                   | always for hello; sessions without mutual base:1.1 |
//! | Chunked        | `\n#<len>\n<payload>…\n##\n`        | both peers advertise base:1.1 |
//!
//! ## Quick Start
//!
//! ### Framing Only (Stateless)
//!
//! ```rust,ignore
//! use netconf::framing::{encode_message, FrameDecoder, FramingMode, DEFAULT_MAX_CHUNK_SIZE};
//!
//! let wire = encode_message(b"<rpc message-id=\"1\"/>", FramingMode::Chunked)?;
//!
//! let mut decoder = FrameDecoder::new(DEFAULT_MAX_CHUNK_SIZE);
//! decoder.upgrade_to_chunked()?;
//! decoder.push(&wire)?;
//! assert!(decoder.next_message().is_some());
//! ```
//!
//! ### Full Session
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use netconf::protocol::{CapabilitySet, SessionIdAllocator, SessionNegotiator};
//! use netconf::transport::TcpConnector;
//!
//! let channel = TcpConnector::connect("192.0.2.1:830".parse()?).await?;
//! let mut session = SessionNegotiator::client(CapabilitySet::both_bases(), None)
//!     .negotiate(channel)
//!     .await?;
//!
//! session.send_message(b"<rpc message-id=\"1\"><get/></rpc>").await?;
//! let reply = session.read_message().await?;
//! ```
//!
//! ### Subtree Filtering
//!
//! ```rust,ignore
//! use netconf::filter::apply_rpc_filter;
//! use netconf::xml::Node;
//!
//! let filter = Node::from_xml(r#"<filter><top xmlns="urn:x"><a/></top></filter>"#)?;
//! let data = Node::from_xml(r#"<data><top xmlns="urn:x"><a>1</a><b>2</b></top></data>"#)?;
//! let projected = apply_rpc_filter(&filter, &data)?;
//! ```
//!
//! ## Modules
//!
//! - [`framing`]: end-of-message and chunked codecs
//! - [`protocol`]: capabilities, hello, negotiator, session, id allocation
//! - [`transport`]: channel abstraction and TCP provider
//! - [`server`]: per-channel negotiation/dispatch driver
//! - [`filter`]: RFC 6241 §6 subtree filtering
//! - [`xml`]: abstract tree model and XML codec
//! - [`config`]: configuration loading
//! - [`error`]: error types and result alias

pub mod config;
pub mod error;
pub mod filter;
pub mod framing;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod xml;

// Re-exports for convenience
pub use config::NetconfConfig;
pub use error::{NetconfError, Result};
pub use filter::{apply_notification_filter, apply_rpc_filter};
pub use framing::{encode_message, FrameDecoder, FramingMode};
pub use protocol::{
    AdditionalHeader, BaseVersion, CapabilitySet, HelloMessage, NegotiationState, Session,
    SessionIdAllocator, SessionNegotiator,
};
pub use server::{NetconfServer, SessionHandler};
pub use transport::{ChannelListener, TcpConnector, TcpServerTransport, TransportChannel};
pub use xml::{Node, QName};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
