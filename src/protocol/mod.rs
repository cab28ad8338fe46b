//! NETCONF session establishment and lifecycle.
//!
//! Implements the RFC 6241 hello exchange over a byte-stream transport:
//! capability advertisement, session id assignment, framing-mode
//! selection and the framed message loop of an established session.
//!
//! ## Message Flow
//!
//! ```text
//! Client                               Server
//!    |                                    |
//!    |<------- <hello> + session-id -----|  server hello, sent eagerly
//!    |-------- <hello> + capabilities -->|  client hello
//!    |                                    |
//!    |   (framing switches to chunked     |
//!    |    iff both advertised base:1.1)   |
//!    |                                    |
//!    |======== framed <rpc> ============>|
//!    |<======= framed <rpc-reply> =======|
//! ```
//!
//! ## Negotiation State Machine
//!
//! | State                     | Description                        | Valid Transitions          |
//! |---------------------------|------------------------------------|----------------------------|
//! | `AwaitingHello`           | Local hello sent, peer's pending   | → NegotiatingCapabilities, Failed |
//! | `NegotiatingCapabilities` | Peer hello received                | → Established, Failed      |
//! | `Established`             | Session live, framed message loop  | (terminal)                 |
//! | `Failed`                  | Channel torn down                  | (terminal)                 |

mod capabilities;
mod hello;
mod negotiator;
mod session;
mod session_id;

pub use capabilities::{
    urn, BaseVersion, CapabilitySet, ModuleCapability, NegotiatedCapabilities,
};
pub use hello::{AdditionalHeader, HelloMessage};
pub use negotiator::{NegotiationState, SessionNegotiator};
pub use session::{Session, SessionStats};
pub use session_id::SessionIdAllocator;

/// XML namespace of the NETCONF base protocol (hello/rpc envelopes).
pub const BASE_NAMESPACE: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Default window for the hello exchange.
pub const DEFAULT_NEGOTIATION_TIMEOUT: std::time::Duration =
    std::time::Duration::from_secs(20);
