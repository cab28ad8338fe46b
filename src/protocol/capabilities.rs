//! Capability sets and the capability half of session negotiation.
//!
//! Capabilities are URIs advertised inside the hello exchange. The base
//! capability pins the protocol version (and with it the framing
//! mechanism); everything else is optional and usable as soon as the
//! advertiser lists it.

use std::collections::BTreeSet;

use crate::error::{NetconfError, Result};
use crate::framing::FramingMode;

/// Well-known capability URNs.
pub mod urn {
    /// NETCONF base:1.0 (end-of-message framing).
    pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";
    /// NETCONF base:1.1 (chunked framing, RFC 6242).
    pub const BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";
    /// Candidate configuration datastore.
    pub const CANDIDATE: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
    /// Writable running datastore.
    pub const WRITABLE_RUNNING: &str =
        "urn:ietf:params:netconf:capability:writable-running:1.0";
    /// Rollback-on-error edit-config semantics.
    pub const ROLLBACK_ON_ERROR: &str =
        "urn:ietf:params:netconf:capability:rollback-on-error:1.0";
    /// Event notifications (RFC 5277).
    pub const NOTIFICATION: &str = "urn:ietf:params:netconf:capability:notification:1.0";
    /// Notification/RPC interleaving.
    pub const INTERLEAVE: &str = "urn:ietf:params:netconf:capability:interleave:1.0";
    /// Validate operation.
    pub const VALIDATE_1_0: &str = "urn:ietf:params:netconf:capability:validate:1.0";
    /// URL-addressed datastores.
    pub const URL: &str = "urn:ietf:params:netconf:capability:url:1.0";
    /// XPath filtering.
    pub const XPATH: &str = "urn:ietf:params:netconf:capability:xpath:1.0";
    /// EXI encoding.
    pub const EXI: &str = "urn:ietf:params:netconf:capability:exi:1.0";
}

/// NETCONF base protocol version, derived from the advertised base URNs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BaseVersion {
    /// base:1.0 — end-of-message framing.
    V1_0,
    /// base:1.1 — chunked framing.
    V1_1,
}

impl BaseVersion {
    /// The capability URN advertising this version.
    pub fn as_urn(&self) -> &'static str {
        match self {
            Self::V1_0 => urn::BASE_1_0,
            Self::V1_1 => urn::BASE_1_1,
        }
    }

    /// The framing mechanism this version prescribes.
    pub fn framing_mode(&self) -> FramingMode {
        match self {
            Self::V1_0 => FramingMode::EndOfMessage,
            Self::V1_1 => FramingMode::Chunked,
        }
    }
}

impl std::fmt::Display for BaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1_0 => write!(f, "1.0"),
            Self::V1_1 => write!(f, "1.1"),
        }
    }
}

/// An immutable set of capability URIs.
///
/// Duplicates collapse, order is irrelevant, and at least one base
/// capability is always present. Derived facts (chunked framing support,
/// base version) are computed from the set, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    uris: BTreeSet<String>,
}

impl CapabilitySet {
    /// Build a set from capability URIs.
    ///
    /// Entries are trimmed. Fails if the collection is empty, contains an
    /// entry that is empty after trimming, or lacks a base capability.
    pub fn from_uris<I, S>(uris: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for uri in uris {
            let trimmed = uri.as_ref().trim();
            if trimmed.is_empty() {
                return Err(NetconfError::HelloParse(
                    "empty capability entry".to_string(),
                ));
            }
            set.insert(trimmed.to_string());
        }
        if set.is_empty() {
            return Err(NetconfError::HelloParse(
                "capability set must not be empty".to_string(),
            ));
        }
        if !set.contains(urn::BASE_1_0) && !set.contains(urn::BASE_1_1) {
            return Err(NetconfError::HelloParse(
                "capability set carries no base capability".to_string(),
            ));
        }
        Ok(Self { uris: set })
    }

    /// Convenience set advertising base:1.0 and base:1.1.
    pub fn both_bases() -> Self {
        Self::from_uris([urn::BASE_1_0, urn::BASE_1_1])
            .expect("static base capabilities are valid")
    }

    /// Check membership of an exact URI.
    pub fn contains(&self, uri: &str) -> bool {
        self.uris.contains(uri)
    }

    /// Iterate the URIs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.uris.iter().map(String::as_str)
    }

    /// Number of distinct capabilities.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Always false; kept for collection-like ergonomics.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Highest base protocol version advertised.
    pub fn base_version(&self) -> BaseVersion {
        if self.uris.contains(urn::BASE_1_1) {
            BaseVersion::V1_1
        } else {
            BaseVersion::V1_0
        }
    }

    /// True iff the set advertises base:1.1.
    pub fn supports_chunked_framing(&self) -> bool {
        self.uris.contains(urn::BASE_1_1)
    }

    /// True iff the set advertises the notification capability.
    pub fn supports_notifications(&self) -> bool {
        self.uris.contains(urn::NOTIFICATION)
    }

    /// Capabilities of the form `namespace?module=M[&revision=R]`,
    /// as advertised for YANG modules. Tolerates the mis-escaped
    /// `amp;revision=` form seen on real devices.
    pub fn module_capabilities(&self) -> Vec<ModuleCapability> {
        self.uris
            .iter()
            .filter_map(|uri| ModuleCapability::parse(uri))
            .collect()
    }

    /// Negotiate an effective capability set against the peer's.
    ///
    /// The effective base is the lower of the two peers' highest
    /// advertised versions; framing is chunked only when both sides
    /// advertise base:1.1. Optional capabilities need no two-way
    /// intersection: whatever the peer advertises is usable, except base
    /// URNs above the effective version, which are dropped.
    pub fn negotiate(&self, peer: &CapabilitySet) -> NegotiatedCapabilities {
        let base = self.base_version().min(peer.base_version());
        let framing = base.framing_mode();

        let effective: BTreeSet<String> = peer
            .uris
            .iter()
            .filter(|uri| match uri.as_str() {
                urn::BASE_1_1 => base >= BaseVersion::V1_1,
                _ => true,
            })
            .cloned()
            .collect();

        NegotiatedCapabilities {
            base,
            framing,
            effective: CapabilitySet { uris: effective },
        }
    }
}

/// A YANG module capability parsed out of a capability URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCapability {
    /// Module namespace (the URI before `?`).
    pub namespace: String,
    /// Module name.
    pub module: String,
    /// Module revision, if advertised.
    pub revision: Option<String>,
}

impl ModuleCapability {
    fn parse(uri: &str) -> Option<Self> {
        let (namespace, query) = uri.split_once('?')?;
        let mut module = None;
        let mut revision = None;
        for param in query.split('&') {
            if let Some(value) = param.strip_prefix("module=") {
                module = Some(value.to_string());
            } else if let Some(value) = param.strip_prefix("revision=") {
                revision = Some(value.to_string());
            } else if let Some(value) = param.strip_prefix("amp;revision=") {
                // seen on devices that double-escape the query string
                revision = Some(value.to_string());
            }
        }
        let module = module.filter(|m| !m.is_empty())?;
        Some(Self {
            namespace: namespace.to_string(),
            module,
            revision: revision.filter(|r| !r.is_empty()),
        })
    }
}

/// Outcome of capability negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedCapabilities {
    /// Effective base protocol version.
    pub base: BaseVersion,
    /// Framing mechanism the session will use after the hello exchange.
    pub framing: FramingMode,
    /// Effective capability set (peer-advertised, base-adjusted).
    pub effective: CapabilitySet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_collection() {
        assert!(CapabilitySet::from_uris(Vec::<&str>::new()).is_err());
    }

    #[test]
    fn test_rejects_blank_entry() {
        assert!(CapabilitySet::from_uris([urn::BASE_1_0, "  "]).is_err());
    }

    #[test]
    fn test_rejects_missing_base() {
        assert!(CapabilitySet::from_uris([urn::CANDIDATE]).is_err());
    }

    #[test]
    fn test_trims_and_deduplicates() {
        let caps =
            CapabilitySet::from_uris([urn::BASE_1_0, " urn:ietf:params:netconf:base:1.0 "])
                .unwrap();
        assert_eq!(caps.len(), 1);
    }

    #[test]
    fn test_base_version_and_framing() {
        let v10 = CapabilitySet::from_uris([urn::BASE_1_0]).unwrap();
        assert_eq!(v10.base_version(), BaseVersion::V1_0);
        assert!(!v10.supports_chunked_framing());

        let v11 = CapabilitySet::both_bases();
        assert_eq!(v11.base_version(), BaseVersion::V1_1);
        assert!(v11.supports_chunked_framing());
    }

    #[test]
    fn test_negotiation_takes_lower_base() {
        let old = CapabilitySet::from_uris([urn::BASE_1_0]).unwrap();
        let new = CapabilitySet::both_bases();

        let negotiated = new.negotiate(&old);
        assert_eq!(negotiated.base, BaseVersion::V1_0);
        assert_eq!(negotiated.framing, FramingMode::EndOfMessage);

        let negotiated = old.negotiate(&new);
        assert_eq!(negotiated.base, BaseVersion::V1_0);
        assert!(!negotiated.effective.contains(urn::BASE_1_1));
    }

    #[test]
    fn test_negotiation_chunked_needs_both_sides() {
        let both = CapabilitySet::both_bases();
        let negotiated = both.negotiate(&both);
        assert_eq!(negotiated.framing, FramingMode::Chunked);
    }

    #[test]
    fn test_negotiation_identical_sets_is_fixed_point() {
        let caps = CapabilitySet::from_uris([
            urn::BASE_1_0,
            urn::BASE_1_1,
            urn::CANDIDATE,
            urn::NOTIFICATION,
        ])
        .unwrap();

        let negotiated = caps.negotiate(&caps);
        assert_eq!(negotiated.effective, caps);
    }

    #[test]
    fn test_optional_capabilities_come_from_peer() {
        let local = CapabilitySet::from_uris([urn::BASE_1_0]).unwrap();
        let peer = CapabilitySet::from_uris([urn::BASE_1_0, urn::CANDIDATE]).unwrap();

        let negotiated = local.negotiate(&peer);
        assert!(negotiated.effective.contains(urn::CANDIDATE));
    }

    #[test]
    fn test_module_capability_parsing() {
        let caps = CapabilitySet::from_uris([
            urn::BASE_1_0,
            "urn:example:interfaces?module=interfaces&revision=2018-02-20",
            "urn:example:system?module=system",
            "urn:example:broken?module=broken&amp;revision=2017-01-01",
        ])
        .unwrap();

        let modules = caps.module_capabilities();
        assert_eq!(modules.len(), 3);

        let ifaces = modules
            .iter()
            .find(|m| m.module == "interfaces")
            .unwrap();
        assert_eq!(ifaces.namespace, "urn:example:interfaces");
        assert_eq!(ifaces.revision.as_deref(), Some("2018-02-20"));

        let system = modules.iter().find(|m| m.module == "system").unwrap();
        assert!(system.revision.is_none());

        let broken = modules.iter().find(|m| m.module == "broken").unwrap();
        assert_eq!(broken.revision.as_deref(), Some("2017-01-01"));
    }
}
