//! Hello message construction and parsing.
//!
//! The hello is the first message on every NETCONF session: both peers
//! advertise their capability sets, and the server additionally assigns
//! the session id. A client hello may carry a transport-supplied
//! additional header (`[user;address:port;transport;session-label;]`)
//! prepended to the XML envelope, as call-home and proxy deployments do.

use crate::error::{NetconfError, Result};
use crate::protocol::capabilities::CapabilitySet;
use crate::protocol::BASE_NAMESPACE;
use crate::xml::{Node, QName};

/// Transport metadata prepended to a client hello.
///
/// Wire form: `[user;address:port;transport;session-label;]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalHeader {
    /// Authenticated user name.
    pub user: String,
    /// Source address of the client.
    pub address: String,
    /// Source port of the client.
    pub port: u16,
    /// Transport name (e.g. `ssh`, `tcp`, `tls`).
    pub transport: String,
    /// Deployment-defined session label.
    pub session_label: String,
}

impl AdditionalHeader {
    /// Create a header from its five fields.
    pub fn new(
        user: &str,
        address: &str,
        port: u16,
        transport: &str,
        session_label: &str,
    ) -> Self {
        Self {
            user: user.to_string(),
            address: address.to_string(),
            port,
            transport: transport.to_string(),
            session_label: session_label.to_string(),
        }
    }
}

impl std::fmt::Display for AdditionalHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{};{}:{};{};{};]",
            self.user, self.address, self.port, self.transport, self.session_label
        )
    }
}

impl std::str::FromStr for AdditionalHeader {
    type Err = NetconfError;

    fn from_str(s: &str) -> Result<Self> {
        let inner = s
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| malformed_header(s, "missing brackets"))?;

        let fields: Vec<&str> = inner.split(';').collect();
        // four populated fields plus the empty slot after the final ';'
        if fields.len() != 5 || !fields[4].is_empty() {
            return Err(malformed_header(s, "expected four ';'-terminated fields"));
        }

        let (address, port) = fields[1]
            .rsplit_once(':')
            .ok_or_else(|| malformed_header(s, "missing ':' in address field"))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| malformed_header(s, "port is not a number"))?;

        Ok(Self {
            user: fields[0].to_string(),
            address: address.to_string(),
            port,
            transport: fields[2].to_string(),
            session_label: fields[3].to_string(),
        })
    }
}

fn malformed_header(header: &str, reason: &str) -> NetconfError {
    NetconfError::HelloParse(format!("malformed additional header {header:?}: {reason}"))
}

/// A parsed or to-be-sent hello message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelloMessage {
    /// Hello sent by a client: capabilities plus optional transport
    /// metadata, never a session id.
    Client {
        /// Advertised capability set.
        capabilities: CapabilitySet,
        /// Transport-supplied metadata, if any.
        header: Option<AdditionalHeader>,
    },
    /// Hello sent by a server: capabilities plus the assigned session id.
    Server {
        /// Advertised capability set.
        capabilities: CapabilitySet,
        /// Assigned session id, strictly positive.
        session_id: u64,
    },
}

impl HelloMessage {
    /// Build a client hello.
    pub fn client_hello(
        capabilities: CapabilitySet,
        header: Option<AdditionalHeader>,
    ) -> Self {
        Self::Client {
            capabilities,
            header,
        }
    }

    /// Build a server hello. Fails unless `session_id` is strictly
    /// positive.
    pub fn server_hello(capabilities: CapabilitySet, session_id: u64) -> Result<Self> {
        if session_id == 0 {
            return Err(NetconfError::HelloParse(
                "session id must be strictly positive".to_string(),
            ));
        }
        Ok(Self::Server {
            capabilities,
            session_id,
        })
    }

    /// Advertised capability set.
    pub fn capabilities(&self) -> &CapabilitySet {
        match self {
            Self::Client { capabilities, .. } | Self::Server { capabilities, .. } => {
                capabilities
            }
        }
    }

    /// Session id, present only on server hellos.
    pub fn session_id(&self) -> Option<u64> {
        match self {
            Self::Client { .. } => None,
            Self::Server { session_id, .. } => Some(*session_id),
        }
    }

    /// Additional header, present only on client hellos that carry one.
    pub fn additional_header(&self) -> Option<&AdditionalHeader> {
        match self {
            Self::Client { header, .. } => header.as_ref(),
            Self::Server { .. } => None,
        }
    }

    /// Build the `<hello>` envelope tree.
    pub fn to_node(&self) -> Node {
        let mut capabilities = Node::new(QName::new(BASE_NAMESPACE, "capabilities"));
        for uri in self.capabilities().iter() {
            capabilities
                .children
                .push(Node::new(QName::new(BASE_NAMESPACE, "capability")).with_value(uri));
        }

        let mut hello =
            Node::new(QName::new(BASE_NAMESPACE, "hello")).with_child(capabilities);
        if let Self::Server { session_id, .. } = self {
            hello.children.push(
                Node::new(QName::new(BASE_NAMESPACE, "session-id"))
                    .with_value(&session_id.to_string()),
            );
        }
        hello
    }

    /// Parse a message tree into a hello.
    ///
    /// The variant is decided by the presence of the `session-id` child.
    /// Every structural violation is a typed [`NetconfError::HelloParse`].
    pub fn parse(node: &Node) -> Result<Self> {
        if node.name.local != "hello"
            || node.name.namespace.as_deref() != Some(BASE_NAMESPACE)
        {
            return Err(NetconfError::HelloParse(format!(
                "unexpected root element {}, wanted hello in the base namespace",
                node.name
            )));
        }

        let capabilities = node
            .child(BASE_NAMESPACE, "capabilities")
            .ok_or_else(|| {
                NetconfError::HelloParse("hello has no capabilities child".to_string())
            })?;
        let uris: Vec<&str> = capabilities
            .children_named(BASE_NAMESPACE, "capability")
            .map(|c| c.text().unwrap_or(""))
            .collect();
        let capabilities = CapabilitySet::from_uris(uris)?;

        match node.child(BASE_NAMESPACE, "session-id") {
            Some(id_node) => {
                let session_id = id_node
                    .text()
                    .unwrap_or("")
                    .parse::<u64>()
                    .map_err(|_| {
                        NetconfError::HelloParse(format!(
                            "session-id {:?} is not a positive integer",
                            id_node.text().unwrap_or("")
                        ))
                    })?;
                Self::server_hello(capabilities, session_id)
            }
            None => Ok(Self::Client {
                capabilities,
                header: None,
            }),
        }
    }

    /// Serialize to wire bytes: optional additional-header line followed
    /// by the XML envelope.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let xml = self.to_node().to_xml()?;
        let mut bytes = Vec::with_capacity(xml.len() + 64);
        if let Some(header) = self.additional_header() {
            bytes.extend_from_slice(header.to_string().as_bytes());
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(xml.as_bytes());
        Ok(bytes)
    }

    /// Parse wire bytes: strips the additional-header line if present,
    /// then parses the XML envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| NetconfError::HelloParse("hello is not valid UTF-8".to_string()))?;

        let (header, xml) = match text.strip_prefix('[') {
            Some(_) => {
                let end = text.find(']').ok_or_else(|| {
                    malformed_header(text, "unterminated additional header")
                })?;
                let header: AdditionalHeader = text[..=end].parse()?;
                (Some(header), text[end + 1..].trim_start())
            }
            None => (None, text.trim_start()),
        };

        let hello = Self::parse(&Node::from_xml(xml)?)?;
        match (hello, header) {
            (
                Self::Client {
                    capabilities,
                    header: _,
                },
                header,
            ) => Ok(Self::Client {
                capabilities,
                header,
            }),
            (server, None) => Ok(server),
            (Self::Server { .. }, Some(_)) => Err(NetconfError::HelloParse(
                "server hello must not carry an additional header".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::capabilities::urn;

    fn caps() -> CapabilitySet {
        CapabilitySet::from_uris([urn::BASE_1_0, urn::BASE_1_1, urn::CANDIDATE]).unwrap()
    }

    #[test]
    fn test_additional_header_roundtrip() {
        let text = "[admin;192.0.2.1:830;ssh;session-1;]";
        let header: AdditionalHeader = text.parse().unwrap();
        assert_eq!(header.user, "admin");
        assert_eq!(header.address, "192.0.2.1");
        assert_eq!(header.port, 830);
        assert_eq!(header.transport, "ssh");
        assert_eq!(header.session_label, "session-1");
        assert_eq!(header.to_string(), text);
    }

    #[test]
    fn test_additional_header_malformed() {
        for bad in [
            "admin;192.0.2.1:830;ssh;x;]",
            "[admin;192.0.2.1;ssh;x;]",
            "[admin;192.0.2.1:nan;ssh;x;]",
            "[admin;192.0.2.1:830;ssh;x]",
            "[admin;192.0.2.1:830;ssh;]",
        ] {
            assert!(
                bad.parse::<AdditionalHeader>().is_err(),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_client_hello_roundtrip() {
        let header = AdditionalHeader::new("admin", "10.0.0.7", 4830, "tcp", "client");
        let hello = HelloMessage::client_hello(caps(), Some(header.clone()));

        let wire = hello.to_bytes().unwrap();
        let parsed = HelloMessage::from_bytes(&wire).unwrap();
        assert_eq!(parsed, hello);
        assert_eq!(parsed.additional_header(), Some(&header));
        assert_eq!(parsed.capabilities(), &caps());
    }

    #[test]
    fn test_client_hello_without_header_roundtrip() {
        let hello = HelloMessage::client_hello(caps(), None);
        let parsed = HelloMessage::from_bytes(&hello.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, hello);
    }

    #[test]
    fn test_server_hello_roundtrip() {
        let hello = HelloMessage::server_hello(caps(), 17).unwrap();
        let parsed = HelloMessage::from_bytes(&hello.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, hello);
        assert_eq!(parsed.session_id(), Some(17));
    }

    #[test]
    fn test_server_hello_rejects_zero_id() {
        assert!(HelloMessage::server_hello(caps(), 0).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_root() {
        let node = Node::new(QName::new(BASE_NAMESPACE, "rpc"));
        assert!(matches!(
            HelloMessage::parse(&node),
            Err(NetconfError::HelloParse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_namespace() {
        let node = Node::from_xml(r#"<hello xmlns="urn:wrong"><capabilities/></hello>"#)
            .unwrap();
        assert!(HelloMessage::parse(&node).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_capabilities() {
        let node = Node::from_xml(&format!(r#"<hello xmlns="{BASE_NAMESPACE}"/>"#)).unwrap();
        assert!(matches!(
            HelloMessage::parse(&node),
            Err(NetconfError::HelloParse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_blank_capability() {
        let xml = format!(
            r#"<hello xmlns="{BASE_NAMESPACE}"><capabilities><capability> </capability></capabilities></hello>"#
        );
        let node = Node::from_xml(&xml).unwrap();
        assert!(HelloMessage::parse(&node).is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_session_id() {
        let xml = format!(
            r#"<hello xmlns="{BASE_NAMESPACE}"><capabilities><capability>{}</capability></capabilities><session-id>abc</session-id></hello>"#,
            urn::BASE_1_0
        );
        let node = Node::from_xml(&xml).unwrap();
        assert!(matches!(
            HelloMessage::parse(&node),
            Err(NetconfError::HelloParse(_))
        ));
    }
}
