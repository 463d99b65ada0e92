//! Already-deserialized resource representations handed to the core by provider clients.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (region-or-zone, name) pair.
///
/// Identifies the incidental resources shared by a named group of nodes and
/// keys the credential and security-group caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionAndName {
    pub region: String,
    pub name: String,
}

impl RegionAndName {
    pub fn new(region: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RegionAndName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.name)
    }
}

/// Split a `region/id` handle into its two halves.
///
/// Returns `None` when the handle carries no region qualifier.
///
/// ```
/// use stratus::provider::parse_handle;
///
/// assert_eq!(parse_handle("us-east-1/i-0abc"), Some(("us-east-1", "i-0abc")));
/// assert_eq!(parse_handle("i-0abc"), None);
/// ```
pub fn parse_handle(handle: &str) -> Option<(&str, &str)> {
    match handle.split_once('/') {
        Some((region, id)) if !region.is_empty() && !id.is_empty() => Some((region, id)),
        _ => None,
    }
}

/// Lifecycle status of a compute node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Suspended,
    ShuttingDown,
    Terminated,
    Error,
    Unrecognized,
}

impl NodeStatus {
    /// Terminated and shutting-down nodes no longer hold on to shared resources.
    pub fn is_dead(self) -> bool {
        matches!(self, NodeStatus::Terminated | NodeStatus::ShuttingDown)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Suspended => "suspended",
            NodeStatus::ShuttingDown => "shutting-down",
            NodeStatus::Terminated => "terminated",
            NodeStatus::Error => "error",
            NodeStatus::Unrecognized => "unrecognized",
        };
        f.write_str(s)
    }
}

/// A compute node as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Provider handle, usually `region/instance-id`
    pub id: String,
    /// Region or zone; falls back to the handle prefix when absent
    pub region: Option<String>,
    /// Group the node was created in, if any
    pub group: Option<String>,
    pub status: NodeStatus,
    /// Name of the key pair the node was launched with
    pub key_name: Option<String>,
    /// Names of the security groups (or firewalls) attached to the node
    #[serde(default)]
    pub security_groups: Vec<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, status: NodeStatus) -> Self {
        Self {
            id: id.into(),
            region: None,
            group: None,
            status,
            key_name: None,
            security_groups: Vec::new(),
        }
    }

    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    pub fn with_security_group(mut self, name: impl Into<String>) -> Self {
        self.security_groups.push(name.into());
        self
    }

    /// Region of the node: the explicit attribute, else the handle prefix.
    pub fn resolved_region(&self) -> Option<&str> {
        match self.region.as_deref() {
            Some(region) if !region.is_empty() => Some(region),
            _ => parse_handle(&self.id).map(|(region, _)| region),
        }
    }
}

/// Status of a provider-side asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
}

/// HTTP error payload embedded in an operation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpError {
    pub status_code: u16,
    pub message: Option<String>,
}

/// An asynchronous operation mutating some target resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub status: OperationStatus,
    /// Link of the resource the operation is mutating
    pub target_link: String,
    /// Identifier of the particular incarnation of the target
    pub target_id: Option<String>,
    pub operation_type: String,
    pub http_error: Option<HttpError>,
    pub progress: Option<u8>,
}

impl Operation {
    pub fn new(id: impl Into<String>, status: OperationStatus) -> Self {
        Self {
            id: id.into(),
            status,
            target_link: String::new(),
            target_id: None,
            operation_type: "insert".to_string(),
            http_error: None,
            progress: None,
        }
    }

    pub fn with_target(mut self, target_link: impl Into<String>) -> Self {
        self.target_link = target_link.into();
        self
    }

    pub fn with_http_error(mut self, status_code: u16, message: impl Into<String>) -> Self {
        self.http_error = Some(HttpError {
            status_code,
            message: Some(message.into()),
        });
        self
    }

    /// Last path segment of the target link, i.e. the target's name.
    pub fn target_name(&self) -> Option<&str> {
        self.target_link
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
    }
}

/// State of a machine image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Pending,
    Available,
    Deregistered,
    Failed,
    /// Any state the provider reports that the client does not know about
    Other(String),
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageStatus::Pending => f.write_str("pending"),
            ImageStatus::Available => f.write_str("available"),
            ImageStatus::Deregistered => f.write_str("deregistered"),
            ImageStatus::Failed => f.write_str("failed"),
            ImageStatus::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub region: Option<String>,
    pub status: ImageStatus,
}

impl Image {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: ImageStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region: None,
            status,
        }
    }
}

/// A security group or firewall rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub region: String,
    pub name: String,
    pub id: Option<String>,
}

/// A key pair or an equivalent credential-bearing resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub region: String,
    pub key_name: String,
    pub fingerprint: Option<String>,
    /// Private key material, only present right after creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl KeyPair {
    pub fn new(region: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            key_name: key_name.into(),
            fingerprint: None,
            private_key: None,
        }
    }
}

/// Login credentials remembered for a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}
