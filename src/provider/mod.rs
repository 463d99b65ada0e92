//! Provider ports.
//!
//! The core never talks to a wire format. Provider clients hand it
//! already-deserialized resources through the narrow async traits below and
//! report failures through [`AccessError`].
//!
//! All traits are object-safe and are meant to be held as `Arc<dyn Trait>`.

mod error;
pub mod stub;
mod types;

pub use error::*;
pub use types::*;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Fetches the current representation of a resource by id.
///
/// `Ok(None)` means the provider reported the resource as absent. How absence
/// is interpreted is up to the convergence classifier, never the accessor.
#[async_trait]
pub trait ResourceAccessor<R>: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Option<R>, AccessError>;
}

/// Adapts an async closure into a [`ResourceAccessor`].
///
/// ```
/// use stratus::provider::{AccessError, FnAccessor, Image, ImageStatus, ResourceAccessor};
///
/// # tokio_test::block_on(async {
/// let accessor = FnAccessor::new(|id: String| async move {
///     Ok::<_, AccessError>(Some(Image::new(id, "golden", ImageStatus::Available)))
/// });
/// let image = accessor.fetch("ami-1").await.unwrap().unwrap();
/// assert_eq!(image.id, "ami-1");
/// # });
/// ```
pub struct FnAccessor<F> {
    fetch: F,
}

impl<F> FnAccessor<F> {
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<R, F, Fut> ResourceAccessor<R> for FnAccessor<F>
where
    R: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<R>, AccessError>> + Send + 'static,
{
    async fn fetch(&self, id: &str) -> Result<Option<R>, AccessError> {
        (self.fetch)(id.to_string()).await
    }
}

/// Node lifecycle calls owned by the provider's compute client.
#[async_trait]
pub trait NodeApi: ResourceAccessor<Node> {
    /// Request destruction of a node.
    ///
    /// Returns the node as last seen, or `None` when it did not exist.
    /// Providers that refuse the call because the node is mid-transition
    /// report [`AccessError::Conflict`].
    async fn destroy_node(&self, id: &str) -> Result<Option<Node>, AccessError>;

    async fn resume_node(&self, id: &str) -> Result<(), AccessError>;

    async fn suspend_node(&self, id: &str) -> Result<(), AccessError>;

    /// List every node the provider knows about in a region, dead or alive.
    async fn list_nodes(&self, region: &str) -> Result<Vec<Node>, AccessError>;
}

/// Image calls owned by the provider's compute client.
#[async_trait]
pub trait ImageApi: ResourceAccessor<Image> {
    /// Start capturing an image of a node. Returns the new image id.
    async fn create_image(&self, node_id: &str, name: &str) -> Result<String, AccessError>;
}

/// Security groups, or firewall rules on providers that have no groups.
#[async_trait]
pub trait SecurityGroupApi: Send + Sync {
    async fn describe_security_groups(
        &self,
        region: &str,
        name: &str,
    ) -> Result<Vec<SecurityGroup>, AccessError>;

    /// Fails with [`AccessError::Conflict`] while the group is still referenced.
    async fn delete_security_group(&self, region: &str, name: &str) -> Result<(), AccessError>;
}

/// Key pairs, or networks on providers that bind nodes through them.
#[async_trait]
pub trait KeyPairApi: Send + Sync {
    async fn describe_key_pairs(&self, region: &str) -> Result<Vec<KeyPair>, AccessError>;

    async fn delete_key_pair(&self, region: &str, key_name: &str) -> Result<(), AccessError>;
}

/// The full set of ports a compute client hands to the core.
#[derive(Clone)]
pub struct ProviderPorts {
    pub nodes: Arc<dyn NodeApi>,
    pub images: Arc<dyn ImageApi>,
    pub security_groups: Arc<dyn SecurityGroupApi>,
    pub key_pairs: Arc<dyn KeyPairApi>,
}

impl ProviderPorts {
    /// Use one client for every port.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: NodeApi + ImageApi + SecurityGroupApi + KeyPairApi + 'static,
    {
        Self {
            nodes: client.clone(),
            images: client.clone(),
            security_groups: client.clone(),
            key_pairs: client,
        }
    }
}
