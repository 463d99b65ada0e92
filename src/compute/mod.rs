//! Compute facade.
//!
//! The entry points the rest of a compute client calls: wait for a node to
//! reach a state, clean up after dead nodes, and the node and image
//! lifecycle calls built on top of the two.

mod image;


pub use image::ImageTask;

use crate::cache::{Caches, CredentialStore};
use crate::config::StratusConfig;
use crate::convergence::{ConvergenceEngine, ImageAvailable, NodeInState};
use crate::poll::{
    poll_fn, ConvergenceError, Diagnostic, PolicyError, PollOutcome, Poller, RetryPolicy, Step,
};
use crate::provider::{AccessError, Node, NodeApi, NodeStatus, ProviderPorts};
use crate::reaper::{IncidentalResourceReaper, ReapReport};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of destroying a batch of nodes.
#[derive(Debug, Default)]
pub struct DestroyReport {
    /// Nodes confirmed terminated, in request order
    pub destroyed: Vec<Node>,
    /// Ids the provider did not know about
    pub not_found: Vec<String>,
    pub failed: Vec<(String, ConvergenceError)>,
    pub reap: ReapReport,
}

/// Retry policies derived from the timeouts configuration.
#[derive(Debug, Clone, Copy)]
struct Budgets {
    /// The `[polling]` policy, for waits with no dedicated budget
    default: RetryPolicy,
    node_running: RetryPolicy,
    node_terminated: RetryPolicy,
    node_suspended: RetryPolicy,
    image_available: RetryPolicy,
}

/// Node convergence and cleanup over one provider.
pub struct ComputeConvergence {
    ports: ProviderPorts,
    reaper: Arc<IncidentalResourceReaper>,
    caches: Caches,
    budgets: Budgets,
    user_threads: usize,
    engine: ConvergenceEngine,
    cancel: CancellationToken,
}

impl ComputeConvergence {
    pub fn new(ports: ProviderPorts, config: &StratusConfig) -> Result<Self, PolicyError> {
        Self::with_caches(ports, Caches::new(), config)
    }

    /// Share caches with the rest of the client.
    pub fn with_caches(
        ports: ProviderPorts,
        caches: Caches,
        config: &StratusConfig,
    ) -> Result<Self, PolicyError> {
        let cancel = CancellationToken::new();
        let reaper = IncidentalResourceReaper::new(
            Arc::clone(&ports.nodes),
            Arc::clone(&ports.security_groups),
            Arc::clone(&ports.key_pairs),
            caches.clone(),
            &config.reaper,
        )?
        .with_poller(Poller::with_cancellation(cancel.clone()));
        let budgets = Budgets {
            default: config.polling.retry_policy()?,
            node_running: config.timeouts.node_running()?,
            node_terminated: config.timeouts.node_terminated()?,
            node_suspended: config.timeouts.node_suspended()?,
            image_available: config.timeouts.image_available()?,
        };

        Ok(Self {
            ports,
            reaper: Arc::new(reaper),
            caches,
            budgets,
            user_threads: config.executor.user_threads.max(1),
            engine: ConvergenceEngine::with_cancellation(cancel.clone()),
            cancel,
        })
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn reaper(&self) -> &IncidentalResourceReaper {
        &self.reaper
    }

    /// Policy used by [`ComputeConvergence::converge`].
    pub fn default_policy(&self) -> &RetryPolicy {
        &self.budgets.default
    }

    /// Cancel every wait in progress, including background image tasks and
    /// reaper retries.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Poll a node until it reaches `target`.
    ///
    /// Converges to `None` only when the target is
    /// [`NodeStatus::Terminated`] and the node has vanished.
    pub async fn converge_until(
        &self,
        node_id: &str,
        target: NodeStatus,
        policy: &RetryPolicy,
    ) -> Result<PollOutcome<Option<Node>>, AccessError> {
        self.engine
            .converge_until(&*self.ports.nodes, node_id, &NodeInState::new(target), policy)
            .await
    }

    /// [`ComputeConvergence::converge_until`] under the configured default
    /// policy.
    pub async fn converge(
        &self,
        node_id: &str,
        target: NodeStatus,
    ) -> Result<PollOutcome<Option<Node>>, AccessError> {
        self.converge_until(node_id, target, &self.budgets.default)
            .await
    }

    /// Best-effort cleanup of the resources `dead_nodes` leave behind.
    pub async fn reap_for_dead_nodes(&self, dead_nodes: &[Node]) -> ReapReport {
        self.reaper.reap_for_dead_nodes(dead_nodes).await
    }

    /// Destroy a node, wait until it has terminated, then reap its
    /// incidental resources.
    ///
    /// Returns `None` when the provider did not know the node.
    pub async fn destroy_node(&self, id: &str) -> Result<Option<Node>, ConvergenceError> {
        let destroyed = self.do_destroy_node(id).await?;
        if let Some(node) = &destroyed {
            self.reaper
                .reap_for_dead_nodes(std::slice::from_ref(node))
                .await;
        }
        Ok(destroyed)
    }

    /// Destroy nodes in parallel, then reap the whole batch once.
    pub async fn destroy_nodes(&self, ids: &[String]) -> DestroyReport {
        tracing::debug!(nodes = ids.len(), "Destroying nodes");
        let mut results: Vec<(usize, Result<Option<Node>, ConvergenceError>)> =
            stream::iter(ids.iter().enumerate())
                .map(|(i, id)| async move { (i, self.do_destroy_node(id).await) })
                .buffer_unordered(self.user_threads)
                .collect()
                .await;
        results.sort_by_key(|(i, _)| *i);

        let mut report = DestroyReport::default();
        for (i, result) in results {
            let id = ids[i].clone();
            match result {
                Ok(Some(node)) => report.destroyed.push(node),
                Ok(None) => report.not_found.push(id),
                Err(e) => {
                    tracing::warn!(node_id = %id, error = %e, "Failed to destroy node");
                    report.failed.push((id, e));
                }
            }
        }
        tracing::debug!(destroyed = report.destroyed.len(), "Destroyed nodes");

        report.reap = self.reaper.reap_for_dead_nodes(&report.destroyed).await;
        report
    }

    /// Resume a suspended node and wait until it runs.
    pub async fn resume_node(&self, id: &str) -> Result<Node, ConvergenceError> {
        tracing::debug!(node_id = %id, "Resuming node");
        self.ports.nodes.resume_node(id).await?;
        self.await_node(id, NodeStatus::Running, &self.budgets.node_running)
            .await
    }

    /// Suspend a node and wait until it is suspended.
    pub async fn suspend_node(&self, id: &str) -> Result<Node, ConvergenceError> {
        tracing::debug!(node_id = %id, "Suspending node");
        self.ports.nodes.suspend_node(id).await?;
        self.await_node(id, NodeStatus::Suspended, &self.budgets.node_suspended)
            .await
    }

    /// Start capturing an image of a node.
    ///
    /// Returns as soon as the provider accepted the request; the image is
    /// awaited on a background task.
    pub async fn create_image(&self, node_id: &str, name: &str) -> Result<ImageTask, ConvergenceError> {
        let image_id = self.ports.images.create_image(node_id, name).await?;
        let policy = self.budgets.image_available;
        tracing::info!(node_id = %node_id, image_id = %image_id, "Image requested");

        let images = Arc::clone(&self.ports.images);
        let cancel = self.cancel.child_token();
        let engine = ConvergenceEngine::with_cancellation(cancel.clone());
        let id = image_id.clone();
        let handle = tokio::spawn(async move {
            let outcome = engine
                .converge_until(&*images, &id, &ImageAvailable::new(), &policy)
                .await?;
            match outcome.into_result()? {
                Some(image) => Ok(image),
                None => Err(ConvergenceError::Failed(Diagnostic::with_status(
                    404,
                    format!("image {id} not found"),
                ))),
            }
        });

        Ok(ImageTask::new(image_id, handle, cancel))
    }

    /// Destroy without reaping. Retries while the provider refuses because
    /// the node is mid-transition.
    async fn do_destroy_node(&self, id: &str) -> Result<Option<Node>, ConvergenceError> {
        tracing::debug!(node_id = %id, "Destroying node");
        let policy = self.budgets.node_terminated;

        let nodes: Arc<dyn NodeApi> = Arc::clone(&self.ports.nodes);
        let node_id = id.to_string();
        let mut destroy = poll_fn(move || {
            let nodes = Arc::clone(&nodes);
            let node_id = node_id.clone();
            async move {
                match nodes.destroy_node(&node_id).await {
                    Ok(node) => Ok(Step::Done(node)),
                    Err(e) if e.is_conflict() => {
                        tracing::warn!(node_id = %node_id, error = %e, "Illegal state destroying node");
                        Ok(Step::Pending)
                    }
                    Err(e) => Err(e),
                }
            }
        });
        let destroyed = self
            .engine
            .poller()
            .poll_until(&mut destroy, &policy)
            .await?
            .into_result()?;

        let node = match destroyed {
            Some(node) => {
                let observed = self
                    .converge_until(id, NodeStatus::Terminated, &policy)
                    .await?
                    .into_result()?;
                Some(observed.unwrap_or(Node {
                    status: NodeStatus::Terminated,
                    ..node
                }))
            }
            None => None,
        };

        self.caches
            .credential_store
            .remove(&CredentialStore::node_key(id));
        metrics::counter!("stratus_nodes_destroyed_total").increment(1);
        tracing::debug!(node_id = %id, found = node.is_some(), "Destroyed node");
        Ok(node)
    }

    async fn await_node(
        &self,
        id: &str,
        target: NodeStatus,
        policy: &RetryPolicy,
    ) -> Result<Node, ConvergenceError> {
        match self.converge_until(id, target, policy).await?.into_result()? {
            Some(node) => Ok(node),
            None => Err(ConvergenceError::Failed(Diagnostic::with_status(
                404,
                format!("node {id} not found"),
            ))),
        }
    }
}
