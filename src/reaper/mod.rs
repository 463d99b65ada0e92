//! Incidental resource reaper.
//!
//! Nodes launched into a group get a security group and a key pair created
//! on their behalf. Once the nodes are destroyed, those resources are only
//! clutter. The reaper deletes them best-effort: failures are logged and
//! reported per group, never raised.

mod group;
mod naming;
mod report;

#[cfg(test)]
mod tests;

pub use group::RegionGroups;
pub use naming::{GroupNamingConvention, KeyPairMatcher};
pub use report::*;

use crate::cache::Caches;
use crate::config::ReaperConfig;
use crate::poll::{PolicyError, PollOutcome, PollStep, Poller, RetryPolicy, Step};
use crate::provider::{
    AccessError, KeyPairApi, Node, NodeApi, RegionAndName, SecurityGroupApi,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Deletes the security groups and key pairs left behind by dead nodes.
pub struct IncidentalResourceReaper {
    nodes: Arc<dyn NodeApi>,
    security_groups: Arc<dyn SecurityGroupApi>,
    key_pairs: Arc<dyn KeyPairApi>,
    caches: Caches,
    naming: GroupNamingConvention,
    retry: RetryPolicy,
    max_concurrent_groups: usize,
    enabled: bool,
    poller: Poller,
}

impl IncidentalResourceReaper {
    pub fn new(
        nodes: Arc<dyn NodeApi>,
        security_groups: Arc<dyn SecurityGroupApi>,
        key_pairs: Arc<dyn KeyPairApi>,
        caches: Caches,
        config: &ReaperConfig,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            nodes,
            security_groups,
            key_pairs,
            caches,
            naming: config.naming(),
            retry: config.retry_policy()?,
            max_concurrent_groups: config.max_concurrent_groups.max(1),
            enabled: config.enabled,
            poller: Poller::new(),
        })
    }

    /// Use `poller` for the conflict retries, e.g. to share a cancellation
    /// token with the caller.
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    pub fn naming(&self) -> &GroupNamingConvention {
        &self.naming
    }

    /// Clean up after a batch of dead nodes.
    ///
    /// Groups are independent and run concurrently. Within a group the
    /// security group is deleted before the key pairs.
    pub async fn reap_for_dead_nodes(&self, dead_nodes: &[Node]) -> ReapReport {
        let groups = RegionGroups::from_nodes(dead_nodes);
        let mut report = ReapReport {
            groups: Vec::with_capacity(groups.len()),
            unresolved_nodes: groups.unresolved().to_vec(),
        };

        if !self.enabled {
            tracing::debug!(groups = groups.len(), "Reaper disabled, skipping cleanup");
            return report;
        }
        if groups.is_empty() {
            return report;
        }

        tracing::debug!(
            groups = groups.len(),
            dead_nodes = dead_nodes.len(),
            "Reaping incidental resources"
        );

        report.groups = stream::iter(groups.pairs())
            .map(|group| self.reap_group(group))
            .buffer_unordered(self.max_concurrent_groups)
            .collect()
            .await;
        report.groups.sort_by(|a, b| a.group.cmp(&b.group));

        for group in &report.groups {
            metrics::counter!("stratus_reaper_groups_total", "outcome" => group.outcome.label())
                .increment(1);
        }
        tracing::info!(
            cleaned = report.cleaned(),
            abandoned = report.abandoned(),
            failed = report.failed(),
            "Reap complete"
        );
        report
    }

    async fn reap_group(&self, group: RegionAndName) -> GroupReport {
        let mut step = GroupStep {
            reaper: self,
            group: &group,
            last_conflict: None,
        };
        let outcome = match self.poller.poll_until(&mut step, &self.retry).await {
            Ok(PollOutcome::Converged(cleanup)) => {
                tracing::debug!(region = %group.region, group = %group.name, "Deleted incidental resources");
                GroupOutcome::Cleaned(cleanup)
            }
            Ok(PollOutcome::TimedOut { attempts, .. }) | Ok(PollOutcome::Cancelled { attempts }) => {
                tracing::warn!(
                    region = %group.region,
                    group = %group.name,
                    attempts = attempts,
                    "Incidental resources still in use, giving up"
                );
                GroupOutcome::Abandoned {
                    attempts,
                    last_conflict: step.last_conflict.take(),
                }
            }
            Ok(PollOutcome::PermanentFailure(diagnostic)) => {
                tracing::warn!(
                    region = %group.region,
                    group = %group.name,
                    error = %diagnostic,
                    "Failed to delete incidental resources"
                );
                GroupOutcome::Failed {
                    error: diagnostic.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    region = %group.region,
                    group = %group.name,
                    error = %e,
                    "Failed to delete incidental resources"
                );
                GroupOutcome::failed(&e)
            }
        };
        GroupReport { group, outcome }
    }

    /// One cleanup attempt: security group first, then key pairs.
    async fn clean_up_group(&self, group: &RegionAndName) -> Result<GroupCleanup, AccessError> {
        let region = group.region.as_str();
        let live: Vec<Node> = self
            .nodes
            .list_nodes(region)
            .await?
            .into_iter()
            .filter(|n| !n.status.is_dead())
            .collect();

        let security_group = self.delete_security_group(group, &live).await?;
        if security_group == Disposition::InUse {
            // A live member still holds the group together.
            return Ok(GroupCleanup {
                security_group,
                key_pairs: Vec::new(),
            });
        }
        let key_pairs = self.delete_key_pairs(group, &live).await?;

        Ok(GroupCleanup {
            security_group,
            key_pairs,
        })
    }

    async fn delete_security_group(
        &self,
        group: &RegionAndName,
        live: &[Node],
    ) -> Result<Disposition, AccessError> {
        let region = group.region.as_str();
        let name = self.naming.shared_name_for_group(&group.name);

        let existing = self
            .security_groups
            .describe_security_groups(region, &name)
            .await?;
        if existing.is_empty() {
            return Ok(Disposition::Absent);
        }

        let users: Vec<&str> = live
            .iter()
            .filter(|n| n.security_groups.iter().any(|g| *g == name))
            .map(|n| n.id.as_str())
            .collect();
        if !users.is_empty() {
            tracing::debug!(region = %region, security_group = %name, nodes = ?users, "Security group in use");
            return Ok(Disposition::InUse);
        }

        tracing::debug!(region = %region, security_group = %name, "Deleting security group");
        match self.security_groups.delete_security_group(region, &name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(Disposition::Absent),
            Err(e) => return Err(e),
        }
        self.caches
            .security_groups
            .invalidate(&RegionAndName::new(region, name));
        Ok(Disposition::Deleted)
    }

    async fn delete_key_pairs(
        &self,
        group: &RegionAndName,
        live: &[Node],
    ) -> Result<Vec<KeyPairDisposition>, AccessError> {
        let region = group.region.as_str();
        let matcher = self.naming.key_pair_matcher(&group.name, region);
        let mut dispositions = Vec::new();

        for key_pair in self.key_pairs.describe_key_pairs(region).await? {
            let key_name = key_pair.key_name;
            if !matcher.matches(&key_name) {
                continue;
            }

            let users: Vec<&str> = live
                .iter()
                .filter(|n| n.key_name.as_deref() == Some(key_name.as_str()))
                .map(|n| n.id.as_str())
                .collect();
            let disposition = if !users.is_empty() {
                tracing::debug!(region = %region, key_pair = %key_name, nodes = ?users, "Key pair in use");
                Disposition::InUse
            } else {
                tracing::debug!(region = %region, key_pair = %key_name, "Deleting key pair");
                match self.key_pairs.delete_key_pair(region, &key_name).await {
                    Ok(()) => {
                        let credentials = &self.caches.credentials;
                        credentials.invalidate(&RegionAndName::new(region, key_name.as_str()));
                        credentials.invalidate(&RegionAndName::new(region, group.name.as_str()));
                        Disposition::Deleted
                    }
                    Err(e) if e.is_not_found() => Disposition::Absent,
                    Err(e) => return Err(e),
                }
            };
            dispositions.push(KeyPairDisposition {
                key_name,
                disposition,
            });
        }

        Ok(dispositions)
    }
}

/// A group cleanup attempt, retried while the provider reports a conflict.
struct GroupStep<'a> {
    reaper: &'a IncidentalResourceReaper,
    group: &'a RegionAndName,
    last_conflict: Option<String>,
}

#[async_trait]
impl<'a> PollStep for GroupStep<'a> {
    type Output = GroupCleanup;
    type Error = AccessError;

    async fn step(&mut self) -> Result<Step<GroupCleanup>, AccessError> {
        match self.reaper.clean_up_group(self.group).await {
            Ok(cleanup) => Ok(Step::Done(cleanup)),
            Err(e) if e.is_conflict() => {
                tracing::debug!(
                    region = %self.group.region,
                    group = %self.group.name,
                    error = %e,
                    "Incidental resources in use, will retry"
                );
                self.last_conflict = Some(e.to_string());
                Ok(Step::Pending)
            }
            Err(e) => Err(e),
        }
    }
}
