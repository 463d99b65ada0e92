//! What a reap did, group by group.

use crate::provider::{AccessError, RegionAndName};
use serde::Serialize;

/// Fate of one incidental resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Deleted,
    /// Still referenced by a live node; left in place
    InUse,
    /// Already gone
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPairDisposition {
    pub key_name: String,
    pub disposition: Disposition,
}

/// Result of a completed group cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCleanup {
    pub security_group: Disposition,
    /// Key pairs matching the group, in name order
    pub key_pairs: Vec<KeyPairDisposition>,
}

impl GroupCleanup {
    pub fn deleted_key_pairs(&self) -> impl Iterator<Item = &str> {
        self.key_pairs
            .iter()
            .filter(|kp| kp.disposition == Disposition::Deleted)
            .map(|kp| kp.key_name.as_str())
    }

    /// Nothing was left to delete.
    pub fn is_noop(&self) -> bool {
        self.security_group != Disposition::Deleted
            && self
                .key_pairs
                .iter()
                .all(|kp| kp.disposition != Disposition::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GroupOutcome {
    Cleaned(GroupCleanup),
    /// Deletes kept reporting the resource in use
    Abandoned { attempts: u32, last_conflict: Option<String> },
    /// A provider call failed with a non-retryable error
    Failed { error: String },
}

impl GroupOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            GroupOutcome::Cleaned(_) => "cleaned",
            GroupOutcome::Abandoned { .. } => "abandoned",
            GroupOutcome::Failed { .. } => "failed",
        }
    }

    pub(crate) fn failed(error: &AccessError) -> Self {
        GroupOutcome::Failed {
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub group: RegionAndName,
    pub outcome: GroupOutcome,
}

/// Outcome of one [`reap_for_dead_nodes`] call.
///
/// Purely informational; reaping is best-effort and callers may drop it.
///
/// [`reap_for_dead_nodes`]: super::IncidentalResourceReaper::reap_for_dead_nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    /// Per-group results, ordered by region then group
    pub groups: Vec<GroupReport>,
    /// Dead nodes skipped because their region could not be derived
    pub unresolved_nodes: Vec<String>,
}

impl ReapReport {
    pub fn outcome(&self, region: &str, group: &str) -> Option<&GroupOutcome> {
        self.groups
            .iter()
            .find(|r| r.group.region == region && r.group.name == group)
            .map(|r| &r.outcome)
    }

    pub fn cleaned(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Cleaned(_)))
    }

    pub fn abandoned(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Abandoned { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Failed { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn count(&self, pred: impl Fn(&GroupOutcome) -> bool) -> usize {
        self.groups.iter().filter(|r| pred(&r.outcome)).count()
    }
}
