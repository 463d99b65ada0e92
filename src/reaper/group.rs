//! Grouping dead nodes by the shared resources they owned.

use crate::provider::{Node, RegionAndName};
use std::collections::{BTreeMap, BTreeSet};

/// Distinct `(region, group)` pairs derived from a batch of dead nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionGroups {
    groups: BTreeMap<String, BTreeSet<String>>,
    /// Ids of grouped nodes whose region could not be derived
    unresolved: Vec<String>,
}

impl RegionGroups {
    /// Nodes without a group own no shared resources and are ignored.
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut result = Self::default();
        for node in nodes {
            let Some(group) = node.group.as_deref().filter(|g| !g.is_empty()) else {
                continue;
            };
            match node.resolved_region() {
                Some(region) => {
                    result
                        .groups
                        .entry(region.to_string())
                        .or_default()
                        .insert(group.to_string());
                }
                None => {
                    tracing::warn!(node_id = %node.id, group = %group, "Cannot derive region of dead node");
                    result.unresolved.push(node.id.clone());
                }
            }
        }
        result
    }

    pub fn regions(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.groups.iter().map(|(region, groups)| (region.as_str(), groups))
    }

    /// Every pair, ordered by region then group.
    pub fn pairs(&self) -> impl Iterator<Item = RegionAndName> + '_ {
        self.groups.iter().flat_map(|(region, groups)| {
            groups
                .iter()
                .map(move |group| RegionAndName::new(region.clone(), group.clone()))
        })
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
