//! Shared helpers for Stratus integration tests.
//!
//! Builds fleets on the in-memory provider so each test only states what
//! differs from the usual web/db layout.

#![allow(dead_code)]

use std::sync::Arc;
use stratus::compute::ComputeConvergence;
use stratus::config::StratusConfig;
use stratus::provider::stub::StubCloud;
use stratus::provider::{Node, NodeStatus, ProviderPorts};

// =============================================================================
// Well-Known Test Constants
// =============================================================================

pub const US_EAST: &str = "us-east-1";
pub const EU_WEST: &str = "eu-west-1";

/// Suffix used for every generated per-launch key pair
pub const KEY_SUFFIX: &str = "0a1b";

// =============================================================================
// Fleet Builders
// =============================================================================

pub fn security_group_name(group: &str) -> String {
    format!("stratus#{group}")
}

pub fn key_pair_name(group: &str) -> String {
    format!("stratus#{group}#{KEY_SUFFIX}")
}

/// Seed `count` nodes of `group` in `region`, with the group's security
/// group and key pair. Returns the node ids.
pub fn seed_group(
    cloud: &StubCloud,
    region: &str,
    group: &str,
    count: usize,
    status: NodeStatus,
) -> Vec<String> {
    cloud.add_security_group(region, &security_group_name(group));
    cloud.add_key_pair(region, &key_pair_name(group));
    (1..=count)
        .map(|i| {
            let id = format!("{region}/{group}-{i}");
            cloud.add_node(
                Node::new(id.as_str(), status)
                    .in_group(group)
                    .with_key_name(key_pair_name(group))
                    .with_security_group(security_group_name(group)),
            );
            id
        })
        .collect()
}

/// The nodes with the given ids, as the provider currently sees them.
pub fn nodes(cloud: &StubCloud, ids: &[String]) -> Vec<Node> {
    ids.iter().filter_map(|id| cloud.node(id)).collect()
}

// =============================================================================
// Facade Builders
// =============================================================================

pub fn compute(cloud: &Arc<StubCloud>) -> ComputeConvergence {
    compute_with(cloud, &StratusConfig::default())
}

pub fn compute_with(cloud: &Arc<StubCloud>, config: &StratusConfig) -> ComputeConvergence {
    ComputeConvergence::new(ProviderPorts::from_client(Arc::clone(cloud)), config)
        .expect("valid test config")
}
