//! `stratus simulate`: destroy a small fleet on the in-memory provider.
//!
//! The fleet has a `web` group of two nodes and a `db` group of one, each
//! with the security group and key pairs a compute client would have
//! created for it, plus one key pair that belongs to nobody.

use crate::cli::output::{format_reap_summary, format_reap_table};
use crate::cli::SimulateArgs;
use crate::compute::ComputeConvergence;
use crate::config::StratusConfig;
use crate::poll::PolicyError;
use crate::provider::stub::{FaultTarget, StubCloud};
use crate::provider::{AccessError, Node, NodeStatus, ProviderPorts, RegionAndName};
use crate::reaper::ReapReport;
use serde::Serialize;
use std::sync::Arc;

/// Key pair left in every simulated region that no group owns.
pub const FOREIGN_KEY_PAIR: &str = "deploy-key";

/// What a simulation destroyed and what it left behind.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub region: String,
    pub destroyed: Vec<String>,
    pub failed: Vec<String>,
    pub reap: ReapReport,
    pub remaining_security_groups: usize,
    pub remaining_key_pairs: usize,
}

/// Parameters of one simulated run.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub region: String,
    /// Conflicts injected on the web security group delete
    pub conflicts: u32,
    /// Leave `web-2` running
    pub keep_one: bool,
}

impl Scenario {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            conflicts: 0,
            keep_one: false,
        }
    }
}

/// Seed a fleet, destroy it and reap what it leaves behind.
pub async fn simulate(
    config: &StratusConfig,
    scenario: &Scenario,
) -> Result<SimulationReport, PolicyError> {
    let cloud = Arc::new(StubCloud::new());
    let region = scenario.region.as_str();
    let naming = config.reaper.naming();

    let mut targets = Vec::new();
    for (group, members) in [("web", 2), ("db", 1)] {
        let security_group = naming.shared_name_for_group(group);
        let key_name = naming.unique_name_for_group(group, "1a2b3c");
        cloud.add_security_group(region, &security_group);
        cloud.add_key_pair(region, &key_name);

        for i in 1..=members {
            let id = format!("{region}/{group}-{i}");
            cloud.add_node(
                Node::new(id.as_str(), NodeStatus::Running)
                    .in_group(group)
                    .with_key_name(key_name.as_str())
                    .with_security_group(security_group.as_str()),
            );
            if !(scenario.keep_one && group == "web" && i == members) {
                targets.push(id);
            }
        }
    }
    let d = naming.delimiter();
    cloud.add_key_pair(
        region,
        &format!("{}{d}web{d}{region}{d}9f", naming.prefix()),
    );
    cloud.add_key_pair(region, FOREIGN_KEY_PAIR);

    if scenario.conflicts > 0 {
        cloud.fail_times(
            FaultTarget::DeleteSecurityGroup(RegionAndName::new(
                region,
                naming.shared_name_for_group("web"),
            )),
            AccessError::Conflict("security group has dependent objects".to_string()),
            scenario.conflicts,
        );
    }

    let compute = ComputeConvergence::new(ProviderPorts::from_client(Arc::clone(&cloud)), config)?;
    tracing::info!(region = %region, nodes = targets.len(), "Destroying simulated fleet");
    let report = compute.destroy_nodes(&targets).await;

    Ok(SimulationReport {
        region: region.to_string(),
        destroyed: report.destroyed.into_iter().map(|n| n.id).collect(),
        failed: report.failed.into_iter().map(|(id, _)| id).collect(),
        reap: report.reap,
        remaining_security_groups: cloud.security_group_count(),
        remaining_key_pairs: cloud.key_pair_count(),
    })
}

/// Handle `stratus simulate` command
pub async fn run_simulate(args: &SimulateArgs, config: &StratusConfig) -> anyhow::Result<String> {
    let scenario = Scenario {
        region: args.region.clone(),
        conflicts: args.conflicts,
        keep_one: args.keep_one,
    };
    let report = simulate(config, &scenario).await?;

    if args.json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    Ok(format!(
        "Destroyed {} nodes in {}\n{}\n{}\nLeft behind: {} security groups, {} key pairs",
        report.destroyed.len(),
        report.region,
        format_reap_table(&report.reap),
        format_reap_summary(&report.reap),
        report.remaining_security_groups,
        report.remaining_key_pairs,
    ))
}
