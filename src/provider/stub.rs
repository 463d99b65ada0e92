//! In-memory provider.
//!
//! `StubCloud` implements every provider port on top of concurrent maps. It
//! backs the crate's tests and the `stratus simulate` command, and supports
//! injected faults and scripted status sequences so convergence and reaping
//! can be exercised without a real cloud.

use super::{
    AccessError, Image, ImageApi, ImageStatus, KeyPair, KeyPairApi, Node, NodeApi, NodeStatus,
    Operation, RegionAndName, ResourceAccessor, SecurityGroup, SecurityGroupApi,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A provider call recorded by the stub, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchNode(String),
    FetchImage(String),
    FetchOperation(String),
    DestroyNode(String),
    ResumeNode(String),
    SuspendNode(String),
    ListNodes(String),
    CreateImage { node_id: String, name: String },
    DescribeSecurityGroups(RegionAndName),
    DeleteSecurityGroup(RegionAndName),
    DescribeKeyPairs(String),
    DeleteKeyPair(RegionAndName),
}

/// Which stub operation an injected fault applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FaultTarget {
    DestroyNode(String),
    DeleteSecurityGroup(RegionAndName),
    DeleteKeyPair(RegionAndName),
    ListNodes(String),
    FetchNode(String),
    FetchImage(String),
    FetchOperation(String),
}

#[derive(Debug, Clone)]
struct Fault {
    error: AccessError,
    /// Remaining injections; `None` fails forever
    remaining: Option<u32>,
}

/// Sequence of observations returned by successive fetches.
///
/// The last entry repeats once the sequence is exhausted.
#[derive(Debug)]
struct Script<R> {
    steps: Mutex<VecDeque<Option<R>>>,
}

impl<R: Clone> Script<R> {
    fn new(steps: Vec<Option<R>>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
        }
    }

    fn next(&self) -> Option<R> {
        let mut steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
        if steps.len() > 1 {
            steps.pop_front().flatten()
        } else {
            steps.front().cloned().flatten()
        }
    }
}

/// An in-memory cloud.
#[derive(Default)]
pub struct StubCloud {
    nodes: DashMap<String, Node>,
    images: DashMap<String, Image>,
    operations: DashMap<String, Operation>,
    security_groups: DashMap<RegionAndName, SecurityGroup>,
    key_pairs: DashMap<RegionAndName, KeyPair>,
    node_scripts: DashMap<String, Script<Node>>,
    image_scripts: DashMap<String, Script<Image>>,
    operation_scripts: DashMap<String, Script<Operation>>,
    faults: DashMap<FaultTarget, Fault>,
    calls: Mutex<Vec<Call>>,
}

impl StubCloud {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    pub fn add_node(&self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn add_image(&self, image: Image) {
        self.images.insert(image.id.clone(), image);
    }

    pub fn add_operation(&self, operation: Operation) {
        self.operations.insert(operation.id.clone(), operation);
    }

    pub fn add_security_group(&self, region: &str, name: &str) {
        self.security_groups.insert(
            RegionAndName::new(region, name),
            SecurityGroup {
                region: region.to_string(),
                name: name.to_string(),
                id: Some(format!("sg-{}", uuid::Uuid::new_v4().simple())),
            },
        );
    }

    pub fn add_key_pair(&self, region: &str, key_name: &str) {
        self.key_pairs.insert(
            RegionAndName::new(region, key_name),
            KeyPair::new(region, key_name),
        );
    }

    /// Successive fetches of `id` return `steps` in order (`None` = not found).
    pub fn script_node(&self, id: &str, steps: Vec<Option<Node>>) {
        self.node_scripts.insert(id.to_string(), Script::new(steps));
    }

    pub fn script_image(&self, id: &str, steps: Vec<Option<Image>>) {
        self.image_scripts.insert(id.to_string(), Script::new(steps));
    }

    pub fn script_operation(&self, id: &str, steps: Vec<Option<Operation>>) {
        self.operation_scripts.insert(id.to_string(), Script::new(steps));
    }

    /// Fail the next `times` calls on `target` with `error`.
    pub fn fail_times(&self, target: FaultTarget, error: AccessError, times: u32) {
        self.faults.insert(
            target,
            Fault {
                error,
                remaining: Some(times),
            },
        );
    }

    /// Fail every call on `target` with `error`.
    pub fn fail_always(&self, target: FaultTarget, error: AccessError) {
        self.faults.insert(
            target,
            Fault {
                error,
                remaining: None,
            },
        );
    }

    /// Move an image to a new status.
    pub fn set_image_status(&self, id: &str, status: ImageStatus) {
        if let Some(mut image) = self.images.get_mut(id) {
            image.status = status;
        }
    }

    pub fn set_node_status(&self, id: &str, status: NodeStatus) {
        if let Some(mut node) = self.nodes.get_mut(id) {
            node.status = status;
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| pred(c))
            .count()
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.nodes.get(id).map(|n| n.clone())
    }

    pub fn has_security_group(&self, region: &str, name: &str) -> bool {
        self.security_groups
            .contains_key(&RegionAndName::new(region, name))
    }

    pub fn has_key_pair(&self, region: &str, key_name: &str) -> bool {
        self.key_pairs
            .contains_key(&RegionAndName::new(region, key_name))
    }

    pub fn security_group_count(&self) -> usize {
        self.security_groups.len()
    }

    pub fn key_pair_count(&self) -> usize {
        self.key_pairs.len()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn inject(&self, target: FaultTarget) -> Result<(), AccessError> {
        let Some(mut fault) = self.faults.get_mut(&target) else {
            return Ok(());
        };
        match fault.remaining {
            None => Err(fault.error.clone()),
            Some(0) => Ok(()),
            Some(n) => {
                fault.remaining = Some(n - 1);
                Err(fault.error.clone())
            }
        }
    }

    fn live_nodes_referencing(&self, region: &str, pred: impl Fn(&Node) -> bool) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.resolved_region() == Some(region) && !n.status.is_dead() && pred(n))
            .map(|n| n.id.clone())
            .collect()
    }
}

#[async_trait]
impl ResourceAccessor<Node> for StubCloud {
    async fn fetch(&self, id: &str) -> Result<Option<Node>, AccessError> {
        self.record(Call::FetchNode(id.to_string()));
        self.inject(FaultTarget::FetchNode(id.to_string()))?;
        if let Some(script) = self.node_scripts.get(id) {
            return Ok(script.next());
        }
        Ok(self.node(id))
    }
}

#[async_trait]
impl ResourceAccessor<Image> for StubCloud {
    async fn fetch(&self, id: &str) -> Result<Option<Image>, AccessError> {
        self.record(Call::FetchImage(id.to_string()));
        self.inject(FaultTarget::FetchImage(id.to_string()))?;
        if let Some(script) = self.image_scripts.get(id) {
            return Ok(script.next());
        }
        Ok(self.images.get(id).map(|i| i.clone()))
    }
}

#[async_trait]
impl ResourceAccessor<Operation> for StubCloud {
    async fn fetch(&self, id: &str) -> Result<Option<Operation>, AccessError> {
        self.record(Call::FetchOperation(id.to_string()));
        self.inject(FaultTarget::FetchOperation(id.to_string()))?;
        if let Some(script) = self.operation_scripts.get(id) {
            return Ok(script.next());
        }
        Ok(self.operations.get(id).map(|o| o.clone()))
    }
}

#[async_trait]
impl NodeApi for StubCloud {
    async fn destroy_node(&self, id: &str) -> Result<Option<Node>, AccessError> {
        self.record(Call::DestroyNode(id.to_string()));
        self.inject(FaultTarget::DestroyNode(id.to_string()))?;
        match self.nodes.get_mut(id) {
            Some(mut node) => {
                node.status = NodeStatus::Terminated;
                Ok(Some(node.clone()))
            }
            None => Ok(None),
        }
    }

    async fn resume_node(&self, id: &str) -> Result<(), AccessError> {
        self.record(Call::ResumeNode(id.to_string()));
        match self.nodes.get_mut(id) {
            Some(mut node) => {
                node.status = NodeStatus::Running;
                Ok(())
            }
            None => Err(AccessError::NotFound(id.to_string())),
        }
    }

    async fn suspend_node(&self, id: &str) -> Result<(), AccessError> {
        self.record(Call::SuspendNode(id.to_string()));
        match self.nodes.get_mut(id) {
            Some(mut node) => {
                node.status = NodeStatus::Suspended;
                Ok(())
            }
            None => Err(AccessError::NotFound(id.to_string())),
        }
    }

    async fn list_nodes(&self, region: &str) -> Result<Vec<Node>, AccessError> {
        self.record(Call::ListNodes(region.to_string()));
        self.inject(FaultTarget::ListNodes(region.to_string()))?;
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.resolved_region() == Some(region))
            .map(|n| n.clone())
            .collect())
    }
}

#[async_trait]
impl ImageApi for StubCloud {
    async fn create_image(&self, node_id: &str, name: &str) -> Result<String, AccessError> {
        self.record(Call::CreateImage {
            node_id: node_id.to_string(),
            name: name.to_string(),
        });
        let node = self
            .node(node_id)
            .ok_or_else(|| AccessError::NotFound(node_id.to_string()))?;
        let id = format!("img-{}", uuid::Uuid::new_v4().simple());
        let mut image = Image::new(id.clone(), name, ImageStatus::Pending);
        image.region = node.resolved_region().map(str::to_string);
        self.add_image(image);
        Ok(id)
    }
}

#[async_trait]
impl SecurityGroupApi for StubCloud {
    async fn describe_security_groups(
        &self,
        region: &str,
        name: &str,
    ) -> Result<Vec<SecurityGroup>, AccessError> {
        let key = RegionAndName::new(region, name);
        self.record(Call::DescribeSecurityGroups(key.clone()));
        Ok(self
            .security_groups
            .get(&key)
            .map(|g| vec![g.clone()])
            .unwrap_or_default())
    }

    async fn delete_security_group(&self, region: &str, name: &str) -> Result<(), AccessError> {
        let key = RegionAndName::new(region, name);
        self.record(Call::DeleteSecurityGroup(key.clone()));
        self.inject(FaultTarget::DeleteSecurityGroup(key.clone()))?;

        let users = self.live_nodes_referencing(region, |n| {
            n.security_groups.iter().any(|g| g == name)
        });
        if !users.is_empty() {
            return Err(AccessError::Conflict(format!(
                "security group {} in use by {:?}",
                key, users
            )));
        }

        self.security_groups
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| AccessError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl KeyPairApi for StubCloud {
    async fn describe_key_pairs(&self, region: &str) -> Result<Vec<KeyPair>, AccessError> {
        self.record(Call::DescribeKeyPairs(region.to_string()));
        let mut pairs: Vec<KeyPair> = self
            .key_pairs
            .iter()
            .filter(|kp| kp.region == region)
            .map(|kp| kp.clone())
            .collect();
        pairs.sort_by(|a, b| a.key_name.cmp(&b.key_name));
        Ok(pairs)
    }

    async fn delete_key_pair(&self, region: &str, key_name: &str) -> Result<(), AccessError> {
        let key = RegionAndName::new(region, key_name);
        self.record(Call::DeleteKeyPair(key.clone()));
        self.inject(FaultTarget::DeleteKeyPair(key.clone()))?;
        // Deleting an absent key pair succeeds, as on EC2.
        self.key_pairs.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OperationStatus;

    #[tokio::test]
    async fn test_script_repeats_last_step() {
        let cloud = StubCloud::new();
        cloud.script_operation(
            "op-1",
            vec![
                Some(Operation::new("op-1", OperationStatus::Pending)),
                Some(Operation::new("op-1", OperationStatus::Done)),
            ],
        );

        let first = ResourceAccessor::<Operation>::fetch(&cloud, "op-1").await.unwrap();
        let second = ResourceAccessor::<Operation>::fetch(&cloud, "op-1").await.unwrap();
        let third = ResourceAccessor::<Operation>::fetch(&cloud, "op-1").await.unwrap();
        assert_eq!(first.unwrap().status, OperationStatus::Pending);
        assert_eq!(second.unwrap().status, OperationStatus::Done);
        assert_eq!(third.unwrap().status, OperationStatus::Done);
    }

    #[tokio::test]
    async fn test_fault_injection_counts_down() {
        let cloud = StubCloud::new();
        cloud.add_security_group("us-east-1", "stratus#web");
        let target = FaultTarget::DeleteSecurityGroup(RegionAndName::new("us-east-1", "stratus#web"));
        cloud.fail_times(target, AccessError::Conflict("busy".into()), 2);

        assert!(cloud
            .delete_security_group("us-east-1", "stratus#web")
            .await
            .unwrap_err()
            .is_conflict());
        assert!(cloud
            .delete_security_group("us-east-1", "stratus#web")
            .await
            .is_err());
        assert!(cloud
            .delete_security_group("us-east-1", "stratus#web")
            .await
            .is_ok());
        assert!(!cloud.has_security_group("us-east-1", "stratus#web"));
    }

    #[tokio::test]
    async fn test_security_group_in_use_by_live_node_conflicts() {
        let cloud = StubCloud::new();
        cloud.add_security_group("us-east-1", "stratus#web");
        cloud.add_node(
            Node::new("us-east-1/i-1", NodeStatus::Running).with_security_group("stratus#web"),
        );

        let err = cloud
            .delete_security_group("us-east-1", "stratus#web")
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        cloud.set_node_status("us-east-1/i-1", NodeStatus::Terminated);
        assert!(cloud
            .delete_security_group("us-east-1", "stratus#web")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_destroy_marks_terminated_and_missing_is_none() {
        let cloud = StubCloud::new();
        cloud.add_node(Node::new("us-east-1/i-1", NodeStatus::Running));

        let destroyed = cloud.destroy_node("us-east-1/i-1").await.unwrap().unwrap();
        assert_eq!(destroyed.status, NodeStatus::Terminated);
        assert!(cloud.destroy_node("us-east-1/i-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_nodes_filters_by_region() {
        let cloud = StubCloud::new();
        cloud.add_node(Node::new("us-east-1/i-1", NodeStatus::Running));
        cloud.add_node(Node::new("eu-west-1/i-2", NodeStatus::Running));

        let nodes = cloud.list_nodes("us-east-1").await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "us-east-1/i-1");
    }
}
