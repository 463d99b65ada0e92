use super::{Absence, Classification, Classify};
use crate::provider::{Node, NodeStatus};

/// Converges when a node reaches `target`.
///
/// A present node in another state is always pending; callers bound node
/// transitions with a timeout. A node that vanished has reached
/// [`NodeStatus::Terminated`], so absence converges for that target and is
/// pending for every other.
#[derive(Debug, Clone, Copy)]
pub struct NodeInState {
    target: NodeStatus,
    absence: Absence,
}

impl NodeInState {
    pub fn new(target: NodeStatus) -> Self {
        let absence = if target == NodeStatus::Terminated {
            Absence::Converged
        } else {
            Absence::Pending
        };
        Self { target, absence }
    }

    pub fn on_absence(mut self, absence: Absence) -> Self {
        self.absence = absence;
        self
    }

    pub fn target(&self) -> NodeStatus {
        self.target
    }
}

impl Classify<Node> for NodeInState {
    fn classify(&self, observed: Option<&Node>) -> Classification {
        match observed {
            Some(node) if node.status == self.target => Classification::Converged,
            Some(_) => Classification::Pending,
            None => self.absence.classify("node"),
        }
    }
}
