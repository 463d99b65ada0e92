//! Unit tests for classifiers and the convergence engine.

use super::*;
use crate::provider::stub::{Call, FaultTarget, StubCloud};
use crate::provider::{Image, ImageStatus, Node, NodeStatus, OperationStatus};
use std::time::Duration;
use tokio::time::Instant;

const SEC: Duration = Duration::from_secs(1);

fn policy() -> RetryPolicy {
    RetryPolicy::new(SEC, 10 * SEC).unwrap()
}

fn op(status: OperationStatus) -> Option<Operation> {
    Some(Operation::new("op-1", status).with_target("projects/p/zones/z/instances/web-1"))
}

fn operation_fetches(cloud: &StubCloud) -> usize {
    cloud.count_calls(|c| matches!(c, Call::FetchOperation(_)))
}

// ============================================================================
// Classifiers
// ============================================================================

#[test]
fn test_operation_done_classification() {
    let classifier = OperationDone::new();
    let pending = Operation::new("op", OperationStatus::Pending);
    let running = Operation::new("op", OperationStatus::Running);
    let done = Operation::new("op", OperationStatus::Done);

    assert_eq!(classifier.classify(Some(&pending)), Classification::Pending);
    assert_eq!(classifier.classify(Some(&running)), Classification::Pending);
    assert_eq!(classifier.classify(Some(&done)), Classification::Converged);
}

#[test]
fn test_operation_error_fails_even_when_done() {
    let failed = Operation::new("op", OperationStatus::Done).with_http_error(500, "quota exceeded");
    assert_eq!(
        OperationDone::new().classify(Some(&failed)),
        Classification::Failed(Diagnostic::with_status(500, "quota exceeded"))
    );
}

#[test]
fn test_missing_operation_fails_by_default() {
    let classification = Classify::<Operation>::classify(&OperationDone::new(), None);
    assert!(matches!(
        classification,
        Classification::Failed(Diagnostic { status: Some(404), .. })
    ));
    let lenient = OperationDone::new().on_absence(Absence::Pending);
    assert_eq!(
        Classify::<Operation>::classify(&lenient, None),
        Classification::Pending
    );
}

#[test]
fn test_image_available_classification() {
    let classifier = ImageAvailable::new();
    let image = |status| Image::new("ami-1", "golden", status);

    assert_eq!(
        classifier.classify(Some(&image(ImageStatus::Available))),
        Classification::Converged
    );
    assert_eq!(
        classifier.classify(Some(&image(ImageStatus::Pending))),
        Classification::Pending
    );
    for terminal in [
        ImageStatus::Deregistered,
        ImageStatus::Failed,
        ImageStatus::Other("invalid".to_string()),
    ] {
        assert!(matches!(
            classifier.classify(Some(&image(terminal))),
            Classification::Failed(_)
        ));
    }
    assert_eq!(
        Classify::<Image>::classify(&classifier, None),
        Classification::Pending
    );
}

#[test]
fn test_node_in_state_classification() {
    let running = NodeInState::new(NodeStatus::Running);
    let node = |status| Node::new("us-east-1/i-1", status);

    assert_eq!(
        running.classify(Some(&node(NodeStatus::Running))),
        Classification::Converged
    );
    assert_eq!(
        running.classify(Some(&node(NodeStatus::Error))),
        Classification::Pending
    );
    assert_eq!(
        Classify::<Node>::classify(&running, None),
        Classification::Pending
    );
}

#[test]
fn test_vanished_node_has_terminated() {
    let terminated = NodeInState::new(NodeStatus::Terminated);
    assert_eq!(
        Classify::<Node>::classify(&terminated, None),
        Classification::Converged
    );
}

// ============================================================================
// Operations
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_operation_pending_pending_done() {
    let cloud = StubCloud::new();
    cloud.script_operation(
        "op-1",
        vec![
            op(OperationStatus::Pending),
            op(OperationStatus::Pending),
            op(OperationStatus::Done),
        ],
    );

    let start = Instant::now();
    let outcome = ConvergenceEngine::new()
        .converge_until(&cloud, "op-1", &OperationDone::new(), &policy())
        .await
        .unwrap();

    match outcome {
        PollOutcome::Converged(Some(operation)) => {
            assert_eq!(operation.status, OperationStatus::Done)
        }
        other => panic!("expected convergence, got {other:?}"),
    }
    assert_eq!(operation_fetches(&cloud), 3);
    assert_eq!(start.elapsed(), 2 * SEC);
}

#[tokio::test(start_paused = true)]
async fn test_operation_with_http_error_fails_permanently() {
    let cloud = StubCloud::new();
    cloud.script_operation(
        "op-1",
        vec![
            op(OperationStatus::Pending),
            Some(Operation::new("op-1", OperationStatus::Done).with_http_error(500, "internal")),
        ],
    );

    let outcome = ConvergenceEngine::new()
        .converge_until(&cloud, "op-1", &OperationDone::new(), &policy())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PollOutcome::PermanentFailure(Diagnostic::with_status(500, "internal"))
    );
    assert_eq!(operation_fetches(&cloud), 2);
}

#[tokio::test(start_paused = true)]
async fn test_operation_times_out_after_eleven_fetches() {
    let cloud = StubCloud::new();
    cloud.add_operation(Operation::new("op-1", OperationStatus::Running));

    let outcome = ConvergenceEngine::new()
        .converge_until(&cloud, "op-1", &OperationDone::new(), &policy())
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::TimedOut { attempts: 11, .. }));
    assert_eq!(operation_fetches(&cloud), 11);
}

// ============================================================================
// Errors and absence
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_accessor_error_propagates_immediately() {
    let cloud = StubCloud::new();
    cloud.add_node(Node::new("us-east-1/i-1", NodeStatus::Pending));
    cloud.fail_times(
        FaultTarget::FetchNode("us-east-1/i-1".to_string()),
        AccessError::Unauthorized("expired token".to_string()),
        1,
    );

    let result = ConvergenceEngine::new()
        .converge_until(
            &cloud,
            "us-east-1/i-1",
            &NodeInState::new(NodeStatus::Running),
            &policy(),
        )
        .await;

    assert_eq!(
        result,
        Err(AccessError::Unauthorized("expired token".to_string()))
    );
    assert_eq!(cloud.count_calls(|c| matches!(c, Call::FetchNode(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_destroyed_node_converges_on_absence() {
    let cloud = StubCloud::new();
    let id = "us-east-1/i-1";
    cloud.script_node(
        id,
        vec![Some(Node::new(id, NodeStatus::ShuttingDown)), None],
    );

    let outcome = ConvergenceEngine::new()
        .converge_until(&cloud, id, &NodeInState::new(NodeStatus::Terminated), &policy())
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Converged(None));
}

#[tokio::test(start_paused = true)]
async fn test_image_becomes_available_after_appearing() {
    let cloud = StubCloud::new();
    let pending = Image::new("ami-1", "golden", ImageStatus::Pending);
    let available = Image::new("ami-1", "golden", ImageStatus::Available);
    cloud.script_image("ami-1", vec![None, Some(pending), Some(available.clone())]);

    let outcome = ConvergenceEngine::new()
        .converge_until(&cloud, "ami-1", &ImageAvailable::new(), &policy())
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Converged(Some(available)));
}

#[tokio::test(start_paused = true)]
async fn test_deregistered_image_fails() {
    let cloud = StubCloud::new();
    cloud.add_image(Image::new("ami-1", "golden", ImageStatus::Deregistered));

    let outcome = ConvergenceEngine::new()
        .converge_until(&cloud, "ami-1", &ImageAvailable::new(), &policy())
        .await
        .unwrap();

    match outcome {
        PollOutcome::PermanentFailure(diagnostic) => {
            assert!(diagnostic.message.contains("deregistered"))
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

// ============================================================================
// Operation then target
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_await_operation_then_fetch_target() {
    let cloud = StubCloud::new();
    cloud.script_operation(
        "op-1",
        vec![op(OperationStatus::Running), op(OperationStatus::Done)],
    );
    cloud.script_node(
        "web-1",
        vec![None, Some(Node::new("web-1", NodeStatus::Pending))],
    );

    let outcome: PollOutcome<Node> = ConvergenceEngine::new()
        .await_operation_then_fetch(&cloud, "op-1", &cloud, &policy())
        .await
        .unwrap();

    match outcome {
        PollOutcome::Converged(node) => assert_eq!(node.id, "web-1"),
        other => panic!("expected node, got {other:?}"),
    }
    assert_eq!(operation_fetches(&cloud), 2);
    assert_eq!(cloud.count_calls(|c| matches!(c, Call::FetchNode(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn test_each_phase_gets_the_full_timeout() {
    let cloud = StubCloud::new();
    let mut operation = vec![op(OperationStatus::Running); 8];
    operation.push(op(OperationStatus::Done));
    cloud.script_operation("op-1", operation);
    let mut target = vec![None; 8];
    target.push(Some(Node::new("web-1", NodeStatus::Running)));
    cloud.script_node("web-1", target);

    let start = Instant::now();
    let outcome: PollOutcome<Node> = ConvergenceEngine::new()
        .await_operation_then_fetch(&cloud, "op-1", &cloud, &policy())
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::Converged(_)));
    assert_eq!(operation_fetches(&cloud), 9);
    assert_eq!(cloud.count_calls(|c| matches!(c, Call::FetchNode(_))), 9);
    // 8s per phase, past the 10s timeout of either one alone.
    assert_eq!(start.elapsed(), 16 * SEC);
}

#[tokio::test(start_paused = true)]
async fn test_await_operation_failure_skips_target() {
    let cloud = StubCloud::new();
    cloud.add_operation(
        Operation::new("op-1", OperationStatus::Done)
            .with_target("instances/web-1")
            .with_http_error(403, "forbidden"),
    );

    let outcome: PollOutcome<Node> = ConvergenceEngine::new()
        .await_operation_then_fetch(&cloud, "op-1", &cloud, &policy())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PollOutcome::PermanentFailure(Diagnostic::with_status(403, "forbidden"))
    );
    assert_eq!(cloud.count_calls(|c| matches!(c, Call::FetchNode(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_engine_stops_polling() {
    let token = CancellationToken::new();
    let engine = ConvergenceEngine::with_cancellation(token.clone());
    let cloud = std::sync::Arc::new(StubCloud::new());
    cloud.add_image(Image::new("ami-1", "golden", ImageStatus::Pending));

    let polled = std::sync::Arc::clone(&cloud);
    let handle = tokio::spawn(async move {
        engine
            .converge_until(&*polled, "ami-1", &ImageAvailable::new(), &policy())
            .await
    });
    tokio::time::sleep(Duration::from_millis(1500)).await;
    token.cancel();

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, PollOutcome::Cancelled { attempts: 2 });
}
