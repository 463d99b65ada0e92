use super::{Absence, Classification, Classify};
use crate::poll::Diagnostic;
use crate::provider::{Operation, OperationStatus};

/// Converges when an operation is DONE without an embedded HTTP error.
///
/// An embedded error fails the poll regardless of status. A missing
/// operation fails by default: operations are created by the call that
/// returned their id.
#[derive(Debug, Clone, Copy)]
pub struct OperationDone {
    absence: Absence,
}

impl Default for OperationDone {
    fn default() -> Self {
        Self {
            absence: Absence::Failed,
        }
    }
}

impl OperationDone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_absence(mut self, absence: Absence) -> Self {
        self.absence = absence;
        self
    }
}

impl Classify<Operation> for OperationDone {
    fn classify(&self, observed: Option<&Operation>) -> Classification {
        let Some(operation) = observed else {
            return self.absence.classify("operation");
        };

        if let Some(error) = &operation.http_error {
            let message = error
                .message
                .clone()
                .unwrap_or_else(|| format!("operation {} failed", operation.id));
            return Classification::Failed(Diagnostic::with_status(error.status_code, message));
        }

        match operation.status {
            OperationStatus::Done => Classification::Converged,
            OperationStatus::Pending | OperationStatus::Running => Classification::Pending,
        }
    }
}
