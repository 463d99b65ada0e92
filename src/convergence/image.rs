use super::{Absence, Classification, Classify};
use crate::poll::Diagnostic;
use crate::provider::{Image, ImageStatus};

/// Converges when an image becomes available.
///
/// Pending images keep the poll going; any other status is terminal. A
/// freshly requested image may not be listed yet, so absence is pending
/// unless configured otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageAvailable {
    absence: Absence,
}

impl ImageAvailable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_absence(mut self, absence: Absence) -> Self {
        self.absence = absence;
        self
    }
}

impl Classify<Image> for ImageAvailable {
    fn classify(&self, observed: Option<&Image>) -> Classification {
        let Some(image) = observed else {
            return self.absence.classify("image");
        };

        match &image.status {
            ImageStatus::Available => Classification::Converged,
            ImageStatus::Pending => Classification::Pending,
            other => Classification::Failed(Diagnostic::new(format!(
                "image {} is {}",
                image.id, other
            ))),
        }
    }
}
