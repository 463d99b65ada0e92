use crate::poll::ConvergenceError;
use crate::provider::Image;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to an image being captured in the background.
///
/// Dropping the handle detaches the task; it keeps polling until the image
/// settles or its budget runs out.
#[derive(Debug)]
pub struct ImageTask {
    image_id: String,
    handle: JoinHandle<Result<Image, ConvergenceError>>,
    cancel: CancellationToken,
}

impl ImageTask {
    pub(super) fn new(
        image_id: String,
        handle: JoinHandle<Result<Image, ConvergenceError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            image_id,
            handle,
            cancel,
        }
    }

    /// Id the provider assigned to the new image.
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Stop polling. A pending [`ImageTask::wait`] resolves to
    /// [`ConvergenceError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the image to become available.
    pub async fn wait(self) -> Result<Image, ConvergenceError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ConvergenceError::Cancelled { attempts: 0 }),
        }
    }
}
