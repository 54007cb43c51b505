mod single_shot;
mod streaming;

pub use single_shot::SingleShotController;
pub use streaming::StreamingController;

use crate::camera::{CameraError, CaptureMode};
use crate::view::View;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Camera permission not granted")]
    PermissionNotGranted,
    #[error("Capture failed: {0}")]
    Capture(#[from] CameraError),
    #[error("Not available in {0} mode")]
    WrongMode(CaptureMode),
    #[error("Cannot switch capture mode while recording")]
    RecordingInProgress,
}

/// Lifecycle shared by both client variants.
#[async_trait]
pub trait Controller: Send + Sync + 'static {
    /// Resolves the initial permission state and starts whatever the variant
    /// runs once access is granted.
    async fn initialize(&self);

    /// User-driven retry of the permission request.
    async fn request_permission(&self) -> View;

    fn view(&self) -> View;

    fn shutdown(&self);
}
