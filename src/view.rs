use crate::camera::{CaptureMode, Facing};
use crate::permission::PermissionStatus;
use serde::Serialize;

pub const PERMISSION_MESSAGE: &str = "We need your permission to use the camera";

/// What the client currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum View {
    CheckingPermission,
    PermissionRequired {
        message: String,
    },
    Streaming {
        streaming: bool,
        prediction: String,
        note: String,
    },
    LiveCamera {
        facing: Facing,
        mode: CaptureMode,
        recording: bool,
        prediction: Option<String>,
    },
    Picture {
        uri: String,
        prediction: Option<String>,
    },
}

impl View {
    pub fn is_camera_ui(&self) -> bool {
        !matches!(
            self,
            View::CheckingPermission | View::PermissionRequired { .. }
        )
    }
}

/// Builds the camera screen only once access is granted.
pub fn gated(status: PermissionStatus, camera_ui: impl FnOnce() -> View) -> View {
    match status {
        PermissionStatus::Unknown => View::CheckingPermission,
        PermissionStatus::Denied => View::PermissionRequired {
            message: PERMISSION_MESSAGE.into(),
        },
        PermissionStatus::Granted => camera_ui(),
    }
}
