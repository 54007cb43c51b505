use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Unknown,
    Denied,
    Granted,
}

#[async_trait]
pub trait PermissionProvider: Send + Sync + 'static {
    /// Asks for capture access. Only `Denied` or `Granted` are meaningful answers.
    async fn request(&self) -> PermissionStatus;
}

/// Grants access when the capture directory can be listed.
pub struct DirectoryAccess {
    dir: PathBuf,
}

impl DirectoryAccess {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PermissionProvider for DirectoryAccess {
    async fn request(&self) -> PermissionStatus {
        match tokio::fs::read_dir(&self.dir).await {
            Ok(_) => PermissionStatus::Granted,
            Err(e) => {
                tracing::warn!("Camera access denied for {:?}: {}", self.dir, e);
                PermissionStatus::Denied
            }
        }
    }
}

/// Tracks whether capture is authorized.
///
/// Starts out `Unknown`. A `Granted` gate never asks again.
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    status: RwLock<PermissionStatus>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self {
            provider,
            status: RwLock::new(PermissionStatus::Unknown),
        }
    }

    pub fn status(&self) -> PermissionStatus {
        *self.status.read()
    }

    pub fn is_granted(&self) -> bool {
        self.status() == PermissionStatus::Granted
    }

    #[instrument(skip(self))]
    pub async fn request(&self) -> PermissionStatus {
        if self.is_granted() {
            return PermissionStatus::Granted;
        }

        let answer = match self.provider.request().await {
            PermissionStatus::Unknown => PermissionStatus::Denied,
            other => other,
        };
        *self.status.write() = answer;
        tracing::info!("Camera permission is now {:?}", answer);

        answer
    }
}
