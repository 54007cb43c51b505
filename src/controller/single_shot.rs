use super::{Controller, ControllerError};
use crate::camera::{CaptureDevice, CaptureMode, CaptureOptions, Facing};
use crate::payload::PredictRequest;
use crate::permission::{PermissionGate, PermissionStatus};
use crate::prediction::Predictor;
use crate::telemetry::Metrics;
use crate::view::{gated, View};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};
use tracing::instrument;

const VARIANT: &str = "single_shot";

/// Take-a-picture client.
///
/// Overlapping `take_picture` calls are not serialized: each one writes its
/// picture and prediction when it completes, so a slow earlier request can
/// overwrite the result of a faster later one.
pub struct SingleShotController {
    gate: PermissionGate,
    camera: Arc<dyn CaptureDevice>,
    predictor: Arc<dyn Predictor>,
    metrics: Arc<Metrics>,
    quality: u8,
    facing: RwLock<Facing>,
    mode: RwLock<CaptureMode>,
    recording: RwLock<bool>,
    picture: RwLock<Option<String>>,
    prediction: RwLock<Option<String>>,
}

impl SingleShotController {
    pub fn new(
        gate: PermissionGate,
        camera: Arc<dyn CaptureDevice>,
        predictor: Arc<dyn Predictor>,
        metrics: Arc<Metrics>,
        quality: u8,
    ) -> Self {
        Self {
            gate,
            camera,
            predictor,
            metrics,
            quality,
            facing: RwLock::new(Facing::Back),
            mode: RwLock::new(CaptureMode::Picture),
            recording: RwLock::new(false),
            picture: RwLock::new(None),
            prediction: RwLock::new(None),
        }
    }

    pub fn facing(&self) -> Facing {
        *self.facing.read()
    }

    pub fn toggle_facing(&self) -> Facing {
        let mut facing = self.facing.write();
        *facing = facing.flipped();
        *facing
    }

    pub fn mode(&self) -> CaptureMode {
        *self.mode.read()
    }

    pub fn is_recording(&self) -> bool {
        *self.recording.read()
    }

    /// Switches the shutter between pictures and recordings. Refused while a
    /// recording is running.
    pub fn toggle_mode(&self) -> Result<CaptureMode, ControllerError> {
        if self.is_recording() {
            return Err(ControllerError::RecordingInProgress);
        }
        let mut mode = self.mode.write();
        *mode = mode.toggled();
        Ok(*mode)
    }

    /// Starts a recording, or stops the running one. Recordings are never
    /// submitted for prediction.
    #[instrument(skip(self))]
    pub async fn toggle_recording(&self) -> Result<bool, ControllerError> {
        if !self.gate.is_granted() {
            return Err(ControllerError::PermissionNotGranted);
        }
        let mode = self.mode();
        if mode != CaptureMode::Video {
            return Err(ControllerError::WrongMode(mode));
        }

        if self.is_recording() {
            let stopped = self.camera.stop_recording().await;
            *self.recording.write() = false;
            let recording = stopped?;
            tracing::info!(
                "Video recorded: {} frames over {:?}",
                recording.len(),
                recording.elapsed
            );
            return Ok(false);
        }

        let options = CaptureOptions::new(self.quality, self.facing());
        self.camera.start_recording(options).await?;
        *self.recording.write() = true;
        Ok(true)
    }

    pub fn prediction(&self) -> Option<String> {
        self.prediction.read().clone()
    }

    /// Captures a still, shows it in place of the live view and submits its
    /// URI. A failed submission is logged and leaves the last prediction as is.
    #[instrument(skip(self))]
    pub async fn take_picture(&self) -> Result<String, ControllerError> {
        if !self.gate.is_granted() {
            return Err(ControllerError::PermissionNotGranted);
        }
        let mode = self.mode();
        if mode != CaptureMode::Picture {
            return Err(ControllerError::WrongMode(mode));
        }

        let options = CaptureOptions::new(self.quality, self.facing());
        let frame = match self.camera.capture_still(options).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to take picture: {:?}", e);
                self.metrics.record_failure(VARIANT, "capture");
                return Err(e.into());
            }
        };
        tracing::info!("Picture taken with URI: {}", frame.uri);
        *self.picture.write() = Some(frame.uri.clone());

        let started = Instant::now();
        self.metrics.record_submission(VARIANT);
        match self
            .predictor
            .predict(PredictRequest::from_uri(frame.uri.clone()))
            .await
        {
            Ok(prediction) => {
                let label = prediction.into_inner();
                tracing::info!("Predicted sign: {}", label);
                self.metrics
                    .record_prediction_duration(started.elapsed().as_millis() as u64, VARIANT);
                *self.prediction.write() = Some(label);
            }
            Err(e) => {
                tracing::error!("Failed to send picture to server: {:?}", e);
                self.metrics.record_failure(VARIANT, e.kind());
            }
        }

        Ok(frame.uri)
    }

    /// Drops the shown picture and goes back to the live view.
    pub fn retake(&self) {
        *self.picture.write() = None;
    }
}

#[async_trait]
impl Controller for SingleShotController {
    async fn initialize(&self) {
        if self.gate.status() == PermissionStatus::Unknown {
            self.gate.request().await;
        }
    }

    async fn request_permission(&self) -> View {
        self.gate.request().await;
        self.view()
    }

    fn view(&self) -> View {
        gated(self.gate.status(), || match self.picture.read().clone() {
            Some(uri) => View::Picture {
                uri,
                prediction: self.prediction(),
            },
            None => View::LiveCamera {
                facing: self.facing(),
                mode: self.mode(),
                recording: self.is_recording(),
                prediction: self.prediction(),
            },
        })
    }

    fn shutdown(&self) {
        if self.is_recording() {
            tracing::warn!("Shutting down with an unfinished recording");
        }
    }
}
