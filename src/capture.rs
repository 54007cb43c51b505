use crate::camera::{CameraError, CaptureDevice, CaptureOptions, Facing};
use crate::payload::PredictRequest;
use crate::prediction::{PredictionError, Predictor};
use crate::telemetry::Metrics;
use parking_lot::RwLock;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::instrument;

pub const WAITING_FOR_PREDICTION: &str = "Waiting for prediction…";

const VARIANT: &str = "streaming";

#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl CycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Camera(_) => "capture",
            CycleError::Prediction(e) => e.kind(),
        }
    }
}

/// Marks a submission as outstanding until dropped.
pub struct InFlight {
    flag: Arc<AtomicBool>,
}

impl InFlight {
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Latest prediction shown to the user. No history is kept.
#[derive(Debug)]
pub struct PredictionDisplay {
    text: RwLock<String>,
}

impl PredictionDisplay {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(initial.into()),
        }
    }

    pub fn get(&self) -> String {
        self.text.read().clone()
    }

    pub fn set(&self, text: impl Into<String>) {
        *self.text.write() = text.into();
    }
}

/// One streamed capture-and-submit cycle plus the state it touches.
pub struct StreamingCycle {
    camera: Arc<dyn CaptureDevice>,
    predictor: Arc<dyn Predictor>,
    metrics: Arc<Metrics>,
    quality: u8,
    note: RwLock<String>,
    display: PredictionDisplay,
    in_flight: Arc<AtomicBool>,
}

impl StreamingCycle {
    pub fn new(
        camera: Arc<dyn CaptureDevice>,
        predictor: Arc<dyn Predictor>,
        metrics: Arc<Metrics>,
        quality: u8,
        note: impl Into<String>,
    ) -> Self {
        Self {
            camera,
            predictor,
            metrics,
            quality,
            note: RwLock::new(note.into()),
            display: PredictionDisplay::new(WAITING_FOR_PREDICTION),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn prediction(&self) -> String {
        self.display.get()
    }

    pub fn note(&self) -> String {
        self.note.read().clone()
    }

    pub fn set_note(&self, note: impl Into<String>) {
        *self.note.write() = note.into();
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Starts a cycle in the background unless one is still outstanding, in
    /// which case the tick is dropped and `None` is returned.
    pub fn tick(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let Some(guard) = InFlight::try_acquire(&self.in_flight) else {
            tracing::debug!("Submission still in flight, dropping frame");
            self.metrics.record_skipped_tick();
            return None;
        };

        let cycle = self.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            cycle.run().await;
        }))
    }

    /// Runs one cycle and routes its outcome to the display. Never fails.
    pub async fn run(&self) {
        let started = Instant::now();
        match self.capture_and_submit().await {
            Ok(Some(label)) => {
                self.metrics
                    .record_prediction_duration(started.elapsed().as_millis() as u64, VARIANT);
                self.display.set(label);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!("Error during capture cycle: {:?}", err);
                self.metrics.record_failure(VARIANT, err.kind());
                self.display.set(err.to_string());
            }
        }
    }

    #[instrument(skip(self))]
    async fn capture_and_submit(&self) -> Result<Option<String>, CycleError> {
        let frame = self
            .camera
            .capture_still(CaptureOptions::new(self.quality, Facing::Back))
            .await?;
        if frame.is_empty() {
            return Ok(None);
        }

        let request = PredictRequest::from_frame(&frame, self.note());
        self.metrics.record_submission(VARIANT);
        let prediction = self.predictor.predict(request).await?;

        Ok(Some(prediction.into_inner()))
    }
}
