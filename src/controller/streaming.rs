use super::{Controller, ControllerError};
use crate::capture::StreamingCycle;
use crate::permission::{PermissionGate, PermissionStatus};
use crate::scheduler::Scheduler;
use crate::view::{gated, View};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// Periodic-stream client: permission gate, timer and capture cycle.
pub struct StreamingController {
    gate: PermissionGate,
    cycle: Arc<StreamingCycle>,
    scheduler: Scheduler,
}

impl StreamingController {
    pub fn new(gate: PermissionGate, cycle: Arc<StreamingCycle>, scheduler: Scheduler) -> Self {
        Self {
            gate,
            cycle,
            scheduler,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn prediction(&self) -> String {
        self.cycle.prediction()
    }

    pub fn set_note(&self, note: impl Into<String>) {
        self.cycle.set_note(note);
    }

    /// Starts the timer. Already streaming is not an error.
    pub fn resume(&self) -> Result<bool, ControllerError> {
        if !self.gate.is_granted() {
            return Err(ControllerError::PermissionNotGranted);
        }
        let cycle = self.cycle.clone();
        Ok(self.scheduler.start(move || {
            cycle.tick();
        }))
    }

    pub fn pause(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn toggle(&self) -> Result<bool, ControllerError> {
        if self.is_streaming() {
            self.pause();
        } else {
            self.resume()?;
        }
        Ok(self.is_streaming())
    }

    fn start_if_granted(&self) {
        if let Err(e) = self.resume() {
            tracing::debug!("Not starting stream: {}", e);
        }
    }
}

#[async_trait]
impl Controller for StreamingController {
    #[instrument(skip(self))]
    async fn initialize(&self) {
        if self.gate.status() == PermissionStatus::Unknown {
            self.gate.request().await;
        }
        self.start_if_granted();
    }

    #[instrument(skip(self))]
    async fn request_permission(&self) -> View {
        // Only a fresh grant starts the stream; a paused stream stays paused
        let was_granted = self.gate.is_granted();
        if self.gate.request().await == PermissionStatus::Granted && !was_granted {
            self.start_if_granted();
        }
        self.view()
    }

    fn view(&self) -> View {
        gated(self.gate.status(), || View::Streaming {
            streaming: self.is_streaming(),
            prediction: self.cycle.prediction(),
            note: self.cycle.note(),
        })
    }

    fn shutdown(&self) {
        self.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::WAITING_FOR_PREDICTION;
    use crate::telemetry::Metrics;
    use crate::test_utils::{CameraBehaviour, MockCamera, MockPredictor, ScriptedPermission};
    use std::time::Duration;
    use tokio::time::sleep;

    struct Fixture {
        controller: StreamingController,
        camera: Arc<MockCamera>,
        predictor: Arc<MockPredictor>,
    }

    fn fixture(answers: &[PermissionStatus], predictor: MockPredictor) -> Fixture {
        let camera = Arc::new(MockCamera::new(CameraBehaviour::Frames));
        let predictor = Arc::new(predictor);
        let cycle = Arc::new(StreamingCycle::new(
            camera.clone(),
            predictor.clone(),
            Arc::new(Metrics::new().unwrap()),
            25,
            "",
        ));
        let gate = PermissionGate::new(Arc::new(ScriptedPermission::new(answers)));
        let controller =
            StreamingController::new(gate, cycle, Scheduler::new(Duration::from_millis(100)));

        Fixture {
            controller,
            camera,
            predictor,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_grant_autostarts_and_displays_prediction() {
        let f = fixture(&[PermissionStatus::Granted], MockPredictor::answering("hello"));
        assert_eq!(f.controller.view(), View::CheckingPermission);

        f.controller.initialize().await;
        assert!(f.controller.is_streaming());
        assert_eq!(f.controller.prediction(), WAITING_FOR_PREDICTION);

        sleep(Duration::from_millis(150)).await;

        assert_eq!(f.controller.prediction(), "hello");
        assert_eq!(
            f.controller.view(),
            View::Streaming {
                streaming: true,
                prediction: "hello".into(),
                note: String::new(),
            }
        );
        f.controller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_drops_ticks() {
        let f = fixture(
            &[PermissionStatus::Granted],
            MockPredictor::answering("hello").held(),
        );
        f.controller.initialize().await;

        sleep(Duration::from_millis(450)).await;
        f.controller.pause();

        assert_eq!(f.predictor.calls(), 1);
        assert_eq!(f.camera.captures(), 1);

        f.predictor.release();
        sleep(Duration::from_millis(10)).await;

        assert_eq!(f.controller.prediction(), "hello");
        assert_eq!(f.predictor.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_captures_until_resumed() {
        let f = fixture(&[PermissionStatus::Granted], MockPredictor::answering("A"));
        f.controller.initialize().await;

        sleep(Duration::from_millis(250)).await;
        assert!(f.controller.pause());
        let captured = f.camera.captures();
        assert_eq!(captured, 2);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(f.camera.captures(), captured);

        assert!(f.controller.toggle().unwrap());
        sleep(Duration::from_millis(150)).await;
        assert_eq!(f.camera.captures(), captured + 1);
        f.controller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_does_not_cancel_in_flight_request() {
        let f = fixture(
            &[PermissionStatus::Granted],
            MockPredictor::scripted(vec![(Duration::from_millis(300), Ok("late".into()))]),
        );
        f.controller.initialize().await;

        sleep(Duration::from_millis(150)).await;
        f.controller.pause();
        assert_eq!(f.controller.prediction(), WAITING_FOR_PREDICTION);

        sleep(Duration::from_millis(400)).await;
        assert_eq!(f.controller.prediction(), "late");
        assert_eq!(f.predictor.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_blocks_stream_until_retry_grants() {
        let f = fixture(
            &[PermissionStatus::Denied, PermissionStatus::Granted],
            MockPredictor::answering("A"),
        );
        f.controller.initialize().await;

        assert!(!f.controller.is_streaming());
        assert!(matches!(f.controller.view(), View::PermissionRequired { .. }));
        assert!(matches!(
            f.controller.resume(),
            Err(ControllerError::PermissionNotGranted)
        ));

        sleep(Duration::from_millis(500)).await;
        assert_eq!(f.camera.captures(), 0);

        let view = f.controller.request_permission().await;
        assert!(view.is_camera_ui());
        assert!(f.controller.is_streaming());
        f.controller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_twice_keeps_single_timer() {
        let f = fixture(&[PermissionStatus::Granted], MockPredictor::answering("A"));
        f.controller.initialize().await;

        assert!(!f.controller.resume().unwrap());

        sleep(Duration::from_millis(350)).await;
        assert_eq!(f.camera.captures(), 3);
        f.controller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_shown_and_stream_continues() {
        let f = fixture(
            &[PermissionStatus::Granted],
            MockPredictor::scripted(vec![
                (Duration::ZERO, Err(503)),
                (Duration::ZERO, Ok("B".into())),
            ]),
        );
        f.controller.initialize().await;

        sleep(Duration::from_millis(150)).await;
        assert_eq!(f.controller.prediction(), "Server error 503");

        sleep(Duration::from_millis(100)).await;
        assert_eq!(f.controller.prediction(), "B");
        f.controller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_retry_keeps_paused_stream_paused() {
        let f = fixture(&[PermissionStatus::Granted], MockPredictor::answering("A"));
        f.controller.initialize().await;

        sleep(Duration::from_millis(150)).await;
        f.controller.pause();
        let captured = f.camera.captures();

        let view = f.controller.request_permission().await;
        assert!(matches!(view, View::Streaming { streaming: false, .. }));

        sleep(Duration::from_millis(500)).await;
        assert!(!f.controller.is_streaming());
        assert_eq!(f.camera.captures(), captured);
    }
}
