use crate::camera::{CameraError, CaptureDevice, CaptureOptions, Frame, Recording};
use crate::payload::{PredictRequest, Prediction};
use crate::permission::{PermissionProvider, PermissionStatus};
use crate::prediction::{PredictionError, Predictor};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::Notify;

/// Answers with a scripted sequence, repeating the last answer.
pub struct ScriptedPermission {
    answers: Mutex<VecDeque<PermissionStatus>>,
    pub asked: Mutex<usize>,
}

impl ScriptedPermission {
    pub fn new(answers: &[PermissionStatus]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            asked: Mutex::new(0),
        }
    }
}

#[async_trait]
impl PermissionProvider for ScriptedPermission {
    async fn request(&self) -> PermissionStatus {
        *self.asked.lock() += 1;
        let mut answers = self.answers.lock();
        if answers.len() > 1 {
            answers.pop_front().unwrap_or(PermissionStatus::Denied)
        } else {
            answers.front().copied().unwrap_or(PermissionStatus::Denied)
        }
    }
}

pub enum CameraBehaviour {
    Frames,
    Empty,
    Broken,
}

pub struct MockCamera {
    behaviour: CameraBehaviour,
    pub captures: AtomicUsize,
    pub last_options: Mutex<Option<CaptureOptions>>,
    pub recording: Mutex<bool>,
    pub recordings: AtomicUsize,
}

impl MockCamera {
    pub fn new(behaviour: CameraBehaviour) -> Self {
        Self {
            behaviour,
            captures: AtomicUsize::new(0),
            last_options: Mutex::new(None),
            recording: Mutex::new(false),
            recordings: AtomicUsize::new(0),
        }
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDevice for MockCamera {
    async fn capture_still(&self, options: CaptureOptions) -> Result<Frame, CameraError> {
        let n = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_options.lock() = Some(options);
        match self.behaviour {
            CameraBehaviour::Frames => Ok(Frame {
                data: vec![0xFF, 0xD8, 0xFF, 0xD9],
                width: 640,
                height: 360,
                uri: format!("file:///captures/{n}.jpg"),
            }),
            CameraBehaviour::Empty => Ok(Frame {
                data: Vec::new(),
                width: 0,
                height: 0,
                uri: String::new(),
            }),
            CameraBehaviour::Broken => Err(CameraError::Unavailable("lens cap on".into())),
        }
    }

    async fn start_recording(&self, options: CaptureOptions) -> Result<(), CameraError> {
        if let CameraBehaviour::Broken = self.behaviour {
            return Err(CameraError::Unavailable("lens cap on".into()));
        }
        let mut recording = self.recording.lock();
        if *recording {
            return Err(CameraError::AlreadyRecording);
        }
        *recording = true;
        *self.last_options.lock() = Some(options);
        Ok(())
    }

    async fn stop_recording(&self) -> Result<Recording, CameraError> {
        let mut recording = self.recording.lock();
        if !*recording {
            return Err(CameraError::NotRecording);
        }
        *recording = false;
        self.recordings.fetch_add(1, Ordering::SeqCst);
        Ok(Recording {
            frames: Vec::new(),
            elapsed: Duration::ZERO,
        })
    }
}

/// Scripted answers, each after a delay. The last entry repeats.
pub struct MockPredictor {
    script: Mutex<VecDeque<(Duration, Result<String, u16>)>>,
    hold: Option<Notify>,
    pub requests: Mutex<Vec<PredictRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockPredictor {
    pub fn answering(label: &str) -> Self {
        Self::scripted(vec![(Duration::ZERO, Ok(label.to_string()))])
    }

    pub fn failing(status: u16) -> Self {
        Self::scripted(vec![(Duration::ZERO, Err(status))])
    }

    pub fn scripted(script: Vec<(Duration, Result<String, u16>)>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            hold: None,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every call waits for a `release` before answering.
    pub fn held(mut self) -> Self {
        self.hold = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(hold) = &self.hold {
            hold.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> (Duration, Result<String, u16>) {
        let mut script = self.script.lock();
        let step = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        step.unwrap_or((Duration::ZERO, Err(500)))
    }
}

#[async_trait]
impl Predictor for MockPredictor {
    async fn predict(&self, request: PredictRequest) -> Result<Prediction, PredictionError> {
        self.requests.lock().push(request);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (delay, answer) = self.next_step();
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer.map(Prediction).map_err(PredictionError::Status)
    }
}
