use crate::image_utils::{self, ImageUtilsError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{interval, Instant, MissedTickBehavior},
};

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),
    #[error("No frames available in {0}")]
    NoFrames(PathBuf),
    #[error("Failed to read frame: {0}")]
    ReadFrameFailed(#[from] io::Error),
    #[error("Failed to encode frame: {0}")]
    EncodeFrameFailed(#[from] ImageUtilsError),
    #[error("Capture task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("A recording is already running")]
    AlreadyRecording,
    #[error("No recording is running")]
    NotRecording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[default]
    Back,
    Front,
}

impl Facing {
    pub fn flipped(self) -> Self {
        match self {
            Facing::Back => Facing::Front,
            Facing::Front => Facing::Back,
        }
    }
}

/// Whether the shutter takes a still or starts and stops a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    #[default]
    Picture,
    Video,
}

impl CaptureMode {
    pub fn toggled(self) -> Self {
        match self {
            CaptureMode::Picture => CaptureMode::Video,
            CaptureMode::Video => CaptureMode::Picture,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Picture => "picture",
            CaptureMode::Video => "video",
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    /// JPEG quality, 1 (smallest) to 100 (best).
    pub quality: u8,
    pub facing: Facing,
}

impl CaptureOptions {
    pub fn new(quality: u8, facing: Facing) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            facing,
        }
    }
}

/// One captured still.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub uri: String,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Still frames grabbed while a recording was running.
#[derive(Debug, Clone)]
pub struct Recording {
    pub frames: Vec<Frame>,
    pub elapsed: Duration,
}

impl Recording {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[async_trait]
pub trait CaptureDevice: Send + Sync + 'static {
    async fn capture_still(&self, options: CaptureOptions) -> Result<Frame, CameraError>;

    /// Starts continuous recording. Fails if a recording is already running.
    async fn start_recording(&self, options: CaptureOptions) -> Result<(), CameraError>;

    async fn stop_recording(&self) -> Result<Recording, CameraError>;
}

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(100);

struct RecordingSession {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Recording>,
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Capture device backed by directories of still images.
///
/// Every capture takes the next image (in file name order, wrapping around)
/// from the directory of the requested facing and re-encodes it as JPEG at
/// the requested quality. A recording grabs one such capture per frame
/// interval until it is stopped.
pub struct DirectoryCamera {
    back: PathBuf,
    front: Option<PathBuf>,
    cursor: Arc<AtomicUsize>,
    frame_interval: Duration,
    recording: Mutex<Option<RecordingSession>>,
}

impl DirectoryCamera {
    pub fn new(back: impl Into<PathBuf>, front: Option<PathBuf>) -> Self {
        Self {
            back: back.into(),
            front,
            cursor: Arc::new(AtomicUsize::new(0)),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            recording: Mutex::new(None),
        }
    }

    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval.max(Duration::from_millis(1));
        self
    }

    pub fn is_recording(&self) -> bool {
        self.recording.lock().is_some()
    }

    fn directory_for(&self, facing: Facing) -> Result<PathBuf, CameraError> {
        match facing {
            Facing::Back => Ok(self.back.clone()),
            Facing::Front => self
                .front
                .clone()
                .ok_or_else(|| CameraError::Unavailable("no front camera configured".into())),
        }
    }
}

#[async_trait]
impl CaptureDevice for DirectoryCamera {
    async fn capture_still(&self, options: CaptureOptions) -> Result<Frame, CameraError> {
        let dir = self.directory_for(options.facing)?;
        grab_frame(dir, self.cursor.clone(), options.quality).await
    }

    async fn start_recording(&self, options: CaptureOptions) -> Result<(), CameraError> {
        let dir = self.directory_for(options.facing)?;
        let mut recording = self.recording.lock();
        if recording.is_some() {
            return Err(CameraError::AlreadyRecording);
        }

        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(record(
            dir,
            self.cursor.clone(),
            options.quality,
            self.frame_interval,
            stopped,
        ));
        *recording = Some(RecordingSession {
            stop: Some(stop),
            task,
        });
        tracing::info!("Recording started");

        Ok(())
    }

    async fn stop_recording(&self) -> Result<Recording, CameraError> {
        let session = self.recording.lock().take();
        let Some(mut session) = session else {
            return Err(CameraError::NotRecording);
        };
        if let Some(stop) = session.stop.take() {
            // Err means the task is already gone, which the join below reports
            let _ = stop.send(());
        }

        let recording = (&mut session.task).await?;
        tracing::info!(
            "Recording stopped after {:?} with {} frames",
            recording.elapsed,
            recording.len()
        );

        Ok(recording)
    }
}

async fn grab_frame(
    dir: PathBuf,
    cursor: Arc<AtomicUsize>,
    quality: u8,
) -> Result<Frame, CameraError> {
    tokio::task::spawn_blocking(move || -> Result<Frame, CameraError> {
        let sources = list_images(&dir)?;
        if sources.is_empty() {
            return Err(CameraError::NoFrames(dir));
        }
        let source = &sources[cursor.fetch_add(1, Ordering::Relaxed) % sources.len()];
        tracing::debug!("Capturing frame from {:?}", source);

        let bytes = fs::read(source)?;
        let encoded = image_utils::reencode_jpeg(&bytes, quality)?;
        Ok(Frame {
            data: encoded.data,
            width: encoded.width,
            height: encoded.height,
            uri: file_uri(source)?,
        })
    })
    .await?
}

async fn record(
    dir: PathBuf,
    cursor: Arc<AtomicUsize>,
    quality: u8,
    frame_interval: Duration,
    mut stopped: oneshot::Receiver<()>,
) -> Recording {
    let started = Instant::now();
    let mut ticks = interval(frame_interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames = Vec::new();

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = ticks.tick() => {
                match grab_frame(dir.clone(), cursor.clone(), quality).await {
                    Ok(frame) => frames.push(frame),
                    Err(e) => tracing::warn!("Dropping recorded frame: {}", e),
                }
            }
        }
    }

    Recording {
        frames,
        elapsed: started.elapsed(),
    }
}

pub fn list_images(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && image_utils::is_supported_image(path))
        .collect();
    images.sort();
    Ok(images)
}

fn file_uri(path: &Path) -> io::Result<String> {
    let absolute = fs::canonicalize(path)?;
    Ok(format!("file://{}", absolute.display()))
}
