use crate::config::PredictionServiceConfig;
use crate::payload::{PredictRequest, Prediction};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Server error {0}")]
    Status(u16),
    #[error("Network request failed: {0}")]
    Transport(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Prediction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PredictionError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Status(_) => "status",
            PredictionError::Transport(_) => "transport",
            PredictionError::Decode(_) => "decode",
            PredictionError::Task(_) => "task",
        }
    }
}

#[async_trait]
pub trait Predictor: Send + Sync + 'static {
    async fn predict(&self, request: PredictRequest) -> Result<Prediction, PredictionError>;
}

/// Posts JSON bodies to the configured prediction endpoint.
///
/// Only connecting is bounded, by ureq's default 30 s connect timeout. Once
/// connected there is no read timeout, so a server that never answers keeps
/// the request outstanding.
#[derive(Clone)]
pub struct HttpPredictor {
    agent: ureq::Agent,
    url: String,
}

impl HttpPredictor {
    pub fn new(config: &PredictionServiceConfig) -> Self {
        Self::with_url(config.get_url())
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    #[instrument(skip(self, request), fields(url = %self.url))]
    async fn predict(&self, request: PredictRequest) -> Result<Prediction, PredictionError> {
        let agent = self.agent.clone();
        let url = self.url.clone();

        let body = tokio::task::spawn_blocking(move || post_json(&agent, &url, &request)).await??;

        Ok(Prediction::from_body(&body))
    }
}

fn post_json(
    agent: &ureq::Agent,
    url: &str,
    request: &PredictRequest,
) -> Result<Value, PredictionError> {
    let response = match agent
        .post(url)
        .set("Content-Type", "application/json")
        .send_json(request)
    {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => return Err(PredictionError::Status(code)),
        Err(ureq::Error::Transport(transport)) => {
            return Err(PredictionError::Transport(transport.to_string()))
        }
    };
    if !(200..300).contains(&response.status()) {
        return Err(PredictionError::Status(response.status()));
    }

    response
        .into_json::<Value>()
        .map_err(|e| PredictionError::Decode(e.to_string()))
}
