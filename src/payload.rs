use crate::camera::Frame;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::Value;

/// JSON body posted to the prediction endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum PredictRequest {
    /// Single-shot pictures are referenced by URI.
    Uri { image: String },
    /// Streamed frames carry the JPEG inline, without a data URI prefix.
    Encoded {
        image_base64: String,
        width: u32,
        height: u32,
        note: String,
    },
}

impl PredictRequest {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        PredictRequest::Uri { image: uri.into() }
    }

    pub fn from_frame(frame: &Frame, note: impl Into<String>) -> Self {
        PredictRequest::Encoded {
            image_base64: STANDARD.encode(&frame.data),
            width: frame.width,
            height: frame.height,
            note: note.into(),
        }
    }
}

/// Label extracted from a prediction response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction(pub String);

impl Prediction {
    /// Uses the `prediction` field when it is a string, otherwise the whole
    /// body serialized back to JSON.
    pub fn from_body(body: &Value) -> Self {
        match body.get("prediction") {
            Some(Value::String(label)) => Prediction(label.clone()),
            _ => Prediction(body.to_string()),
        }
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
