mod health;
mod metrics;
mod single_shot;
mod streaming;

use crate::controller::{Controller, ControllerError, SingleShotController, StreamingController};
use crate::telemetry::Metrics;
use crate::view::View;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub fn api_routes(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(metrics)
}

pub fn streaming_routes(controller: Arc<StreamingController>) -> Router {
    Router::new()
        .route("/view", get(current_view::<StreamingController>))
        .route("/permission", post(request_permission::<StreamingController>))
        .route("/stream/pause", post(streaming::pause))
        .route("/stream/resume", post(streaming::resume))
        .route("/stream/toggle", post(streaming::toggle))
        .route("/note", put(streaming::set_note))
        .with_state(controller)
}

pub fn single_shot_routes(controller: Arc<SingleShotController>) -> Router {
    Router::new()
        .route("/view", get(current_view::<SingleShotController>))
        .route("/permission", post(request_permission::<SingleShotController>))
        .route(
            "/picture",
            post(single_shot::take_picture).delete(single_shot::retake),
        )
        .route("/facing", post(single_shot::toggle_facing))
        .route("/mode", post(single_shot::toggle_mode))
        .route("/recording", post(single_shot::toggle_recording))
        .with_state(controller)
}

async fn current_view<C: Controller>(State(controller): State<Arc<C>>) -> Json<View> {
    Json(controller.view())
}

async fn request_permission<C: Controller>(State(controller): State<Arc<C>>) -> Json<View> {
    Json(controller.request_permission().await)
}

impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        let status = match self {
            ControllerError::PermissionNotGranted => StatusCode::FORBIDDEN,
            ControllerError::Capture(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ControllerError::WrongMode(_) | ControllerError::RecordingInProgress => {
                StatusCode::CONFLICT
            }
        };
        (status, self.to_string()).into_response()
    }
}
