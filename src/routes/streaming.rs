use crate::controller::{Controller, ControllerError, StreamingController};
use crate::view::View;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip(controller))]
pub async fn pause(State(controller): State<Arc<StreamingController>>) -> Json<View> {
    controller.pause();
    Json(controller.view())
}

#[instrument(skip(controller))]
pub async fn resume(
    State(controller): State<Arc<StreamingController>>,
) -> Result<Json<View>, ControllerError> {
    controller.resume()?;
    Ok(Json(controller.view()))
}

#[instrument(skip(controller))]
pub async fn toggle(
    State(controller): State<Arc<StreamingController>>,
) -> Result<Json<View>, ControllerError> {
    controller.toggle()?;
    Ok(Json(controller.view()))
}

pub async fn set_note(
    State(controller): State<Arc<StreamingController>>,
    note: String,
) -> Json<View> {
    controller.set_note(note);
    Json(controller.view())
}
