use crate::controller::{Controller, ControllerError, SingleShotController};
use crate::view::View;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip(controller))]
pub async fn take_picture(
    State(controller): State<Arc<SingleShotController>>,
) -> Result<Json<View>, ControllerError> {
    controller.take_picture().await?;
    Ok(Json(controller.view()))
}

pub async fn retake(State(controller): State<Arc<SingleShotController>>) -> Json<View> {
    controller.retake();
    Json(controller.view())
}

pub async fn toggle_facing(State(controller): State<Arc<SingleShotController>>) -> Json<View> {
    controller.toggle_facing();
    Json(controller.view())
}

pub async fn toggle_mode(
    State(controller): State<Arc<SingleShotController>>,
) -> Result<Json<View>, ControllerError> {
    controller.toggle_mode()?;
    Ok(Json(controller.view()))
}

#[instrument(skip(controller))]
pub async fn toggle_recording(
    State(controller): State<Arc<SingleShotController>>,
) -> Result<Json<View>, ControllerError> {
    controller.toggle_recording().await?;
    Ok(Json(controller.view()))
}
