use crate::camera::{CaptureDevice, DirectoryCamera};
use crate::capture::StreamingCycle;
use crate::config::{Config, Mode};
use crate::controller::{Controller, SingleShotController, StreamingController};
use crate::permission::{DirectoryAccess, PermissionGate};
use crate::prediction::{HttpPredictor, Predictor};
use crate::routes::{api_routes, single_shot_routes, streaming_routes};
use crate::scheduler::Scheduler;
use crate::server::HttpServer;
use crate::telemetry::Metrics;

use axum::Router;
use std::{error::Error, sync::Arc, time::Duration};
use tokio::{signal, sync::broadcast};

/// Builds the controller for the configured variant and the routes it serves.
pub fn build_client(
    config: &Config,
    camera: Arc<dyn CaptureDevice>,
    predictor: Arc<dyn Predictor>,
    metrics: Arc<Metrics>,
) -> (Arc<dyn Controller>, Router) {
    let gate = PermissionGate::new(Arc::new(DirectoryAccess::new(&config.camera.directory)));

    match config.mode {
        Mode::Streaming => {
            let cycle = Arc::new(StreamingCycle::new(
                camera,
                predictor,
                metrics,
                config.streaming.quality,
                config.streaming.note.clone(),
            ));
            let scheduler = Scheduler::new(Duration::from_millis(config.streaming.interval_ms));
            let controller = Arc::new(StreamingController::new(gate, cycle, scheduler));
            let router = streaming_routes(controller.clone());
            (controller as Arc<dyn Controller>, router)
        }
        Mode::SingleShot => {
            let controller = Arc::new(SingleShotController::new(
                gate,
                camera,
                predictor,
                metrics,
                config.camera.quality,
            ));
            let router = single_shot_routes(controller.clone());
            (controller as Arc<dyn Controller>, router)
        }
    }
}

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let metrics = match Metrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            tracing::error!("Failed to initialize metrics: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let camera: Arc<dyn CaptureDevice> = Arc::new(
        DirectoryCamera::new(
            &config.camera.directory,
            config.camera.front_directory.clone(),
        )
        .with_frame_interval(Duration::from_millis(config.camera.recording_interval_ms)),
    );
    let predictor = HttpPredictor::new(&config.prediction_service);
    tracing::info!(
        "Running in {} mode against {}",
        config.mode.as_str(),
        predictor.url()
    );

    let (controller, client_routes) =
        build_client(&config, camera, Arc::new(predictor), metrics.clone());
    let router = api_routes(metrics).merge(client_routes);

    let server = HttpServer::new(router, &config.server).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_handle = server.run(shutdown_tx.subscribe())?;

    controller.initialize().await;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    controller.shutdown();
    let _ = shutdown_tx.send(());
    match server_handle.await {
        Ok(Err(e)) => tracing::error!("Control surface failed: {:?}", e),
        Err(e) => tracing::error!("Control surface task panicked: {:?}", e),
        Ok(Ok(())) => {}
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
