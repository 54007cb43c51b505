mod routes;
mod server;

pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod controller;
pub mod image_utils;
pub mod payload;
pub mod permission;
pub mod prediction;
pub mod scheduler;
pub mod telemetry;
pub mod view;

#[cfg(test)]
mod test_utils;

pub use app::{build_client, start_app};
