//! # sotto-server
//!
//! Axum HTTP service exposing the transcription engine.
//!
//! - Index route group at the base path: service identity, health check
//! - Transcribe route group under the `/transcribe` prefix
//! - Engine held at process scope in shared state
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod logging;
pub mod routes;
pub mod server;
pub mod shutdown;
