//! # Reel Server
//!
//! An Axum-based boundary in front of a [`MediaBackend`].
//!
//! Provides the [`ReelServer`] builder, which exposes a backend over HTTP:
//!
//! * `GET  /api/health`: liveness.
//! * `POST /api/video-info`: metadata lookup.
//! * `POST /api/{screenshots,audio,video}`: starts a job and streams its events as
//!   newline-delimited JSON. Every stream ends with exactly one event carrying either
//!   `error` or `complete`.
//! * `GET  /api/download/{filename}`: artifacts from the configured directory.
//!
//! ## Example
//!
//! ```no_run
//! use reel_server::prelude::*;
//! use reel_core::traits::NoMediaBackend;
//!
//! # async fn run() {
//! let app = ReelServer::default().build(NoMediaBackend);
//! # }
//! ```

mod api;

pub mod framing;
pub mod state;

use reel_core::prelude::{routes::*, *};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// The builder for the Reel Server.
#[derive(Clone, Debug, Default)]
pub struct ReelServer {
    config: ReelServerConfig,
}

impl ReelServer {
    pub fn new(config: ReelServerConfig) -> Self {
        Self { config }
    }
}

#[derive(Clone, Debug)]
pub struct ReelServerConfig {
    /// Directory that `GET /api/download/{filename}` serves from.
    ///
    /// Defaults to the system temp directory.
    pub artifact_dir: PathBuf,
    /// Allow cross-origin requests from any origin.
    ///
    /// Defaults to `true`, since browser front ends are usually hosted elsewhere.
    pub cors: bool,
}

impl Default for ReelServerConfig {
    fn default() -> Self {
        Self {
            artifact_dir: std::env::temp_dir(),
            cors: true,
        }
    }
}

impl ReelServer {
    pub fn build<B: MediaBackend>(self, backend: B) -> Router {
        let ReelServerConfig { artifact_dir, cors } = self.config;
        let state = AppState {
            backend,
            artifact_dir: Arc::new(artifact_dir),
        };

        let router = Router::new()
            .route(HEALTH, get(api::health))
            .route(VIDEO_INFO, post(api::video_info::<B>))
            .route(JOB_SCREENSHOTS, post(api::screenshots::<B>))
            .route(JOB_AUDIO, post(api::audio::<B>))
            .route(JOB_VIDEO, post(api::video::<B>))
            .route(DOWNLOAD_BY_NAME, get(api::download::<B>))
            .layer(DefaultBodyLimit::max(64 * 1024))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        if cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }
}

pub mod prelude {
    pub use crate::framing::*;
    pub use crate::state::*;
    pub use crate::{ReelServer, ReelServerConfig};
}
