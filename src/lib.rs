//! # Reel
//![![License](https://img.shields.io/badge/license-MIT%2FApache-blue.svg)](https://github.com/reel-rs/reel#license)
//!
//! A client and server boundary for long-running media jobs (screenshots, audio and
//! video extraction) that report their progress as newline-delimited JSON.
//!
//! This crate serves as an entry point, re-exporting the core types and
//! optionally including the server, client and mock backend via feature flags.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **`server`** | Includes the Axum-based server (`reel_server`). |
//! | **`client`** | Includes the streaming client and session state (`reel_client`). |
//! | **`mock`** | A scripted backend for development and tests (`reel_mock`). |
//!
//! ## Example: Mock Server
//!
//! ```toml
//! [dependencies]
//! reel = { version = "0.3", features = ["server", "mock"] }
//! ```
//!
//! ```rust,no_run
//! use reel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = ScriptedBackend::new().with_script(
//!         JobKind::Video,
//!         vec![JobEvent::completed("/api/download/x.mp4")],
//!     );
//!
//!     // Build
//!     let app = ReelServer::default().build(backend);
//!
//!     // Serve
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub use reel_core::*;

#[cfg(feature = "server")]
pub mod server {
    pub use reel_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use reel_client::*;
}

#[cfg(feature = "mock")]
pub mod mock {
    pub use reel_mock::*;
}

pub mod prelude {
    pub use reel_core::prelude::*;

    #[cfg(feature = "server")]
    pub use reel_server::{ReelServer, ReelServerConfig};

    #[cfg(feature = "client")]
    pub use reel_client::{ReelClient, ReelClientError, session::Session};

    #[cfg(feature = "mock")]
    pub use reel_mock::ScriptedBackend;
}
