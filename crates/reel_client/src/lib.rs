//! # Reel Client
//!
//! An async client for a reel backend.
//!
//! [`ReelClient`] speaks the wire protocol: metadata lookups, job requests whose
//! progress arrives as newline-delimited JSON, health checks and artifact downloads.
//! [`Session`](session::Session) layers the front-end behaviour on top: one
//! [`JobBoard`](board::JobBoard) entry per job kind, cancellation, debounced metadata
//! lookups and settings that survive restarts.
//!
//! ## Example: Running a Job
//!
//! ```no_run
//! use reel_client::prelude::*;
//! use reel_core::prelude::*;
//!
//! async fn run() -> reel_client::Result<()> {
//!     let settings = SettingsStore::in_memory();
//!     let config = ClientConfig::resolve(ConfigSources::gather(&settings, None))?;
//!     let session = Session::new(config, settings)?;
//!
//!     session.set_field(Field::Url, FieldValue::text("https://youtu.be/abc")).await;
//!     match session.submit(JobKind::Video).await? {
//!         JobOutcome::Succeeded { download_link } => println!("{download_link:?}"),
//!         JobOutcome::Failed(reason) => eprintln!("{reason}"),
//!         JobOutcome::Cancelled => {}
//!     }
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod config;
pub mod decoder;
pub mod form;
pub mod session;
pub mod settings;
pub mod stream;

use config::ClientConfig;
use futures_util::StreamExt;
use reel_core::prelude::{routes::*, *};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use stream::JobEventStream;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ReelClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned error {0}: {1}")]
    ServerError(StatusCode, String),

    /// Rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// An error reported by the backend itself, shown as-is.
    #[error("{0}")]
    Backend(String),

    #[error("A {0} job is already running")]
    Busy(JobKind),

    #[error("No data from the backend for {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, ReelClientError>;

/// Shown when a job is submitted without a URL.
pub const MISSING_URL: &str = "Please enter a video URL";

#[derive(Clone)]
pub struct ReelClient {
    config: ClientConfig,
    client: Client,
}

impl ReelClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        self.config.backend_url()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ReelClientError::ServerError(status, text));
        }
        Ok(response)
    }

    /// Liveness check: any 2xx answer counts, whatever the body.
    pub async fn ping(&self) -> Result<()> {
        let response = self.client.get(self.url(HEALTH)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.client.get(self.url(HEALTH)).send().await?;
        let response = Self::check(response).await?;

        let data: HealthResponse = response
            .json()
            .await
            .map_err(|e| ReelClientError::Backend(format!("Failed to parse health response: {e}")))?;

        Ok(data)
    }

    /// Looks up title, thumbnail and resolution labels for `url`.
    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        let req = VideoInfoRequest {
            url: url.to_string(),
        };
        let response = self
            .client
            .post(self.url(VIDEO_INFO))
            .json(&req)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let data: VideoInfoResponse = response
            .json()
            .await
            .map_err(|e| ReelClientError::Backend(format!("Failed to parse video info: {e}")))?;

        data.into_result().map_err(ReelClientError::Backend)
    }

    /// Starts a job and returns its event stream once the response headers arrive.
    ///
    /// Non-success statuses fail here; nothing of their body is read as events.
    pub async fn start_job(&self, kind: JobKind, request: &JobRequest) -> Result<JobEventStream> {
        if !request.has_url() {
            return Err(ReelClientError::Validation(MISSING_URL.to_string()));
        }

        debug!(%kind, url = %request.url, "Posting job");
        let response = self
            .client
            .post(self.url(kind.route()))
            .json(request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        Ok(JobEventStream::new(
            response.bytes_stream().boxed(),
            self.config.idle_timeout,
        ))
    }

    /// Direct link for a download reference, see [`ClientConfig::download_link`].
    pub fn download_link(&self, reference: &str) -> String {
        self.config.download_link(reference)
    }

    /// Streams an artifact to `dest`, returning the number of bytes written.
    pub async fn download_to(&self, reference: &str, dest: &Path) -> Result<u64> {
        let link = self.download_link(reference);
        let response = self.client.get(&link).send().await?;
        let response = Self::check(response).await?;

        let mut file = File::create(dest).await?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("Downloaded {written} bytes from {link}");
        Ok(written)
    }
}

/// The file name a download reference points at, if it has one.
pub fn artifact_name(reference: &str) -> Option<&str> {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

pub mod prelude {
    pub use crate::board::*;
    pub use crate::config::*;
    pub use crate::form::*;
    pub use crate::session::*;
    pub use crate::settings::*;
    pub use crate::stream::JobEventStream;
    pub use crate::{ReelClient, ReelClientError};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names() {
        assert_eq!(artifact_name("/api/download/x.mp4"), Some("x.mp4"));
        assert_eq!(artifact_name("https://host/api/download/a.zip?x=1"), Some("a.zip"));
        assert_eq!(artifact_name("plain.mp3"), Some("plain.mp3"));
        assert_eq!(artifact_name("/api/download/"), None);
    }
}
