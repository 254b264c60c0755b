//! # Reel Mock
//!
//! A scripted media backend for development and testing.
//!
//! Jobs replay a fixed list of events per [`JobKind`] and metadata lookups answer from a
//! fixed table. Nothing is ever downloaded or transcoded.
//!
//! ## Usage
//!
//! ```rust
//! # use reel_mock::ScriptedBackend;
//! # use reel_core::prelude::*;
//! let backend = ScriptedBackend::new().with_script(
//!     JobKind::Video,
//!     vec![
//!         JobEvent::status("fetching"),
//!         JobEvent::completed("/api/download/x.mp4"),
//!     ],
//! );
//! ```

use futures::{StreamExt, stream};
use reel_core::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Default)]
pub struct ScriptedBackend {
    scripts: HashMap<JobKind, Vec<JobEvent>>,
    infos: HashMap<String, VideoInfo>,
    delay: Option<Duration>,
    started: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events replayed for every job of `kind`. Kinds without a script produce an
    /// empty stream, which the server reports as a job without a result.
    pub fn with_script(mut self, kind: JobKind, events: Vec<JobEvent>) -> Self {
        self.scripts.insert(kind, events);
        self
    }

    pub fn with_video_info(mut self, url: impl Into<String>, info: VideoInfo) -> Self {
        self.infos.insert(url.into(), info);
        self
    }

    /// Pause before each event, to simulate slow work.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of jobs started so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of job streams dropped before their script ran out.
    pub fn abandoned(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// Counts a stream as abandoned if it is dropped while events remain.
struct Replay {
    events: std::vec::IntoIter<JobEvent>,
    delay: Option<Duration>,
    dropped: Arc<AtomicUsize>,
}

impl Drop for Replay {
    fn drop(&mut self) {
        if self.events.len() > 0 {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl MediaBackend for ScriptedBackend {
    async fn video_info(&self, url: &str) -> Result<VideoInfo, BackendError> {
        self.infos
            .get(url)
            .cloned()
            .ok_or_else(|| BackendError::InvalidRequest(format!("Unknown video {url}")))
    }

    async fn start_job(&self, kind: JobKind, request: JobRequest) -> Result<JobStream, BackendError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        debug!(%kind, url = %request.url, "Replaying scripted job");

        let replay = Replay {
            events: self.scripts.get(&kind).cloned().unwrap_or_default().into_iter(),
            delay: self.delay,
            dropped: self.dropped.clone(),
        };

        let stream = stream::unfold(replay, |mut replay| async move {
            if let Some(delay) = replay.delay {
                tokio::time::sleep(delay).await;
            }
            let event = replay.events.next()?;
            Some((Ok(event), replay))
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_and_counts_starts() {
        let backend = ScriptedBackend::new().with_script(
            JobKind::Audio,
            vec![JobEvent::status("Downloading audio..."), JobEvent::completed("/api/download/a.mp3")],
        );

        let events: Vec<_> = backend
            .start_job(JobKind::Audio, JobRequest::new("x"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(backend.started(), 1);
        assert_eq!(backend.abandoned(), 0);
    }

    #[tokio::test]
    async fn counts_streams_dropped_early() {
        let backend = ScriptedBackend::new().with_script(
            JobKind::Video,
            vec![JobEvent::status("a"), JobEvent::status("b")],
        );

        let mut stream = backend
            .start_job(JobKind::Video, JobRequest::new("x"))
            .await
            .unwrap();
        stream.next().await;
        drop(stream);

        assert_eq!(backend.abandoned(), 1);
    }

    #[tokio::test]
    async fn unknown_video_is_invalid() {
        let err = ScriptedBackend::new().video_info("nope").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidRequest(_)));
    }
}
