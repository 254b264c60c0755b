//! Exactly-once terminal framing for job streams.

use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use reel_core::prelude::*;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use uuid::Uuid;

struct Framed {
    span: Span,
    inner: JobStream,
    finished: bool,
}

impl Drop for Framed {
    fn drop(&mut self) {
        if !self.finished {
            // The response body was dropped mid-job, dropping the backend stream with it.
            let _enter = self.span.enter();
            info!("Client went away, abandoning job");
        }
    }
}

/// Wraps a backend stream so that it ends with exactly one terminal event.
///
/// * The first event carrying `error` or `complete` is forwarded and ends the stream.
/// * An `Err` item becomes an `error` event.
/// * A stream that runs dry becomes an [`UNTERMINATED_JOB`] error.
/// * Events with no fields are dropped.
pub fn frame(id: Uuid, inner: JobStream) -> impl Stream<Item = JobEvent> + Send + 'static {
    let state = Framed {
        span: info_span!("job", %id),
        inner,
        finished: false,
    };

    stream::unfold(Some(state), |state| {
        let span = state.as_ref().map_or_else(Span::none, |s| s.span.clone());
        next_framed(state).instrument(span)
    })
}

async fn next_framed(state: Option<Framed>) -> Option<(JobEvent, Option<Framed>)> {
    let mut state = state?;
    let event = loop {
        match state.inner.next().await {
            Some(Ok(event)) if event.is_empty() => continue,
            Some(Ok(event)) => break event,
            Some(Err(e)) => {
                warn!("Job failed: {e}");
                break JobEvent::failed(error_message(e));
            }
            None => {
                warn!("Backend stream ended without a terminal event");
                break JobEvent::failed(UNTERMINATED_JOB);
            }
        }
    };

    if event.is_terminal() {
        debug!(complete = event.is_complete(), "Job finished");
        state.finished = true;
        return Some((event, None));
    }

    Some((event, Some(state)))
}

/// A stream that reports one failure and ends.
pub fn single_failure(message: String) -> impl Stream<Item = JobEvent> + Send + 'static {
    stream::once(futures::future::ready(JobEvent::failed(message)))
}

/// Encodes one event as an NDJSON line.
pub fn encode_line(event: &JobEvent) -> Result<Bytes, serde_json::Error> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Application errors are shown to users verbatim, so strip the variant prefix where
/// the backend already wrote a readable message.
pub(crate) fn error_message(e: BackendError) -> String {
    match e {
        BackendError::InvalidRequest(msg) | BackendError::System(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(events: Vec<Result<JobEvent, BackendError>>) -> Vec<JobEvent> {
        frame(Uuid::new_v4(), stream::iter(events).boxed())
            .collect()
            .await
    }

    #[tokio::test]
    async fn drops_events_after_the_first_terminal() {
        let out = collect(vec![
            Ok(JobEvent::status("Downloading video...")),
            Ok(JobEvent::completed("/api/download/x.mp4")),
            Ok(JobEvent::status("Files ready for download.")),
            Ok(JobEvent::failed("late")),
        ])
        .await;

        assert_eq!(out.len(), 2);
        assert!(out[1].is_complete());
    }

    #[tokio::test]
    async fn backend_error_becomes_terminal_error() {
        let out = collect(vec![
            Ok(JobEvent::progress(30.0, "Downloading audio...")),
            Err(BackendError::System("ffmpeg exited with status 1".into())),
            Ok(JobEvent::completed("/api/download/never.mp3")),
        ])
        .await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].error.as_deref(), Some("ffmpeg exited with status 1"));
    }

    #[tokio::test]
    async fn unterminated_stream_gets_a_generic_failure() {
        let out = collect(vec![Ok(JobEvent::status("fetching"))]).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].error.as_deref(), Some(UNTERMINATED_JOB));

        let empty = collect(vec![]).await;
        assert_eq!(empty, vec![JobEvent::failed(UNTERMINATED_JOB)]);
    }

    #[tokio::test]
    async fn empty_events_are_skipped() {
        let out = collect(vec![
            Ok(JobEvent::default()),
            Ok(JobEvent::completed("/api/download/x.mp4")),
        ])
        .await;

        assert_eq!(out.len(), 1);
    }

    #[test]
    fn lines_end_with_newline() {
        let line = encode_line(&JobEvent::status("fetching")).unwrap();
        assert_eq!(&line[..], b"{\"status\":\"fetching\"}\n");
    }
}
