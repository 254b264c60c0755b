use crate::error::*;
use crate::info::VideoInfo;
use crate::job::{JobEvent, JobKind, JobRequest};

use futures::stream::BoxStream;

/// The stream of updates a backend produces for one job.
///
/// An `Err` item ends the job with that error. The server forwards at most one terminal
/// event, so backends may keep producing after `complete` without affecting clients.
pub type JobStream = BoxStream<'static, Result<JobEvent, BackendError>>;

/// A trait for injecting the media work into the server.
///
/// Implementations wrap whatever tools actually fetch, extract and transcode. The server
/// only relies on the shape of what they return.
pub trait MediaBackend: Send + Sync + 'static + Clone {
    /// Looks up title, thumbnail and the available resolution labels for a source.
    fn video_info(&self, url: &str)
    -> impl Future<Output = Result<VideoInfo, BackendError>> + Send;

    /// Starts a job and returns its update stream.
    ///
    /// The stream is dropped when the client disconnects; implementations should stop
    /// their work when that happens.
    fn start_job(
        &self,
        kind: JobKind,
        request: JobRequest,
    ) -> impl Future<Output = Result<JobStream, BackendError>> + Send;

    /// Optional: checks that the wrapped tools are usable.
    fn init(&self) -> impl Future<Output = Result<(), BackendError>> + Send {
        async { Ok(()) }
    }
}

/// A backend that rejects every job.
#[derive(Clone, Debug, Default)]
pub struct NoMediaBackend;

impl MediaBackend for NoMediaBackend {
    async fn video_info(&self, _url: &str) -> Result<VideoInfo, BackendError> {
        Err(BackendError::Unsupported("metadata lookup".into()))
    }

    async fn start_job(&self, kind: JobKind, _: JobRequest) -> Result<JobStream, BackendError> {
        Err(BackendError::Unsupported(format!("{kind} jobs")))
    }
}
