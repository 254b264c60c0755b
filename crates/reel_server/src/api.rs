use crate::framing::{encode_line, error_message, frame, single_failure};
use crate::prelude::*;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::{Stream, StreamExt};
use reel_core::prelude::*;
use tokio_util::io::ReaderStream;
use tracing::{error, info};
use uuid::Uuid;

pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<BackendError>() {
            return match err {
                BackendError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                BackendError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                BackendError::Unsupported(_) => (StatusCode::NOT_IMPLEMENTED, err.to_string()),
                BackendError::System(_) => {
                    error!("Internal Server BackendError: {:?}", self.0);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Backend Error".to_string(),
                    )
                }
            }
            .into_response();
        }

        error!("Internal Server Error: {:?}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
            .into_response()
    }
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// POST /api/video-info
///
/// Failures are reported in the body with `success: false`, never as an HTTP error.
pub async fn video_info<B: MediaBackend>(
    State(state): State<AppState<B>>,
    Json(req): Json<VideoInfoRequest>,
) -> Json<VideoInfoResponse> {
    let url = req.url.trim();
    if url.is_empty() {
        return Json(VideoInfoResponse::failure("Please provide a valid URL"));
    }

    match state.backend.video_info(url).await {
        Ok(info) => Json(info.into()),
        Err(e) => {
            info!("Metadata lookup for {url} failed: {e}");
            Json(VideoInfoResponse::failure(error_message(e)))
        }
    }
}

/// POST /api/screenshots
pub async fn screenshots<B: MediaBackend>(
    state: State<AppState<B>>,
    req: Json<JobRequest>,
) -> Response {
    run_job(state, JobKind::Screenshots, req).await
}

/// POST /api/audio
pub async fn audio<B: MediaBackend>(state: State<AppState<B>>, req: Json<JobRequest>) -> Response {
    run_job(state, JobKind::Audio, req).await
}

/// POST /api/video
pub async fn video<B: MediaBackend>(state: State<AppState<B>>, req: Json<JobRequest>) -> Response {
    run_job(state, JobKind::Video, req).await
}

/// Starts a job and streams its events. Rejections are streamed as a single `error`
/// event so clients only ever deal with one response shape.
async fn run_job<B: MediaBackend>(
    State(state): State<AppState<B>>,
    kind: JobKind,
    Json(req): Json<JobRequest>,
) -> Response {
    if !req.has_url() {
        return ndjson(single_failure("Please provide a valid URL".to_string()));
    }

    let id = Uuid::new_v4();
    info!(job = %id, %kind, url = %req.url, "Starting job");

    match state.backend.start_job(kind, req).await {
        Ok(stream) => ndjson(frame(id, stream)),
        Err(e) => {
            error!(job = %id, "Failed to start {kind} job: {e}");
            ndjson(single_failure(error_message(e)))
        }
    }
}

fn ndjson(events: impl Stream<Item = JobEvent> + Send + 'static) -> Response {
    let body = Body::from_stream(events.map(|event| encode_line(&event)));
    ([(header::CONTENT_TYPE, NDJSON)], body).into_response()
}

/// GET /api/download/{filename}
pub async fn download<B: MediaBackend>(
    State(state): State<AppState<B>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.artifact_path(&filename)?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::from(BackendError::NotFound(filename)));
        }
        Err(e) => return Err(ApiError::from(e)),
    };

    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(ApiError::from(BackendError::NotFound(filename)));
    }

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (header::CONTENT_LENGTH, metadata.len().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}
