pub mod routes {
    pub const HEALTH: &str = "/api/health";
    pub const VIDEO_INFO: &str = "/api/video-info";

    pub const JOB_SCREENSHOTS: &str = "/api/screenshots";
    pub const JOB_AUDIO: &str = "/api/audio";
    pub const JOB_VIDEO: &str = "/api/video";

    pub const DOWNLOAD: &str = "/api/download";
    pub const DOWNLOAD_BY_NAME: &str = "/api/download/{filename}";
}

/// Content type of a job progress stream.
pub const NDJSON: &str = "application/x-ndjson";

/// Base URL used when no other source provides one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Error reported when a job stream ends with neither `error` nor `complete`.
pub const UNTERMINATED_JOB: &str = "Job ended without a result";
