use crate::constants::routes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The kinds of long-running jobs a backend accepts. Each kind has its own endpoint
/// and its own independent client-side state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Screenshots,
    Audio,
    Video,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Screenshots, JobKind::Audio, JobKind::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Screenshots => "screenshots",
            JobKind::Audio => "audio",
            JobKind::Video => "video",
        }
    }

    /// The endpoint that starts a job of this kind.
    pub fn route(&self) -> &'static str {
        match self {
            JobKind::Screenshots => routes::JOB_SCREENSHOTS,
            JobKind::Audio => routes::JOB_AUDIO,
            JobKind::Video => routes::JOB_VIDEO,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown job kind '{s}'"))
    }
}

/// A request to start a job on the backend.
///
/// Only [`url`](Self::url) is interpreted by this layer. Every other parameter is
/// passed through to the backend untouched, flattened next to `url` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl JobRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Map::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// `true` if the URL is present and not just whitespace.
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// One line of a job's progress stream.
///
/// All fields are optional. A stream is terminated by the first event carrying
/// [`error`](Self::error) or a `complete` flag of `true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Percentage in `0..=100`. Not guaranteed to be monotonic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    /// Reference to the produced artifact, usually `/api/download/{filename}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Screenshot references produced so far.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_file: Option<String>,
}

impl JobEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            status: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn progress(percent: f64, message: impl Into<String>) -> Self {
        Self {
            progress: Some(percent),
            status: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn completed(download_url: impl Into<String>) -> Self {
        Self {
            progress: Some(100.0),
            complete: Some(true),
            download_url: Some(download_url.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.complete == Some(true)
    }

    /// `true` for the event that ends a stream.
    pub fn is_terminal(&self) -> bool {
        self.is_error() || self.is_complete()
    }

    /// `true` if the event carries no field at all.
    pub fn is_empty(&self) -> bool {
        *self == JobEvent::default()
    }

    /// The source a media player should load, if this event produced one.
    pub fn media_source(&self) -> Option<&str> {
        self.video_file.as_deref().or(self.audio_file.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_flattens_params_next_to_url() {
        let req = JobRequest::new("https://youtu.be/abc")
            .with("interval", 10.0)
            .with("mode_fast", false);

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({ "url": "https://youtu.be/abc", "interval": 10.0, "mode_fast": false })
        );

        let back: JobRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back.param("interval"), Some(&json!(10.0)));
    }

    #[test]
    fn blank_url_is_not_a_url() {
        assert!(!JobRequest::new("   ").has_url());
        assert!(!JobRequest::default().has_url());
        assert!(JobRequest::new("x").has_url());
    }

    #[test]
    fn terminal_detection() {
        let done: JobEvent =
            serde_json::from_str(r#"{"progress":100,"complete":true,"download_url":"/api/download/x.mp4"}"#)
                .unwrap();
        assert!(done.is_complete());
        assert!(done.is_terminal());

        let not_done: JobEvent = serde_json::from_str(r#"{"complete":false}"#).unwrap();
        assert!(!not_done.is_terminal());

        assert!(JobEvent::failed("boom").is_terminal());
        assert!(!JobEvent::status("fetching").is_terminal());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let event: JobEvent = serde_json::from_str(r#"{"status":"ok","eta":12}"#).unwrap();
        assert_eq!(event.status.as_deref(), Some("ok"));
    }

    #[test]
    fn empty_event_serializes_to_empty_object() {
        assert_eq!(serde_json::to_string(&JobEvent::default()).unwrap(), "{}");
        assert!(JobEvent::default().is_empty());
    }

    #[test]
    fn job_kind_parses_and_routes() {
        assert_eq!("audio".parse::<JobKind>().unwrap(), JobKind::Audio);
        assert!("gif".parse::<JobKind>().is_err());
        assert_eq!(JobKind::Video.route(), "/api/video");
    }
}
