use serde::{Deserialize, Serialize};

/// Body of a metadata lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfoRequest {
    pub url: String,
}

/// Metadata about a source, used to populate the selection controls before a job starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    /// Labels such as `"1080p (Full HD)"`, in the order the backend prefers them.
    pub video_resolutions: Vec<String>,
    pub image_resolutions: Vec<String>,
}

/// Wire shape of `POST /api/video-info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub video_resolutions: Vec<String>,
    #[serde(default)]
    pub image_resolutions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoInfoResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Converts a wire response into [`VideoInfo`], or the backend's error message.
    pub fn into_result(self) -> Result<VideoInfo, String> {
        if !self.success {
            return Err(self
                .error
                .unwrap_or_else(|| "Metadata lookup failed".to_string()));
        }

        Ok(VideoInfo {
            title: self.title.filter(|t| !t.is_empty()),
            thumbnail: self.thumbnail.filter(|t| !t.is_empty()),
            video_resolutions: self.video_resolutions,
            image_resolutions: self.image_resolutions,
        })
    }
}

impl From<VideoInfo> for VideoInfoResponse {
    fn from(info: VideoInfo) -> Self {
        Self {
            success: true,
            title: info.title,
            thumbnail: info.thumbnail,
            video_resolutions: info.video_resolutions,
            image_resolutions: info.image_resolutions,
            error: None,
        }
    }
}

/// Wire shape of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// RFC3339 timestamp string, e.g., "2026-01-01T01:00:00Z".
    pub timestamp: String,
}
