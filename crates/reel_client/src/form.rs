//! The job parameters a user edits, and how they map onto requests.

use crate::settings::SettingsStore;
use reel_core::job::{JobKind, JobRequest};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A tracked input. The id doubles as the settings key and the request parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Url,
    FfmpegPath,
    ImageResolution,
    Interval,
    FastMode,
    VideoResolution,
    QualityPreset,
    Container,
    AudioMode,
    Bitrate,
    SaveToFolder,
    UserFolder,
    UseAria2c,
    ArchiveEnable,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::Url,
        Field::FfmpegPath,
        Field::ImageResolution,
        Field::Interval,
        Field::FastMode,
        Field::VideoResolution,
        Field::QualityPreset,
        Field::Container,
        Field::AudioMode,
        Field::Bitrate,
        Field::SaveToFolder,
        Field::UserFolder,
        Field::UseAria2c,
        Field::ArchiveEnable,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Field::Url => "url",
            Field::FfmpegPath => "ffmpeg_path",
            Field::ImageResolution => "image_res_label",
            Field::Interval => "interval",
            Field::FastMode => "mode_fast",
            Field::VideoResolution => "video_res_label",
            Field::QualityPreset => "quality_preset",
            Field::Container => "container_pref",
            Field::AudioMode => "audio_mode",
            Field::Bitrate => "bitrate_label",
            Field::SaveToFolder => "save_to_folder",
            Field::UserFolder => "user_folder",
            Field::UseAria2c => "use_aria2c",
            Field::ArchiveEnable => "archive_enable",
        }
    }

    /// Checkbox-style inputs, stored as `"true"` / `"false"`.
    pub fn is_flag(&self) -> bool {
        matches!(
            self,
            Field::FastMode | Field::SaveToFolder | Field::UseAria2c | Field::ArchiveEnable
        )
    }

    /// Whether the parameter is sent with jobs of `kind`. The URL is handled separately.
    pub fn applies_to(&self, kind: JobKind) -> bool {
        match self {
            Field::Url => false,
            Field::FfmpegPath
            | Field::SaveToFolder
            | Field::UserFolder
            | Field::UseAria2c
            | Field::ArchiveEnable => true,
            Field::ImageResolution | Field::Interval | Field::FastMode => {
                kind == JobKind::Screenshots
            }
            Field::QualityPreset | Field::Container => {
                matches!(kind, JobKind::Screenshots | JobKind::Video)
            }
            Field::VideoResolution => kind == JobKind::Video,
            Field::AudioMode | Field::Bitrate => kind == JobKind::Audio,
        }
    }

    fn default_value(&self) -> FieldValue {
        let text = match self {
            Field::Url | Field::FfmpegPath | Field::UserFolder => "",
            Field::ImageResolution => "Best available",
            Field::Interval => "10",
            Field::VideoResolution => "Best available (MP4)",
            Field::QualityPreset => "Balanced",
            Field::Container => "Auto (MKV)",
            Field::AudioMode => "Original (OPUS/WebM)",
            Field::Bitrate => "320 kbps",
            Field::FastMode | Field::SaveToFolder | Field::UseAria2c | Field::ArchiveEnable => {
                return FieldValue::Flag(false);
            }
        };
        FieldValue::text(text)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.id() == s)
            .ok_or_else(|| format!("unknown field '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Canonical string form, as written to settings.
    pub fn encode(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Flag(b) => b.to_string(),
        }
    }

    /// Reads a stored string back. Flags are set only by the exact string `"true"`.
    pub fn decode(field: Field, stored: &str) -> Self {
        if field.is_flag() {
            FieldValue::Flag(stored == "true")
        } else {
            FieldValue::Text(stored.to_string())
        }
    }
}

/// Current values of every tracked input.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    values: BTreeMap<Field, FieldValue>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            values: Field::ALL
                .into_iter()
                .map(|f| (f, f.default_value()))
                .collect(),
        }
    }
}

impl FormState {
    /// Defaults overlaid with whatever `settings` holds.
    pub fn restored(settings: &SettingsStore) -> Self {
        let mut form = Self::default();
        for field in Field::ALL {
            if let Some(stored) = settings.get(field.id()) {
                form.values.insert(field, FieldValue::decode(field, stored));
            }
        }
        form
    }

    /// Sets a value, coercing it to the field's shape.
    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values
            .insert(field, FieldValue::decode(field, &value.encode()));
    }

    pub fn get(&self, field: Field) -> &FieldValue {
        &self.values[&field]
    }

    pub fn text(&self, field: Field) -> String {
        self.get(field).encode()
    }

    pub fn flag(&self, field: Field) -> bool {
        matches!(self.get(field), FieldValue::Flag(true))
    }

    pub fn url(&self) -> String {
        self.text(Field::Url).trim().to_string()
    }

    /// Builds the request for a job of `kind` from the current values.
    pub fn request(&self, kind: JobKind) -> JobRequest {
        Field::ALL
            .into_iter()
            .filter(|field| field.applies_to(kind))
            .fold(JobRequest::new(self.url()), |req, field| {
                req.with(field.id(), self.param(field))
            })
    }

    fn param(&self, field: Field) -> Value {
        match (field, self.get(field)) {
            (Field::Interval, FieldValue::Text(s)) => {
                let interval = s.trim().parse::<f64>().unwrap_or(10.0);
                Value::from(interval)
            }
            (_, FieldValue::Flag(b)) => Value::Bool(*b),
            (_, FieldValue::Text(s)) => Value::String(s.clone()),
        }
    }
}
