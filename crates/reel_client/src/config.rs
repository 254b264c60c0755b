//! Client configuration, resolved once at startup.
//!
//! The backend base URL is taken from the first of these that is set to a valid
//! `http(s)` URL:
//!
//! 1. the persisted `backend_url` setting,
//! 2. a value injected by the embedding program (e.g. a `--backend` flag),
//! 3. the `REEL_BACKEND_URL` environment variable,
//!
//! falling back to [`DEFAULT_BACKEND_URL`].

use crate::settings::SettingsStore;
use crate::{ReelClientError, Result};
use reel_core::prelude::{routes::*, *};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Settings key holding a persisted backend URL.
pub const BACKEND_URL_KEY: &str = "backend_url";

/// Environment variable consulted for the backend URL.
pub const BACKEND_URL_ENV: &str = "REEL_BACKEND_URL";

/// Where the backend URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Persisted,
    Injected,
    Environment,
    Default,
}

/// Raw candidate values for the backend URL, in no particular state of validity.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub persisted: Option<String>,
    pub injected: Option<String>,
    pub environment: Option<String>,
}

impl ConfigSources {
    /// Collects candidates from the settings store, the caller and the process environment.
    pub fn gather(settings: &SettingsStore, injected: Option<String>) -> Self {
        Self {
            persisted: settings.get(BACKEND_URL_KEY).map(str::to_string),
            injected,
            environment: std::env::var(BACKEND_URL_ENV).ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    backend_url: String,
    source: ConfigSource,
    /// Limit on establishing a connection.
    pub connect_timeout: Duration,
    /// Limit on the silence between two chunks of a job stream. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Pause after a URL change before its metadata is looked up.
    pub info_debounce: Duration,
    /// Period of the passive health check.
    pub health_interval: Duration,
}

impl ClientConfig {
    /// Invalid candidates are logged and skipped.
    pub fn resolve(sources: ConfigSources) -> Result<Self> {
        let ConfigSources {
            persisted,
            injected,
            environment,
        } = sources;

        let candidate = [
            (ConfigSource::Persisted, persisted),
            (ConfigSource::Injected, injected),
            (ConfigSource::Environment, environment),
        ]
        .into_iter()
        .filter_map(|(source, value)| value.filter(|v| !v.trim().is_empty()).map(|v| (source, v)))
        .find_map(|(source, raw)| match normalize_base(&raw) {
            Ok(url) => Some((source, url)),
            Err(e) => {
                warn!(?source, "Ignoring backend URL '{raw}': {e}");
                None
            }
        });

        let (source, backend_url) = match candidate {
            Some(found) => found,
            None => (ConfigSource::Default, normalize_base(DEFAULT_BACKEND_URL)?),
        };

        Ok(Self {
            backend_url,
            source,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Some(Duration::from_secs(300)),
            info_debounce: Duration::from_millis(400),
            health_interval: Duration::from_secs(30),
        })
    }

    /// A config pointing at `backend_url`, ignoring every other source.
    ///
    /// Unlike [`resolve`](Self::resolve), an invalid URL is an error here.
    pub fn for_backend(backend_url: &str) -> Result<Self> {
        normalize_base(backend_url)?;
        Self::resolve(ConfigSources {
            injected: Some(backend_url.to_string()),
            ..Default::default()
        })
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_info_debounce(mut self, debounce: Duration) -> Self {
        self.info_debounce = debounce;
        self
    }

    /// Base URL without a trailing slash.
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Turns a download reference from a completion event into a direct link on the
    /// backend's origin.
    ///
    /// * absolute `http(s)` URLs are used as-is,
    /// * paths are appended to the base URL,
    /// * bare file names go through the download endpoint.
    pub fn download_link(&self, reference: &str) -> String {
        let reference = reference.trim();
        if Url::parse(reference).is_ok_and(|u| matches!(u.scheme(), "http" | "https")) {
            return reference.to_string();
        }

        if reference.starts_with('/') {
            format!("{}{}", self.backend_url, reference)
        } else if reference.contains('/') {
            format!("{}/{}", self.backend_url, reference)
        } else {
            format!("{}{}/{}", self.backend_url, DOWNLOAD, reference)
        }
    }
}

fn normalize_base(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ReelClientError::Config(format!(
            "backend URL must use http or https, got '{raw}'"
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
