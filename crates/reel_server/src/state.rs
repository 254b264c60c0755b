use reel_core::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState<B: MediaBackend> {
    pub backend: B,
    pub artifact_dir: Arc<PathBuf>,
}

impl<B: MediaBackend> AppState<B> {
    /// Resolves a download name inside the artifact directory.
    ///
    /// Only plain file names are accepted; anything that could walk out of the
    /// directory is rejected.
    pub fn artifact_path(&self, filename: &str) -> Result<PathBuf, BackendError> {
        let plain = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\', '\0'])
            && Path::new(filename).file_name().is_some_and(|n| n == filename);

        if !plain {
            return Err(BackendError::InvalidRequest(format!(
                "Invalid artifact name '{filename}'"
            )));
        }

        Ok(self.artifact_dir.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState<NoMediaBackend> {
        AppState {
            backend: NoMediaBackend,
            artifact_dir: Arc::new(PathBuf::from("/srv/artifacts")),
        }
    }

    #[test]
    fn accepts_plain_names() {
        let path = state().artifact_path("screenshots.zip").unwrap();
        assert_eq!(path, PathBuf::from("/srv/artifacts/screenshots.zip"));
    }

    #[test]
    fn rejects_traversal() {
        let state = state();
        for name in ["", ".", "..", "../etc/passwd", "a/b.mp4", "a\\b.mp4"] {
            assert!(
                matches!(
                    state.artifact_path(name),
                    Err(BackendError::InvalidRequest(_))
                ),
                "{name:?} should be rejected"
            );
        }
    }
}
