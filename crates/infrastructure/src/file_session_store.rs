use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kkvat_application::{PersistedSession, SessionStore};
use kkvat_core::{AppError, AppResult};

/// Session store persisting `{accessToken, menus, user}` to a JSON file.
///
/// A missing or unreadable file loads as an empty session so a corrupt file
/// never blocks the next login.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> AppResult<PersistedSession> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(PersistedSession::default());
            }
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read session file '{}': {error}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_slice(&contents) {
            Ok(session) => Ok(session),
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %error,
                    "ignoring unreadable session file"
                );
                Ok(PersistedSession::default())
            }
        }
    }

    async fn save(&self, session: &PersistedSession) -> AppResult<()> {
        let contents = serde_json::to_vec_pretty(session)
            .map_err(|error| AppError::Internal(format!("failed to encode session: {error}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to create session directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        tokio::fs::write(&self.path, contents).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write session file '{}': {error}",
                self.path.display()
            ))
        })
    }

    async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Internal(format!(
                "failed to remove session file '{}': {error}",
                self.path.display()
            ))),
        }
    }
}
