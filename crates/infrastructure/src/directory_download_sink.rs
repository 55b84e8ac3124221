use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kkvat_application::DownloadSink;
use kkvat_core::{AppError, AppResult};

const FALLBACK_FILE_NAME: &str = "report.csv";

/// Download sink writing files into one directory.
///
/// Bytes go to a hidden `.part` file first and are renamed into place, so a
/// failed write never leaves a truncated report under the final name.
pub struct DirectoryDownloadSink {
    directory: PathBuf,
}

impl DirectoryDownloadSink {
    /// Creates a sink writing into `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the target directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }
}

fn local_file_name(file_name: &str) -> String {
    let name = Path::new(file_name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if name.is_empty() || name.starts_with('.') {
        FALLBACK_FILE_NAME.to_owned()
    } else {
        name.to_owned()
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloadSink {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<PathBuf> {
        let io_error = |action: &str, path: &Path, error: std::io::Error| {
            AppError::Internal(format!("failed to {action} '{}': {error}", path.display()))
        };

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|error| io_error("create download directory", &self.directory, error))?;

        let name = local_file_name(file_name);
        let target = self.directory.join(&name);
        let partial = self.directory.join(format!(".{name}.part"));

        if let Err(error) = tokio::fs::write(&partial, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(io_error("write", &partial, error));
        }
        if let Err(error) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(io_error("move download into", &target, error));
        }

        tracing::debug!(path = %target.display(), bytes = bytes.len(), "download stored");
        Ok(target)
    }
}
