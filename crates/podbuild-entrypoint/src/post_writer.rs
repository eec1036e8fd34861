use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::EntrypointError;

#[async_trait]
pub trait PostWriter: Send + Sync {
    /// Create `file` to signal completion. An empty path is a no-op.
    async fn write(&self, file: &Path) -> Result<(), EntrypointError>;
}

/// Creates an empty file. The parent directory must already exist.
#[derive(Debug, Clone, Default)]
pub struct FilePostWriter;

#[async_trait]
impl PostWriter for FilePostWriter {
    async fn write(&self, file: &Path) -> Result<(), EntrypointError> {
        if file.as_os_str().is_empty() {
            return Ok(());
        }
        tokio::fs::File::create(file)
            .await
            .map_err(|source| EntrypointError::Write {
                path: file.to_path_buf(),
                source,
            })?;
        debug!(file = %file.display(), "Posted signal file");
        Ok(())
    }
}
