//! Blocking on a predecessor's signal file.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::EntrypointError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[async_trait]
pub trait Waiter: Send + Sync {
    /// Return once `file` exists. An empty path returns immediately.
    async fn wait(&self, file: &Path) -> Result<(), EntrypointError>;
}

/// Polls the filesystem at a fixed interval, with no upper bound.
///
/// There is no cross-container notification mechanism to block on, so this
/// is a plain poll loop. Only the orchestrator can cut it short.
#[derive(Debug, Clone)]
pub struct FileWaiter {
    poll_interval: Duration,
}

impl FileWaiter {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for FileWaiter {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[async_trait]
impl Waiter for FileWaiter {
    async fn wait(&self, file: &Path) -> Result<(), EntrypointError> {
        if file.as_os_str().is_empty() {
            return Ok(());
        }
        debug!(file = %file.display(), "Waiting for signal file");

        loop {
            match tokio::fs::metadata(file).await {
                Ok(_) => {
                    debug!(file = %file.display(), "Signal file present");
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    trace!(file = %file.display(), "Not there yet");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(source) => {
                    return Err(EntrypointError::Wait {
                        path: file.to_path_buf(),
                        source,
                    })
                }
            }
        }
    }
}
