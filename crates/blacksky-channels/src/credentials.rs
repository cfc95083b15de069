//! Directory-backed credential store.

use async_trait::async_trait;
use blacksky_core::{error::BlackskyError, traits::CredentialStore};
use std::path::{Path, PathBuf};
use tracing::info;

/// Credentials kept as files under one session directory.
///
/// Clearing removes the whole directory, so the next connect pairs from scratch.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The conventional session directory under a data dir.
    pub fn whatsapp_session(data_dir: &Path) -> Self {
        Self::new(data_dir.join("whatsapp_session"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    fn location(&self) -> String {
        self.dir.display().to_string()
    }

    async fn exists(&self) -> bool {
        match tokio::fs::read_dir(&self.dir).await {
            Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
            Err(_) => false,
        }
    }

    async fn clear(&self) -> Result<(), BlackskyError> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!("credentials: cleared {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlackskyError::Credentials(format!(
                "failed to clear {}: {e}",
                self.dir.display()
            ))),
        }
    }
}
