//! Client credential stores
//!
//! The client-side counterpart of the server's cookie jar. Stores persist the
//! pair but enforce no expiry of their own.

use crate::{CoreError, CoreResult, CredentialPair};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current pair; an empty pair when nothing is stored
    async fn load(&self) -> CoreResult<CredentialPair>;

    /// Replace both tokens
    async fn save(&self, pair: &CredentialPair) -> CoreResult<()>;

    /// Remove both tokens. Clearing an empty store is not an error.
    async fn clear(&self) -> CoreResult<()>;
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    pair: RwLock<CredentialPair>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: RwLock::new(pair),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> CoreResult<CredentialPair> {
        Ok(self.pair.read().await.clone())
    }

    async fn save(&self, pair: &CredentialPair) -> CoreResult<()> {
        *self.pair.write().await = pair.clone();
        Ok(())
    }

    async fn clear(&self) -> CoreResult<()> {
        *self.pair.write().await = CredentialPair::default();
        Ok(())
    }
}

/// JSON file store surviving restarts
///
/// Writes go to a uniquely named, owner-only sibling temp file that is renamed
/// over the target, so a reader never observes a half-written pair and other
/// local users cannot read the tokens.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform data directory, e.g. `~/.local/share/portal/credentials.json`
    pub fn in_data_dir() -> CoreResult<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| CoreError::invalid_config("platform data directory not available"))?;
        Ok(Self::new(dir.join("portal").join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> CoreResult<CredentialPair> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialPair::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, pair: &CredentialPair) -> CoreResult<()> {
        let bytes = serde_json::to_vec_pretty(pair)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| CoreError::io_error(format!("credential write task failed: {e}")))?
    }

    async fn clear(&self) -> CoreResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| CoreError::from(e.error))?;
    Ok(())
}
