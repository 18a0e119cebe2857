use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::types::types::PullError;

/// Durable, observer-scoped storage for the set of job ids the observer has
/// started. Survives observer restart (page reload, process restart) but is
/// never shared between observers, and is reconciled against the registry on
/// reattach rather than treated as authoritative.
#[async_trait]
pub trait ManifestStore: Send + Sync + 'static {
    /// Load the manifest. A store that was never written loads as the empty
    /// set.
    async fn load(&self) -> Result<BTreeSet<String>, PullError>;

    /// Persist the full manifest, replacing the previous contents.
    async fn store(&self, jobs: &BTreeSet<String>) -> Result<(), PullError>;
}

/// Manifest persisted as a JSON array in a single file.
pub struct FileManifestStore {
    path: PathBuf,
}

impl FileManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ManifestStore for FileManifestStore {
    async fn load(&self) -> Result<BTreeSet<String>, PullError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, jobs: &BTreeSet<String>) -> Result<(), PullError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(jobs)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

/// In-memory manifest for ephemeral observers and tests. Does not survive
/// restart.
#[derive(Default)]
pub struct MemoryManifestStore {
    jobs: Mutex<BTreeSet<String>>,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManifestStore for MemoryManifestStore {
    async fn load(&self) -> Result<BTreeSet<String>, PullError> {
        Ok(self.jobs.lock().await.clone())
    }

    async fn store(&self, jobs: &BTreeSet<String>) -> Result<(), PullError> {
        *self.jobs.lock().await = jobs.clone();
        Ok(())
    }
}
