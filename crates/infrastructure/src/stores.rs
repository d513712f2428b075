//! File-backed persistence for the hub connection

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use domain::DomainError;
use domain::hub::{HubStateStore, PersistedHubState, SecretStore};

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DomainError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| DomainError::Storage(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DomainError::Storage(format!("{}: {}", path.display(), e))),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DomainError> {
    let storage = |e: std::io::Error| DomainError::Storage(format!("{}: {}", path.display(), e));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(storage)?;
    }
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| DomainError::Storage(e.to_string()))?;
    tokio::fs::write(path, bytes).await.map_err(storage)?;
    debug!(path = %path.display(), "State written");
    Ok(())
}

async fn remove(path: &Path) -> Result<(), DomainError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DomainError::Storage(format!("{}: {}", path.display(), e))),
    }
}

/// [`PersistedHubState`] as a JSON document
#[derive(Debug, Clone)]
pub struct JsonFileHubStateStore {
    path: PathBuf,
}

impl JsonFileHubStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HubStateStore for JsonFileHubStateStore {
    async fn load(&self) -> Result<Option<PersistedHubState>, DomainError> {
        read_json(&self.path).await
    }

    async fn save(&self, state: &PersistedHubState) -> Result<(), DomainError> {
        write_json(&self.path, state).await
    }

    async fn clear(&self) -> Result<(), DomainError> {
        remove(&self.path).await
    }
}

/// Secrets kept in a separate JSON map, keyed by opaque id.
///
/// Stands in for an OS keychain; the file should be readable by the
/// operator only.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn entries(&self) -> Result<BTreeMap<String, String>, DomainError> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let _guard = self.lock.lock().await;
        Ok(self.entries().await?.remove(key))
    }

    async fn set(&self, key: &str, secret: &str) -> Result<(), DomainError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.entries().await?;
        entries.insert(key.to_string(), secret.to_string());
        write_json(&self.path, &entries).await
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.entries().await?;
        if entries.remove(key).is_some() {
            write_json(&self.path, &entries).await?;
        }
        Ok(())
    }
}
