use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::DeviceSelection;
use crate::DomainError;

/// Local state persisted between sessions.
///
/// The connection string itself lives in a [`SecretStore`] under
/// `connection_string_key`. `fallback_connection_string` is only written when
/// the secret store is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedHubState {
    #[serde(rename = "connectionStringKey")]
    pub connection_string_key: String,
    #[serde(default)]
    pub devices: Vec<DeviceSelection>,
    #[serde(
        rename = "connectionString",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fallback_connection_string: Option<String>,
}

/// OS-level secret storage (keychain or equivalent)
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;
    async fn set(&self, key: &str, secret: &str) -> Result<(), DomainError>;
    async fn delete(&self, key: &str) -> Result<(), DomainError>;
}

/// Plain local storage for [`PersistedHubState`]
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait HubStateStore: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedHubState>, DomainError>;
    async fn save(&self, state: &PersistedHubState) -> Result<(), DomainError>;
    async fn clear(&self) -> Result<(), DomainError>;
}
