use std::sync::Arc;

use tracing::{info, warn};

use domain::hub::{HubStateStore, PersistedHubState, SecretStore};
use domain::{ConnectionString, DomainError, HubConnection};

/// Persists the hub connection between sessions.
///
/// The connection string goes to the secret store under a random key; the
/// key and the device selections go to plain storage. If the secret store
/// is unavailable the connection string is written to plain storage instead.
pub struct CredentialManager {
    secrets: Arc<dyn SecretStore>,
    state: Arc<dyn HubStateStore>,
}

impl CredentialManager {
    pub fn new(secrets: Arc<dyn SecretStore>, state: Arc<dyn HubStateStore>) -> Self {
        Self { secrets, state }
    }

    pub async fn save(&self, hub: &HubConnection) -> Result<(), DomainError> {
        let key = match self.state.load().await {
            Ok(Some(existing)) => existing.connection_string_key,
            _ => uuid::Uuid::new_v4().to_string(),
        };
        let raw = hub.connection_string().to_connection_string();

        let fallback_connection_string = match self.secrets.set(&key, &raw).await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Secret store unavailable, storing connection string locally");
                Some(raw)
            }
        };

        self.state
            .save(&PersistedHubState {
                connection_string_key: key,
                devices: hub.selections().to_vec(),
                fallback_connection_string,
            })
            .await?;
        info!(host = %hub.host_name(), devices = hub.selections().len(), "Connection saved");
        Ok(())
    }

    /// Restore the last saved connection, if any
    pub async fn load(&self) -> Result<Option<HubConnection>, DomainError> {
        let Some(state) = self.state.load().await? else {
            return Ok(None);
        };

        let secret = match self.secrets.get(&state.connection_string_key).await {
            Ok(secret) => secret,
            Err(e) => {
                warn!(error = %e, "Secret store unavailable, trying local fallback");
                None
            }
        };

        let Some(raw) = secret.or(state.fallback_connection_string) else {
            warn!("Saved connection has no connection string");
            return Ok(None);
        };

        let connection_string = ConnectionString::parse(&raw)?;
        Ok(Some(HubConnection::new(connection_string, state.devices)))
    }

    pub async fn clear(&self) -> Result<(), DomainError> {
        if let Ok(Some(state)) = self.state.load().await {
            if let Err(e) = self.secrets.delete(&state.connection_string_key).await {
                warn!(error = %e, "Failed to delete saved connection string");
            }
        }
        self.state.clear().await
    }
}
