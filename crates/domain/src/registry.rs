use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::DomainError;
use crate::hub::HubConnection;

/// Device identity as known to the hub registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: String,
    /// IoT Edge devices host modules; leaf devices do not
    pub is_edge: bool,
    /// Only populated by single-device lookups and creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

impl DeviceIdentity {
    pub fn new(device_id: impl Into<String>, is_edge: bool) -> Self {
        Self {
            device_id: device_id.into(),
            is_edge,
            primary_key: None,
        }
    }
}

/// Port for the hub's identity registry
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn list_devices(&self, hub: &HubConnection) -> Result<Vec<DeviceIdentity>, DomainError>;

    async fn list_modules(
        &self,
        hub: &HubConnection,
        device_id: &str,
    ) -> Result<Vec<String>, DomainError>;

    /// Fails with [`DomainError::NotFound`] when the device does not exist
    async fn get_device(
        &self,
        hub: &HubConnection,
        device_id: &str,
    ) -> Result<DeviceIdentity, DomainError>;

    /// Create a leaf device with hub-generated symmetric keys
    async fn create_device(
        &self,
        hub: &HubConnection,
        device_id: &str,
    ) -> Result<DeviceIdentity, DomainError>;
}
