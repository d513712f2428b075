use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DomainError;
use crate::hub::HubConnection;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Direct-method call envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCall {
    pub method_name: String,
    pub payload: Value,
    #[serde(rename = "responseTimeoutInSeconds")]
    pub response_timeout_secs: u64,
    #[serde(rename = "connectTimeoutInSeconds")]
    pub connect_timeout_secs: u64,
}

/// Direct-method result as returned by the hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResponse {
    pub status: u16,
    #[serde(default)]
    pub payload: Value,
}

/// Port for invoking a direct method on one module.
///
/// Implementations report connectivity and timeout failures as
/// [`DomainError::Transport`] and an unknown device/module as
/// [`DomainError::NotFound`]. Application-level errors inside the payload are
/// returned untouched for the caller to interpret.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait DirectMethodTransport: Send + Sync {
    async fn invoke(
        &self,
        hub: &HubConnection,
        device_id: &str,
        module_id: &str,
        call: &MethodCall,
    ) -> Result<MethodResponse, DomainError>;
}
