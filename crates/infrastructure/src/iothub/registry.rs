use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use domain::registry::{DeviceIdentity, DeviceRegistry};
use domain::{DomainError, HubConnection};

use super::auth::encode_component;
use super::client::{IotHubClient, check_status, json, send};

const CONTINUATION_HEADER: &str = "x-ms-continuation";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceRecord {
    device_id: String,
    #[serde(default)]
    capabilities: Option<Capabilities>,
    #[serde(default)]
    authentication: Option<Authentication>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Capabilities {
    #[serde(default)]
    iot_edge: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Authentication {
    #[serde(default)]
    symmetric_key: Option<SymmetricKey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymmetricKey {
    #[serde(default)]
    primary_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleRecord {
    module_id: String,
}

impl From<DeviceRecord> for DeviceIdentity {
    fn from(record: DeviceRecord) -> Self {
        Self {
            device_id: record.device_id,
            is_edge: record.capabilities.is_some_and(|c| c.iot_edge),
            primary_key: record
                .authentication
                .and_then(|a| a.symmetric_key)
                .and_then(|k| k.primary_key)
                .filter(|k| !k.is_empty()),
        }
    }
}

/// Device identity registry over the hub's REST API
#[derive(Debug, Clone, Default)]
pub struct HttpDeviceRegistry {
    client: IotHubClient,
}

impl HttpDeviceRegistry {
    pub fn new(client: IotHubClient) -> Self {
        Self { client }
    }

    fn device_path(device_id: &str) -> String {
        format!("/devices/{}", encode_component(device_id))
    }
}

#[async_trait]
impl DeviceRegistry for HttpDeviceRegistry {
    async fn list_devices(&self, hub: &HubConnection) -> Result<Vec<DeviceIdentity>, DomainError> {
        let mut devices = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .request(hub, Method::POST, "/devices/query")?
                .json(&json!({ "query": "SELECT * FROM devices" }));
            if let Some(token) = &continuation {
                request = request.header(CONTINUATION_HEADER, token.as_str());
            }

            let response = check_status(send(request).await?, "Device query").await?;
            continuation = response
                .headers()
                .get(CONTINUATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            let page: Vec<DeviceRecord> = json(response).await?;
            devices.extend(page.into_iter().map(DeviceIdentity::from));

            if continuation.is_none() {
                break;
            }
        }

        debug!(count = devices.len(), "Devices listed");
        Ok(devices)
    }

    async fn list_modules(
        &self,
        hub: &HubConnection,
        device_id: &str,
    ) -> Result<Vec<String>, DomainError> {
        let path = format!("{}/modules", Self::device_path(device_id));
        let request = self.client.request(hub, Method::GET, &path)?;
        let response = check_status(send(request).await?, &format!("Device {}", device_id)).await?;
        let modules: Vec<ModuleRecord> = json(response).await?;
        Ok(modules.into_iter().map(|m| m.module_id).collect())
    }

    async fn get_device(
        &self,
        hub: &HubConnection,
        device_id: &str,
    ) -> Result<DeviceIdentity, DomainError> {
        let request = self
            .client
            .request(hub, Method::GET, &Self::device_path(device_id))?;
        let response = check_status(send(request).await?, &format!("Device {}", device_id)).await?;
        let record: DeviceRecord = json(response).await?;
        Ok(record.into())
    }

    async fn create_device(
        &self,
        hub: &HubConnection,
        device_id: &str,
    ) -> Result<DeviceIdentity, DomainError> {
        let request = self
            .client
            .request(hub, Method::PUT, &Self::device_path(device_id))?
            .json(&json!({
                "deviceId": device_id,
                "authentication": { "type": "sas" }
            }));
        let response =
            check_status(send(request).await?, &format!("Create device {}", device_id)).await?;
        let record: DeviceRecord = json(response).await?;
        info!(device_id = %device_id, "Device identity created");
        Ok(record.into())
    }
}
