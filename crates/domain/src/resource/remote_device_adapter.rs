use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Resource;
use crate::method::ResourceKind;

pub const SYMMETRIC_KEY_CREDENTIALS_TYPE: &str = "#Microsoft.VideoAnalyzer.SymmetricKeyCredentials";

/// Maps a remote capture device to a host and an IoT device identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDeviceAdapter {
    pub name: String,
    pub properties: RemoteDeviceAdapterProperties,
    #[serde(rename = "systemData", default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDeviceAdapterProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub target: RemoteDeviceAdapterTarget,
    #[serde(rename = "iotHubDeviceConnection")]
    pub iot_hub_device_connection: IotHubDeviceConnection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDeviceAdapterTarget {
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IotHubDeviceConnection {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// Omitted by modules when listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SymmetricKeyCredentials>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetricKeyCredentials {
    #[serde(rename = "@type")]
    pub credential_type: String,
    pub key: String,
}

impl SymmetricKeyCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            credential_type: SYMMETRIC_KEY_CREDENTIALS_TYPE.to_string(),
            key: key.into(),
        }
    }
}

impl RemoteDeviceAdapter {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        device_id: impl Into<String>,
        device_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            properties: RemoteDeviceAdapterProperties {
                description: None,
                target: RemoteDeviceAdapterTarget { host: host.into() },
                iot_hub_device_connection: IotHubDeviceConnection {
                    device_id: device_id.into(),
                    credentials: Some(SymmetricKeyCredentials::new(device_key)),
                },
                extra: Map::new(),
            },
            system_data: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.properties.target.host
    }

    pub fn device_id(&self) -> &str {
        &self.properties.iot_hub_device_connection.device_id
    }
}

impl Resource for RemoteDeviceAdapter {
    const KIND: ResourceKind = ResourceKind::RemoteDeviceAdapter;

    fn name(&self) -> &str {
        &self.name
    }
}
