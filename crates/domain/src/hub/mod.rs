mod connection_string;
mod store;

pub use connection_string::ConnectionString;
pub use store::{HubStateStore, PersistedHubState, SecretStore};
#[cfg(any(test, feature = "mocks"))]
pub use store::{MockHubStateStore, MockSecretStore};

use serde::{Deserialize, Serialize};

/// Modules the operator chose to manage on one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelection {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

impl DeviceSelection {
    pub fn new(device_id: impl Into<String>, modules: Vec<String>) -> Self {
        Self {
            device_id: device_id.into(),
            modules,
        }
    }
}

/// An IoT Hub plus the device/module pairs under management.
///
/// Owned by the explorer session; everything else holds it behind an `Arc`
/// and treats it as read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct HubConnection {
    connection_string: ConnectionString,
    selections: Vec<DeviceSelection>,
}

impl HubConnection {
    pub fn new(connection_string: ConnectionString, selections: Vec<DeviceSelection>) -> Self {
        Self {
            connection_string,
            selections: merge_selections(selections),
        }
    }

    pub fn connection_string(&self) -> &ConnectionString {
        &self.connection_string
    }

    pub fn host_name(&self) -> &str {
        self.connection_string.host_name()
    }

    pub fn selections(&self) -> &[DeviceSelection] {
        &self.selections
    }

    pub fn selection(&self, device_id: &str) -> Option<&DeviceSelection> {
        self.selections.iter().find(|s| s.device_id == device_id)
    }
}

/// Collapse duplicate device entries, keeping first-seen order
fn merge_selections(selections: Vec<DeviceSelection>) -> Vec<DeviceSelection> {
    let mut merged: Vec<DeviceSelection> = Vec::with_capacity(selections.len());
    for selection in selections {
        match merged.iter_mut().find(|s| s.device_id == selection.device_id) {
            Some(existing) => {
                for module in selection.modules {
                    if !existing.modules.contains(&module) {
                        existing.modules.push(module);
                    }
                }
            }
            None => {
                let mut modules = Vec::with_capacity(selection.modules.len());
                for module in selection.modules {
                    if !modules.contains(&module) {
                        modules.push(module);
                    }
                }
                merged.push(DeviceSelection {
                    device_id: selection.device_id,
                    modules,
                });
            }
        }
    }
    merged
}
