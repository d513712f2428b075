use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tracing::{debug, info, warn};

use domain::method::{Operation, resolve_method};
use domain::registry::DeviceRegistry;
use domain::{ApiVersion, DeviceSelection, DomainError, HubConnection, ModuleDetails, ResourceKind};

use crate::invocation::RemoteInvocationClient;

/// Result of scanning a hub for media modules
#[derive(Debug, Default)]
pub struct ScanReport {
    pub selections: Vec<DeviceSelection>,
    /// Edge devices with at least one module that could not be reached, and
    /// the first error
    pub unreachable: Vec<(String, DomainError)>,
}

/// Negotiates which API generation a module speaks.
///
/// Tries `pipelineTopologyList` at 1.1, then 1.0, then `GraphTopologyList`
/// at 2.0. A rejected attempt moves on to the next one; a transport failure
/// aborts. Results are cached until [`ModuleDiscovery::forget_all`].
pub struct ModuleDiscovery {
    client: Arc<RemoteInvocationClient>,
    known: DashMap<(String, String), ModuleDetails>,
}

impl ModuleDiscovery {
    pub fn new(client: Arc<RemoteInvocationClient>) -> Self {
        Self {
            client,
            known: DashMap::new(),
        }
    }

    pub async fn discover(
        &self,
        hub: &HubConnection,
        device_id: &str,
        module_id: &str,
    ) -> Result<ModuleDetails, DomainError> {
        let key = (device_id.to_string(), module_id.to_string());
        if let Some(details) = self.known.get(&key) {
            return Ok(details.clone());
        }

        let mut last_rejection = None;
        for version in ApiVersion::NEGOTIATION_ORDER {
            let candidate = ModuleDetails::new(device_id, module_id, version);
            let method = resolve_method(
                Operation::List,
                ResourceKind::Topology,
                candidate.legacy_module(),
            )?;

            match self.client.invoke(hub, &candidate, method, None).await {
                Ok(_) => {
                    info!(
                        device_id = %device_id,
                        module_id = %module_id,
                        api_version = %version,
                        legacy = candidate.legacy_module(),
                        "Module API negotiated"
                    );
                    self.known.insert(key, candidate.clone());
                    return Ok(candidate);
                }
                Err(DomainError::RemoteOperation(rejection)) => {
                    debug!(
                        device_id = %device_id,
                        module_id = %module_id,
                        api_version = %version,
                        reason = %rejection.message,
                        "API version rejected"
                    );
                    last_rejection = Some(rejection.message);
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::NotFound(format!(
            "Module {}/{} does not answer any known API version ({})",
            device_id,
            module_id,
            last_rejection.unwrap_or_default()
        )))
    }

    /// Find media modules on every IoT Edge device of the hub.
    ///
    /// System modules (`$edgeAgent`, `$edgeHub`) are skipped. Modules that
    /// answer no known API are left out. Negotiation failures other than
    /// [`DomainError::NotFound`] are reported per device in
    /// [`ScanReport::unreachable`].
    pub async fn locate(
        &self,
        hub: &HubConnection,
        registry: &dyn DeviceRegistry,
    ) -> Result<ScanReport, DomainError> {
        let devices = registry.list_devices(hub).await?;
        let mut report = ScanReport::default();

        for device in devices.into_iter().filter(|d| d.is_edge) {
            let device_id = device.device_id;
            let module_ids: Vec<String> = registry
                .list_modules(hub, &device_id)
                .await?
                .into_iter()
                .filter(|m| !m.starts_with('$'))
                .collect();

            let attempts = module_ids
                .iter()
                .map(|module_id| self.discover(hub, &device_id, module_id));
            let results = join_all(attempts).await;

            let mut found = Vec::new();
            let mut failure = None;
            for (module_id, result) in module_ids.iter().zip(results) {
                match result {
                    Ok(_) => found.push(module_id.clone()),
                    Err(DomainError::NotFound(reason)) => {
                        debug!(device_id = %device_id, module_id = %module_id, reason = %reason, "Not a media module");
                    }
                    Err(e) => {
                        warn!(device_id = %device_id, module_id = %module_id, error = %e, "Module negotiation failed");
                        failure.get_or_insert(e);
                    }
                }
            }

            if let Some(e) = failure {
                report.unreachable.push((device_id.clone(), e));
            }
            if !found.is_empty() {
                report.selections.push(DeviceSelection::new(device_id, found));
            }
        }

        info!(
            devices = report.selections.len(),
            unreachable = report.unreachable.len(),
            "Hub scan finished"
        );
        Ok(report)
    }

    pub fn forget_all(&self) {
        self.known.clear();
    }
}
