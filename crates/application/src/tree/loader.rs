use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use domain::registry::DeviceRegistry;
use domain::resource::ResourceItem;
use domain::{DomainError, HubConnection, ModuleDetails, ResourceKind, Topology, TreeNode};

use crate::discovery::ModuleDiscovery;
use crate::services::{LivePipelineService, RemoteDeviceAdapterService, TopologyService};

/// Fetches the children of one node from the remote side.
///
/// Stateless apart from the discovery cache; every call hits the network
/// except for module nodes, whose children are static.
pub struct TreeLoader {
    registry: Arc<dyn DeviceRegistry>,
    discovery: Arc<ModuleDiscovery>,
    topologies: TopologyService,
    pipelines: LivePipelineService,
    adapters: RemoteDeviceAdapterService,
}

impl TreeLoader {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        discovery: Arc<ModuleDiscovery>,
        topologies: TopologyService,
        pipelines: LivePipelineService,
        adapters: RemoteDeviceAdapterService,
    ) -> Self {
        Self {
            registry,
            discovery,
            topologies,
            pipelines,
            adapters,
        }
    }

    pub async fn load(&self, node: TreeNode) -> Result<Vec<TreeNode>, DomainError> {
        match node {
            TreeNode::Hub { hub } => self.load_devices(hub).await,
            TreeNode::Device { hub, device_id } => self.load_modules(hub, &device_id).await,
            TreeNode::Module { hub, module } => Ok(module_lists(hub, module)),
            TreeNode::ResourceList { hub, module, kind } => {
                self.load_resources(hub, module, kind).await
            }
            TreeNode::ResourceItem {
                hub,
                module,
                item: ResourceItem::Topology(topology),
            } => self.load_pipelines_of(hub, module, &topology).await,
            TreeNode::ResourceItem { .. } | TreeNode::ErrorLeaf { .. } => Ok(Vec::new()),
        }
    }

    /// Selected devices that still exist in the registry
    async fn load_devices(&self, hub: Arc<HubConnection>) -> Result<Vec<TreeNode>, DomainError> {
        let registered: HashSet<String> = self
            .registry
            .list_devices(&hub)
            .await?
            .into_iter()
            .map(|d| d.device_id)
            .collect();

        let mut devices = Vec::new();
        for selection in hub.selections() {
            if !registered.contains(&selection.device_id) {
                warn!(device_id = %selection.device_id, "Selected device not found in hub, omitting");
                continue;
            }
            devices.push(TreeNode::Device {
                hub: hub.clone(),
                device_id: selection.device_id.clone(),
            });
        }
        Ok(devices)
    }

    /// Selected modules on one device, each with its negotiated API
    async fn load_modules(
        &self,
        hub: Arc<HubConnection>,
        device_id: &str,
    ) -> Result<Vec<TreeNode>, DomainError> {
        let Some(selection) = hub.selection(device_id) else {
            return Ok(Vec::new());
        };

        let lookups = selection
            .modules
            .iter()
            .map(|module_id| self.discovery.discover(&hub, device_id, module_id));
        let results = join_all(lookups).await;

        let mut modules = Vec::new();
        for (module_id, result) in selection.modules.iter().zip(results) {
            match result {
                Ok(module) => modules.push(TreeNode::Module {
                    hub: hub.clone(),
                    module,
                }),
                Err(DomainError::NotFound(reason)) => {
                    warn!(device_id = %device_id, module_id = %module_id, reason = %reason, "Module omitted");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(modules)
    }

    async fn load_resources(
        &self,
        hub: Arc<HubConnection>,
        module: ModuleDetails,
        kind: ResourceKind,
    ) -> Result<Vec<TreeNode>, DomainError> {
        let items: Vec<ResourceItem> = match kind {
            ResourceKind::Topology => into_items(self.topologies.list(&hub, &module).await?),
            ResourceKind::LivePipeline => into_items(self.pipelines.list(&hub, &module).await?),
            ResourceKind::RemoteDeviceAdapter => {
                into_items(self.adapters.list(&hub, &module).await?)
            }
        };
        debug!(module = %module, kind = %kind, count = items.len(), "Resources loaded");
        Ok(item_nodes(&hub, &module, items))
    }

    async fn load_pipelines_of(
        &self,
        hub: Arc<HubConnection>,
        module: ModuleDetails,
        topology: &Topology,
    ) -> Result<Vec<TreeNode>, DomainError> {
        let pipelines = self
            .pipelines
            .list(&hub, &module)
            .await?
            .into_iter()
            .filter(|p| p.topology_name() == topology.name)
            .map(ResourceItem::from)
            .collect();
        Ok(item_nodes(&hub, &module, pipelines))
    }
}

fn module_lists(hub: Arc<HubConnection>, module: ModuleDetails) -> Vec<TreeNode> {
    let mut kinds = vec![ResourceKind::Topology];
    if module.api_version().supports_remote_device_adapters() {
        kinds.push(ResourceKind::RemoteDeviceAdapter);
    }
    kinds
        .into_iter()
        .map(|kind| TreeNode::ResourceList {
            hub: hub.clone(),
            module: module.clone(),
            kind,
        })
        .collect()
}

fn into_items<R: Into<ResourceItem>>(resources: Vec<R>) -> Vec<ResourceItem> {
    resources.into_iter().map(Into::into).collect()
}

fn item_nodes(
    hub: &Arc<HubConnection>,
    module: &ModuleDetails,
    items: Vec<ResourceItem>,
) -> Vec<TreeNode> {
    items
        .into_iter()
        .map(|item| TreeNode::ResourceItem {
            hub: hub.clone(),
            module: module.clone(),
            item,
        })
        .collect()
}
