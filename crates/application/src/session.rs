use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use domain::hub::{HubStateStore, SecretStore};
use domain::method::DirectMethodTransport;
use domain::output::OutputLog;
use domain::registry::DeviceRegistry;
use domain::{ConnectionString, DeviceSelection, DomainError, HubConnection, ModuleDetails, TreeNode};

use crate::credentials::CredentialManager;
use crate::discovery::ModuleDiscovery;
use crate::invocation::{InvocationTimeouts, RemoteInvocationClient};
use crate::scheduler::AutoRefreshScheduler;
use crate::services::{LivePipelineService, RemoteDeviceAdapterService, TopologyService};
use crate::tree::{ExplorerTree, RefreshBus, RefreshReason, TreeLoader};

/// Tunables applied when the session is wired
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSettings {
    /// 0 disables auto-refresh
    pub refresh_interval_secs: u64,
    pub timeouts: InvocationTimeouts,
}

/// Ports the session is built from
pub struct SessionPorts {
    pub transport: Arc<dyn DirectMethodTransport>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub secrets: Arc<dyn SecretStore>,
    pub state: Arc<dyn HubStateStore>,
    pub output: Arc<dyn OutputLog>,
}

/// Owns the hub connection and everything scoped to it.
///
/// The session is the only writer of the connection. Readers take an
/// `Arc<HubConnection>` snapshot and see [`DomainError::NotConnected`]
/// after a reset.
pub struct ExplorerSession {
    connection: RwLock<Option<Arc<HubConnection>>>,
    tree: Arc<ExplorerTree>,
    bus: Arc<RefreshBus>,
    scheduler: AutoRefreshScheduler,
    discovery: Arc<ModuleDiscovery>,
    credentials: CredentialManager,
    registry: Arc<dyn DeviceRegistry>,
    topologies: TopologyService,
    pipelines: LivePipelineService,
    adapters: RemoteDeviceAdapterService,
    output: Arc<dyn OutputLog>,
    settings: SessionSettings,
}

impl ExplorerSession {
    pub fn new(ports: SessionPorts, settings: SessionSettings) -> Self {
        let client = Arc::new(RemoteInvocationClient::with_timeouts(
            ports.transport,
            settings.timeouts,
        ));
        let discovery = Arc::new(ModuleDiscovery::new(client.clone()));
        let topologies = TopologyService::new(client.clone());
        let pipelines = LivePipelineService::new(client.clone());
        let adapters = RemoteDeviceAdapterService::new(client);

        let loader = Arc::new(TreeLoader::new(
            ports.registry.clone(),
            discovery.clone(),
            topologies.clone(),
            pipelines.clone(),
            adapters.clone(),
        ));
        let tree = Arc::new(ExplorerTree::new(loader));
        let bus = Arc::new(RefreshBus::new());
        bus.attach(&tree);

        Self {
            connection: RwLock::new(None),
            tree,
            scheduler: AutoRefreshScheduler::new(bus.clone()),
            bus,
            discovery,
            credentials: CredentialManager::new(ports.secrets, ports.state),
            registry: ports.registry,
            topologies,
            pipelines,
            adapters,
            output: ports.output,
            settings,
        }
    }

    /// Connect to a hub and persist the connection for the next session
    pub async fn connect(
        &self,
        connection_string: &str,
        selections: Vec<DeviceSelection>,
    ) -> Result<Arc<HubConnection>, DomainError> {
        let parsed = ConnectionString::parse(connection_string)?;
        let hub = Arc::new(HubConnection::new(parsed, selections));

        if let Err(e) = self.credentials.save(&hub).await {
            warn!(error = %e, "Failed to persist connection");
            self.output
                .error(&format!("Connection will not be remembered: {}", e));
        }

        self.install(hub.clone());
        self.output
            .info(&format!("Connected to {}", hub.host_name()));
        Ok(hub)
    }

    /// Find the media modules a hub's edge devices run, without connecting.
    ///
    /// Devices that could not be reached are reported on the output log.
    pub async fn scan(&self, connection_string: &str) -> Result<Vec<DeviceSelection>, DomainError> {
        let hub = HubConnection::new(ConnectionString::parse(connection_string)?, Vec::new());
        let report = self.discovery.locate(&hub, self.registry.as_ref()).await?;
        for (device_id, error) in &report.unreachable {
            self.output
                .error(&format!("Could not query modules on {}: {}", device_id, error));
        }
        Ok(report.selections)
    }

    /// Reconnect with the last persisted connection
    pub async fn restore(&self) -> Result<Option<Arc<HubConnection>>, DomainError> {
        let Some(hub) = self.credentials.load().await? else {
            return Ok(None);
        };
        let hub = Arc::new(hub);
        self.install(hub.clone());
        Ok(Some(hub))
    }

    /// Forget the connection, stop auto-refresh and clear persisted state
    pub async fn reset(&self) -> Result<(), DomainError> {
        *self.connection.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.scheduler.stop().await;
        self.discovery.forget_all();
        self.bus.publish(RefreshReason::Reset);

        self.credentials.clear().await?;
        info!("Connection reset");
        self.output.info("Connection reset");
        Ok(())
    }

    pub fn connection(&self) -> Result<Arc<HubConnection>, DomainError> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DomainError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_ok()
    }

    pub fn root(&self) -> Result<TreeNode, DomainError> {
        Ok(TreeNode::hub(self.connection()?))
    }

    /// Expand the hub node. (Re)starts the auto-refresh timer.
    pub async fn expand_root(&self) -> Result<Vec<TreeNode>, DomainError> {
        let root = self.root()?;
        self.scheduler
            .restart(self.settings.refresh_interval_secs)
            .await;
        Ok(self.tree.children(&root).await)
    }

    pub async fn children(&self, node: &TreeNode) -> Vec<TreeNode> {
        self.tree.children(node).await
    }

    /// Depth-first walk of the expanded tree, down to `max_depth` (root = 0)
    pub async fn outline(&self, max_depth: usize) -> Result<Vec<(usize, TreeNode)>, DomainError> {
        let root = self.root()?;
        let mut lines = vec![(0, root.clone())];
        let mut stack: Vec<(usize, TreeNode)> = self
            .expand_root()
            .await?
            .into_iter()
            .rev()
            .map(|child| (1, child))
            .collect();

        while let Some((depth, node)) = stack.pop() {
            let expand = depth < max_depth && node.is_expandable();
            lines.push((depth, node.clone()));
            if expand {
                let children = self.tree.children(&node).await;
                stack.extend(children.into_iter().rev().map(|c| (depth + 1, c)));
            }
        }
        Ok(lines)
    }

    /// Details of one selected module, negotiating its API on first use
    pub async fn module(&self, device_id: &str, module_id: &str) -> Result<ModuleDetails, DomainError> {
        let hub = self.connection()?;
        self.discovery.discover(&hub, device_id, module_id).await
    }

    pub fn refresh(&self) {
        self.bus.publish(RefreshReason::Manual);
    }

    pub fn tree(&self) -> &Arc<ExplorerTree> {
        &self.tree
    }

    pub fn bus(&self) -> &Arc<RefreshBus> {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<dyn DeviceRegistry> {
        &self.registry
    }

    pub fn topologies(&self) -> &TopologyService {
        &self.topologies
    }

    pub fn pipelines(&self) -> &LivePipelineService {
        &self.pipelines
    }

    pub fn adapters(&self) -> &RemoteDeviceAdapterService {
        &self.adapters
    }

    pub fn output(&self) -> &Arc<dyn OutputLog> {
        &self.output
    }

    fn install(&self, hub: Arc<HubConnection>) {
        *self.connection.write().unwrap_or_else(PoisonError::into_inner) = Some(hub.clone());
        self.discovery.forget_all();
        self.bus.publish(RefreshReason::Connected);
        info!(host = %hub.host_name(), devices = hub.selections().len(), "Hub connection installed");
    }
}
