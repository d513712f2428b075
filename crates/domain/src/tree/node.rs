use std::sync::Arc;

use crate::hub::HubConnection;
use crate::method::ResourceKind;
use crate::module::ModuleDetails;
use crate::resource::ResourceItem;

/// Stable identity of a node across refreshes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Explorer tree node.
///
/// A closed set of variants; how children are fetched is decided by
/// matching on the variant, never by the node itself.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Hub {
        hub: Arc<HubConnection>,
    },
    Device {
        hub: Arc<HubConnection>,
        device_id: String,
    },
    Module {
        hub: Arc<HubConnection>,
        module: ModuleDetails,
    },
    ResourceList {
        hub: Arc<HubConnection>,
        module: ModuleDetails,
        kind: ResourceKind,
    },
    ResourceItem {
        hub: Arc<HubConnection>,
        module: ModuleDetails,
        item: ResourceItem,
    },
    /// Inert leaf shown in place of children that failed to load
    ErrorLeaf {
        message: String,
    },
}

impl TreeNode {
    pub fn hub(hub: Arc<HubConnection>) -> Self {
        Self::Hub { hub }
    }

    pub fn error_leaf(message: impl Into<String>) -> Self {
        Self::ErrorLeaf {
            message: message.into(),
        }
    }

    pub fn key(&self) -> NodeKey {
        let key = match self {
            Self::Hub { hub } => hub.host_name().to_string(),
            Self::Device { hub, device_id } => format!("{}/{}", hub.host_name(), device_id),
            Self::Module { hub, module } => format!("{}/{}", hub.host_name(), module),
            Self::ResourceList { hub, module, kind } => {
                format!("{}/{}#{:?}", hub.host_name(), module, kind)
            }
            Self::ResourceItem { hub, module, item } => {
                format!("{}/{}#{:?}/{}", hub.host_name(), module, item.kind(), item.name())
            }
            Self::ErrorLeaf { message } => format!("error:{}", message),
        };
        NodeKey(key)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Hub { hub } => hub.connection_string().hub_name().to_string(),
            Self::Device { device_id, .. } => device_id.clone(),
            Self::Module { module, .. } => module.module_id().to_string(),
            Self::ResourceList { kind, .. } => kind.plural_label().to_string(),
            Self::ResourceItem { item, .. } => item.name().to_string(),
            Self::ErrorLeaf { message } => message.clone(),
        }
    }

    /// Secondary text shown next to the label
    pub fn description(&self) -> Option<String> {
        match self {
            Self::Module { module, .. } => Some(format!("api {}", module.api_version())),
            Self::ResourceItem {
                item: ResourceItem::LivePipeline(pipeline),
                ..
            } => Some(pipeline.state().to_string()),
            Self::ResourceItem {
                item: ResourceItem::RemoteDeviceAdapter(adapter),
                ..
            } => Some(adapter.host().to_string()),
            _ => None,
        }
    }

    pub fn is_expandable(&self) -> bool {
        match self {
            Self::Hub { .. } | Self::Device { .. } | Self::Module { .. } => true,
            Self::ResourceList { .. } => true,
            // Topologies expand into the live pipelines that reference them
            Self::ResourceItem { item, .. } => matches!(item, ResourceItem::Topology(_)),
            Self::ErrorLeaf { .. } => false,
        }
    }

    /// Nodes whose children are a remote resource list, memoized per refresh cycle
    pub fn memoizes_children(&self) -> bool {
        match self {
            Self::ResourceList { .. } => true,
            Self::ResourceItem { item, .. } => matches!(item, ResourceItem::Topology(_)),
            _ => false,
        }
    }

    pub fn module(&self) -> Option<&ModuleDetails> {
        match self {
            Self::Module { module, .. }
            | Self::ResourceList { module, .. }
            | Self::ResourceItem { module, .. } => Some(module),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::ErrorLeaf { .. })
    }
}
