mod live_pipeline;
mod name;
mod remote_device_adapter;
mod topology;

pub use live_pipeline::{LivePipeline, LivePipelineProperties, ParameterValue, PipelineState};
pub use name::validate_resource_name;
pub use remote_device_adapter::{
    IotHubDeviceConnection, RemoteDeviceAdapter, RemoteDeviceAdapterProperties,
    RemoteDeviceAdapterTarget, SymmetricKeyCredentials,
};
pub use topology::{ParameterDeclaration, Topology, TopologyNode, TopologyProperties};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::method::ResourceKind;

/// A named resource hosted by a module
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn name(&self) -> &str;
}

/// Any resource, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceItem {
    Topology(Topology),
    LivePipeline(LivePipeline),
    RemoteDeviceAdapter(RemoteDeviceAdapter),
}

impl ResourceItem {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Topology(_) => ResourceKind::Topology,
            Self::LivePipeline(_) => ResourceKind::LivePipeline,
            Self::RemoteDeviceAdapter(_) => ResourceKind::RemoteDeviceAdapter,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Topology(t) => t.name(),
            Self::LivePipeline(p) => p.name(),
            Self::RemoteDeviceAdapter(a) => a.name(),
        }
    }
}

impl From<Topology> for ResourceItem {
    fn from(value: Topology) -> Self {
        Self::Topology(value)
    }
}

impl From<LivePipeline> for ResourceItem {
    fn from(value: LivePipeline) -> Self {
        Self::LivePipeline(value)
    }
}

impl From<RemoteDeviceAdapter> for ResourceItem {
    fn from(value: RemoteDeviceAdapter) -> Self {
        Self::RemoteDeviceAdapter(value)
    }
}
