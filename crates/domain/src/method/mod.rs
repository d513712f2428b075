mod table;
mod transport;

pub use table::{MethodRequest, RequestBody, build_request, resolve_method, supports};
pub use transport::{DEFAULT_TIMEOUT_SECS, DirectMethodTransport, MethodCall, MethodResponse};
#[cfg(any(test, feature = "mocks"))]
pub use transport::MockDirectMethodTransport;

use serde::{Deserialize, Serialize};

/// Logical operation the operator asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    List,
    Put,
    Delete,
    Activate,
    Deactivate,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::List,
        Self::Put,
        Self::Delete,
        Self::Activate,
        Self::Deactivate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote resource family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Topology,
    LivePipeline,
    RemoteDeviceAdapter,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        Self::Topology,
        Self::LivePipeline,
        Self::RemoteDeviceAdapter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topology => "topology",
            Self::LivePipeline => "live pipeline",
            Self::RemoteDeviceAdapter => "remote device adapter",
        }
    }

    /// Heading shown for a list of this kind
    pub fn plural_label(&self) -> &'static str {
        match self {
            Self::Topology => "Pipeline topologies",
            Self::LivePipeline => "Live pipelines",
            Self::RemoteDeviceAdapter => "Remote device adapters",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
