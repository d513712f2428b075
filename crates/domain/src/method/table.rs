use serde_json::{Map, Value, json};

use super::{Operation, ResourceKind};
use crate::error::{DomainError, Result};
use crate::module::{ModuleDetails, ModuleGeneration};

/// (operation, kind, legacy name, current name)
const METHOD_TABLE: &[(Operation, ResourceKind, Option<&str>, &str)] = &[
    (Operation::List, ResourceKind::Topology, Some("GraphTopologyList"), "pipelineTopologyList"),
    (Operation::Put, ResourceKind::Topology, Some("GraphTopologySet"), "pipelineTopologySet"),
    (Operation::Delete, ResourceKind::Topology, Some("GraphTopologyDelete"), "pipelineTopologyDelete"),
    (Operation::List, ResourceKind::LivePipeline, Some("GraphInstanceList"), "livePipelineList"),
    (Operation::Put, ResourceKind::LivePipeline, Some("GraphInstanceSet"), "livePipelineSet"),
    (Operation::Activate, ResourceKind::LivePipeline, Some("GraphInstanceActivate"), "livePipelineActivate"),
    (Operation::Deactivate, ResourceKind::LivePipeline, Some("GraphInstanceDeactivate"), "livePipelineDeactivate"),
    (Operation::Delete, ResourceKind::LivePipeline, Some("GraphInstanceDelete"), "livePipelineDelete"),
    (Operation::List, ResourceKind::RemoteDeviceAdapter, None, "remoteDeviceAdapterList"),
    (Operation::Put, ResourceKind::RemoteDeviceAdapter, None, "remoteDeviceAdapterSet"),
    (Operation::Delete, ResourceKind::RemoteDeviceAdapter, None, "remoteDeviceAdapterDelete"),
];

/// Resolve the concrete direct-method name for a logical operation.
///
/// Kinds without a legacy entry always resolve to the current name.
pub fn resolve_method(
    operation: Operation,
    kind: ResourceKind,
    legacy_module: bool,
) -> Result<&'static str> {
    METHOD_TABLE
        .iter()
        .find(|(op, k, _, _)| *op == operation && *k == kind)
        .map(|(_, _, legacy, current)| match (legacy_module, legacy) {
            (true, Some(legacy_name)) => *legacy_name,
            _ => *current,
        })
        .ok_or(DomainError::UnsupportedOperation { operation, kind })
}

pub fn supports(operation: Operation, kind: ResourceKind) -> bool {
    METHOD_TABLE
        .iter()
        .any(|(op, k, _, _)| *op == operation && *k == kind)
}

/// Operation-specific fields, before the version marker is attached
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Name(String),
    Resource(Value),
}

/// A method name and payload fields in the shape the module generation expects
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRequest {
    pub method_name: &'static str,
    pub generation: ModuleGeneration,
    pub fields: Option<Value>,
}

/// Rewrite a logical operation into the request a given module understands
pub fn build_request(
    module: &ModuleDetails,
    operation: Operation,
    kind: ResourceKind,
    body: RequestBody,
) -> Result<MethodRequest> {
    let method_name = resolve_method(operation, kind, module.legacy_module())?;

    let fields = match (operation, body) {
        (Operation::List, _) | (_, RequestBody::Empty) => None,
        (_, RequestBody::Name(name)) => Some(json!({ "name": name })),
        (_, RequestBody::Resource(Value::Object(map))) => Some(Value::Object(strip_read_only(map))),
        (_, RequestBody::Resource(other)) => {
            return Err(DomainError::InvalidResource(format!(
                "{} payload must be an object, got {}",
                kind, other
            )));
        }
    };

    Ok(MethodRequest {
        method_name,
        generation: module.generation(),
        fields,
    })
}

/// Fields the module owns and rejects on write
fn strip_read_only(mut map: Map<String, Value>) -> Map<String, Value> {
    map.remove("systemData");
    map.remove("@apiVersion");
    map
}
