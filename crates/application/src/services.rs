//! One command service per remote resource kind.
//!
//! Every call resolves its method through the capability table, then goes
//! through the invocation client exactly once. Errors propagate unchanged.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use domain::method::{Operation, RequestBody, build_request};
use domain::resource::validate_resource_name;
use domain::{
    DomainError, HubConnection, LivePipeline, ModuleDetails, RemoteDeviceAdapter, Resource,
    Topology,
};

use crate::invocation::RemoteInvocationClient;

pub type TopologyService = ResourceService<Topology>;
pub type LivePipelineService = ResourceService<LivePipeline>;
pub type RemoteDeviceAdapterService = ResourceService<RemoteDeviceAdapter>;

pub struct ResourceService<R> {
    client: Arc<RemoteInvocationClient>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ResourceService<R> {
    pub fn new(client: Arc<RemoteInvocationClient>) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    /// List every resource of this kind. A response without `value` is an empty list.
    pub async fn list(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
    ) -> Result<Vec<R>, DomainError> {
        let request = build_request(module, Operation::List, R::KIND, RequestBody::Empty)?;
        let payload = self.client.execute(hub, module, request).await?;
        parse_list(payload)
    }

    /// Create or update. Returns whatever the module echoes back.
    pub async fn put(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
        resource: &R,
    ) -> Result<Vec<R>, DomainError> {
        validate_resource_name(resource.name())?;
        let body = serde_json::to_value(resource)
            .map_err(|e| DomainError::InvalidResource(e.to_string()))?;
        let request = build_request(module, Operation::Put, R::KIND, RequestBody::Resource(body))?;
        let payload = self.client.execute(hub, module, request).await?;
        info!(module = %module, name = %resource.name(), kind = %R::KIND, "Resource saved");
        parse_echo(payload)
    }

    pub async fn delete(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
        name: &str,
    ) -> Result<(), DomainError> {
        self.named(hub, module, Operation::Delete, name).await?;
        info!(module = %module, name = %name, kind = %R::KIND, "Resource deleted");
        Ok(())
    }

    /// Look up one resource by name via `list`
    pub async fn get(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
        name: &str,
    ) -> Result<R, DomainError> {
        self.list(hub, module)
            .await?
            .into_iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| DomainError::NotFound(format!("{} '{}' on {}", R::KIND, name, module)))
    }

    async fn named(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
        operation: Operation,
        name: &str,
    ) -> Result<Value, DomainError> {
        let request = build_request(module, operation, R::KIND, RequestBody::Name(name.to_string()))?;
        self.client.execute(hub, module, request).await
    }
}

impl ResourceService<LivePipeline> {
    pub async fn activate(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
        name: &str,
    ) -> Result<(), DomainError> {
        self.named(hub, module, Operation::Activate, name).await?;
        info!(module = %module, name = %name, "Live pipeline activated");
        Ok(())
    }

    pub async fn deactivate(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
        name: &str,
    ) -> Result<(), DomainError> {
        self.named(hub, module, Operation::Deactivate, name).await?;
        info!(module = %module, name = %name, "Live pipeline deactivated");
        Ok(())
    }
}

fn parse_list<R: Resource>(payload: Value) -> Result<Vec<R>, DomainError> {
    match payload.get("value") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(parse_one::<R>).collect(),
        Some(other) => Err(DomainError::InvalidResource(format!(
            "Expected a {} list, got {}",
            R::KIND,
            other
        ))),
    }
}

fn parse_echo<R: Resource>(payload: Value) -> Result<Vec<R>, DomainError> {
    if payload.get("value").is_some() {
        return parse_list(payload);
    }
    if payload.get("name").is_some() {
        return Ok(vec![parse_one(&payload)?]);
    }
    Ok(Vec::new())
}

fn parse_one<R: Resource>(value: &Value) -> Result<R, DomainError> {
    serde_json::from_value(value.clone())
        .map_err(|e| DomainError::InvalidResource(format!("Malformed {}: {}", R::KIND, e)))
}
