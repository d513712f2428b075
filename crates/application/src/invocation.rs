use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use domain::method::{
    DEFAULT_TIMEOUT_SECS, DirectMethodTransport, MethodCall, MethodRequest, MethodResponse,
};
use domain::{DomainError, HubConnection, ModuleDetails, RemoteError};

/// Connect and response bounds sent with every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationTimeouts {
    pub connect_secs: u64,
    pub response_secs: u64,
}

impl Default for InvocationTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_TIMEOUT_SECS,
            response_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Issues direct-method calls to one (device, module) pair and folds every
/// failure shape into [`DomainError`].
pub struct RemoteInvocationClient {
    transport: Arc<dyn DirectMethodTransport>,
    timeouts: InvocationTimeouts,
}

impl RemoteInvocationClient {
    pub fn new(transport: Arc<dyn DirectMethodTransport>) -> Self {
        Self::with_timeouts(transport, InvocationTimeouts::default())
    }

    pub fn with_timeouts(
        transport: Arc<dyn DirectMethodTransport>,
        timeouts: InvocationTimeouts,
    ) -> Self {
        Self {
            transport,
            timeouts,
        }
    }

    pub fn timeouts(&self) -> InvocationTimeouts {
        self.timeouts
    }

    /// Invoke `method_name` with the module's `@apiVersion` merged into `fields`.
    ///
    /// Resolves with the response payload. A payload carrying `error` is a
    /// failure even if it also carries `value`.
    pub async fn invoke(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
        method_name: &str,
        fields: Option<Value>,
    ) -> Result<Value, DomainError> {
        let call = MethodCall {
            method_name: method_name.to_string(),
            payload: versioned_payload(module, fields)?,
            response_timeout_secs: self.timeouts.response_secs,
            connect_timeout_secs: self.timeouts.connect_secs,
        };

        debug!(
            device_id = %module.device_id(),
            module_id = %module.module_id(),
            method = %method_name,
            api_version = %module.api_version(),
            "Invoking direct method"
        );

        let response = self
            .transport
            .invoke(hub, module.device_id(), module.module_id(), &call)
            .await
            .inspect_err(|e| {
                warn!(
                    device_id = %module.device_id(),
                    module_id = %module.module_id(),
                    method = %method_name,
                    error = %e,
                    "Direct method transport failure"
                );
            })?;

        interpret_response(response).inspect_err(|e| {
            warn!(
                device_id = %module.device_id(),
                module_id = %module.module_id(),
                method = %method_name,
                error = %e,
                "Direct method rejected by module"
            );
        })
    }

    /// Invoke a request built by the capability table
    pub async fn execute(
        &self,
        hub: &HubConnection,
        module: &ModuleDetails,
        request: MethodRequest,
    ) -> Result<Value, DomainError> {
        self.invoke(hub, module, request.method_name, request.fields)
            .await
    }
}

fn versioned_payload(module: &ModuleDetails, fields: Option<Value>) -> Result<Value, DomainError> {
    let mut payload = match fields {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(DomainError::InvalidResource(format!(
                "Method payload must be an object, got {}",
                other
            )));
        }
    };
    payload.insert(
        "@apiVersion".to_string(),
        Value::String(module.api_version().as_str().to_string()),
    );
    Ok(Value::Object(payload))
}

fn interpret_response(response: MethodResponse) -> Result<Value, DomainError> {
    let MethodResponse { status, payload } = response;

    if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
        return Err(DomainError::RemoteOperation(RemoteError::from_value(error)));
    }

    if status >= 400 {
        let message = match &payload {
            Value::Null => format!("status {}", status),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        return Err(DomainError::RemoteOperation(RemoteError {
            message,
            code: Some(status.to_string()),
            details: Vec::new(),
        }));
    }

    Ok(payload)
}
