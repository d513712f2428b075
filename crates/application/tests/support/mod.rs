//! Hand-written fakes shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use application::{ExplorerSession, SessionPorts, SessionSettings};
use async_trait::async_trait;
use domain::hub::{HubStateStore, PersistedHubState, SecretStore};
use domain::method::{DirectMethodTransport, MethodCall, MethodResponse};
use domain::output::OutputLog;
use domain::registry::{DeviceIdentity, DeviceRegistry};
use domain::wizard::WizardPrompter;
use domain::{ApiVersion, DeviceSelection, DomainError, HubConnection};
use serde_json::{Value, json};

pub const CONNECTION_STRING: &str =
    "HostName=hub1.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0";

#[derive(Default)]
struct Store {
    topologies: Vec<Value>,
    pipelines: Vec<Value>,
    adapters: Vec<Value>,
}

/// In-memory media module speaking exactly one API version
pub struct FakeModule {
    api: ApiVersion,
    store: Mutex<Store>,
    calls: Mutex<Vec<(String, Value)>>,
    delay: Mutex<Option<Duration>>,
    failures: Mutex<HashMap<String, Value>>,
}

impl FakeModule {
    pub fn new(api: ApiVersion) -> Arc<Self> {
        Arc::new(Self {
            api,
            store: Mutex::new(Store::default()),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            failures: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_topology(self: Arc<Self>, name: &str) -> Arc<Self> {
        self.store.lock().unwrap().topologies.push(json!({
            "name": name,
            "properties": {"sources": [], "processors": [], "sinks": []}
        }));
        self
    }

    pub fn with_pipeline(self: Arc<Self>, name: &str, topology: &str, state: &str) -> Arc<Self> {
        self.store.lock().unwrap().pipelines.push(json!({
            "name": name,
            "properties": {"topologyName": topology, "state": state}
        }));
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Reject every call to `method` with `error` until cleared
    pub fn fail_method(&self, method: &str, error: Value) {
        self.failures.lock().unwrap().insert(method.to_string(), error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    async fn handle(&self, call: &MethodCall) -> MethodResponse {
        self.calls
            .lock()
            .unwrap()
            .push((call.method_name.clone(), call.payload.clone()));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if call.payload.get("@apiVersion").and_then(Value::as_str) != Some(self.api.as_str()) {
            return reject(400, format!("API version {} is not supported", call.payload["@apiVersion"]));
        }
        if let Some(error) = self.failures.lock().unwrap().get(&call.method_name) {
            return MethodResponse {
                status: 400,
                payload: json!({ "error": error }),
            };
        }

        let legacy = self.api == ApiVersion::V2_0;
        let name = call.payload.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        let mut store = self.store.lock().unwrap();

        match (legacy, call.method_name.as_str()) {
            (true, "GraphTopologyList") | (false, "pipelineTopologyList") => list(&store.topologies),
            (true, "GraphInstanceList") | (false, "livePipelineList") => list(&store.pipelines),
            (false, "remoteDeviceAdapterList") if self.api == ApiVersion::V1_1 => list(&store.adapters),
            (true, "GraphTopologySet") | (false, "pipelineTopologySet") => {
                upsert(&mut store.topologies, &call.payload)
            }
            (true, "GraphInstanceSet") | (false, "livePipelineSet") => {
                upsert(&mut store.pipelines, &call.payload)
            }
            (false, "remoteDeviceAdapterSet") if self.api == ApiVersion::V1_1 => {
                upsert(&mut store.adapters, &call.payload)
            }
            (true, "GraphTopologyDelete") | (false, "pipelineTopologyDelete") => {
                remove(&mut store.topologies, &name)
            }
            (true, "GraphInstanceDelete") | (false, "livePipelineDelete") => {
                remove(&mut store.pipelines, &name)
            }
            (false, "remoteDeviceAdapterDelete") if self.api == ApiVersion::V1_1 => {
                remove(&mut store.adapters, &name)
            }
            (true, "GraphInstanceActivate") | (false, "livePipelineActivate") => {
                let state = if legacy { "Active" } else { "active" };
                transition(&mut store, &name, state, true)
            }
            (true, "GraphInstanceDeactivate") | (false, "livePipelineDeactivate") => {
                let state = if legacy { "Inactive" } else { "inactive" };
                transition(&mut store, &name, state, false)
            }
            (_, other) => reject(501, format!("The method '{}' is not implemented", other)),
        }
    }
}

fn reject(status: u16, message: String) -> MethodResponse {
    MethodResponse {
        status,
        payload: json!({"error": {"code": "InvalidRequest", "message": message}}),
    }
}

fn list(items: &[Value]) -> MethodResponse {
    MethodResponse {
        status: 200,
        payload: json!({ "value": items }),
    }
}

fn upsert(items: &mut Vec<Value>, payload: &Value) -> MethodResponse {
    let mut resource = payload.clone();
    if let Some(map) = resource.as_object_mut() {
        map.remove("@apiVersion");
    }
    let name = resource["name"].clone();
    items.retain(|item| item["name"] != name);
    items.push(resource.clone());
    MethodResponse {
        status: 201,
        payload: resource,
    }
}

fn remove(items: &mut Vec<Value>, name: &str) -> MethodResponse {
    items.retain(|item| item["name"] != name);
    MethodResponse {
        status: 200,
        payload: Value::Null,
    }
}

fn transition(store: &mut Store, name: &str, state: &str, activating: bool) -> MethodResponse {
    let topologies: Vec<Value> = store.topologies.iter().map(|t| t["name"].clone()).collect();
    let Some(pipeline) = store.pipelines.iter_mut().find(|p| p["name"] == name) else {
        return reject(404, format!("Live pipeline '{}' does not exist", name));
    };
    if activating && !topologies.contains(&pipeline["properties"]["topologyName"]) {
        return reject(
            409,
            format!(
                "Live pipeline '{}' references topology {} which does not exist",
                name, pipeline["properties"]["topologyName"]
            ),
        );
    }
    pipeline["properties"]["state"] = json!(state);
    MethodResponse {
        status: 200,
        payload: Value::Null,
    }
}

/// Routes calls to fake modules by (device, module)
#[derive(Default)]
pub struct FakeHub {
    modules: Mutex<HashMap<(String, String), Arc<FakeModule>>>,
    offline: AtomicBool,
    unreachable: Mutex<Vec<String>>,
    invocations: AtomicUsize,
}

impl FakeHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn install(&self, device_id: &str, module_id: &str, module: Arc<FakeModule>) {
        self.modules
            .lock()
            .unwrap()
            .insert((device_id.to_string(), module_id.to_string()), module);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Calls to `device_id` fail as if the device were offline
    pub fn set_unreachable(&self, device_id: &str) {
        self.unreachable.lock().unwrap().push(device_id.to_string());
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectMethodTransport for FakeHub {
    async fn invoke(
        &self,
        _hub: &HubConnection,
        device_id: &str,
        module_id: &str,
        call: &MethodCall,
    ) -> Result<MethodResponse, DomainError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(DomainError::Transport("connection refused".to_string()));
        }
        if self.unreachable.lock().unwrap().iter().any(|d| d == device_id) {
            return Err(DomainError::Transport(format!("{} is not online", device_id)));
        }
        let module = self
            .modules
            .lock()
            .unwrap()
            .get(&(device_id.to_string(), module_id.to_string()))
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("{}/{}", device_id, module_id)))?;
        Ok(module.handle(call).await)
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    devices: Mutex<Vec<DeviceIdentity>>,
    modules: Mutex<HashMap<String, Vec<String>>>,
    created: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn with_devices(devices: Vec<DeviceIdentity>) -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(devices),
            modules: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Module ids the registry reports for `device_id`
    pub fn set_modules(&self, device_id: &str, modules: &[&str]) {
        self.modules.lock().unwrap().insert(
            device_id.to_string(),
            modules.iter().map(|m| m.to_string()).collect(),
        );
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

pub fn edge(device_id: &str) -> DeviceIdentity {
    DeviceIdentity::new(device_id, true)
}

pub fn leaf(device_id: &str) -> DeviceIdentity {
    DeviceIdentity {
        primary_key: Some(format!("{}-key", device_id)),
        ..DeviceIdentity::new(device_id, false)
    }
}

#[async_trait]
impl DeviceRegistry for FakeRegistry {
    async fn list_devices(&self, _hub: &HubConnection) -> Result<Vec<DeviceIdentity>, DomainError> {
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn list_modules(
        &self,
        _hub: &HubConnection,
        device_id: &str,
    ) -> Result<Vec<String>, DomainError> {
        if let Some(modules) = self.modules.lock().unwrap().get(device_id) {
            return Ok(modules.clone());
        }
        Ok(vec!["$edgeAgent".to_string(), "$edgeHub".to_string(), "avaedge".to_string()])
    }

    async fn get_device(
        &self,
        _hub: &HubConnection,
        device_id: &str,
    ) -> Result<DeviceIdentity, DomainError> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.device_id == device_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(device_id.to_string()))
    }

    async fn create_device(
        &self,
        _hub: &HubConnection,
        device_id: &str,
    ) -> Result<DeviceIdentity, DomainError> {
        let device = leaf(device_id);
        self.devices.lock().unwrap().push(device.clone());
        self.created.lock().unwrap().push(device_id.to_string());
        Ok(device)
    }
}

#[derive(Default)]
pub struct MemorySecrets(Mutex<HashMap<String, String>>);

#[async_trait]
impl SecretStore for MemorySecrets {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, secret: &str) -> Result<(), DomainError> {
        self.0.lock().unwrap().insert(key.to_string(), secret.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.0.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryState(Mutex<Option<PersistedHubState>>);

#[async_trait]
impl HubStateStore for MemoryState {
    async fn load(&self) -> Result<Option<PersistedHubState>, DomainError> {
        Ok(self.0.lock().unwrap().clone())
    }

    async fn save(&self, state: &PersistedHubState) -> Result<(), DomainError> {
        *self.0.lock().unwrap() = Some(state.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        *self.0.lock().unwrap() = None;
        Ok(())
    }
}

/// Collects operator output lines
#[derive(Default)]
pub struct MemoryOutput {
    pub info: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl MemoryOutput {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.info.lock().unwrap().clone()
    }
}

impl OutputLog for MemoryOutput {
    fn info(&self, message: &str) {
        self.info.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Scripted prompter; `None` entries (or running out) dismiss the prompt
#[derive(Default)]
pub struct ScriptedPrompter {
    texts: Mutex<Vec<Option<String>>>,
    picks: Mutex<Vec<Option<usize>>>,
    pub offered: Mutex<Vec<Vec<String>>>,
}

impl ScriptedPrompter {
    pub fn new(texts: &[&str], picks: &[usize]) -> Self {
        Self {
            texts: Mutex::new(texts.iter().rev().map(|t| Some(t.to_string())).collect()),
            picks: Mutex::new(picks.iter().rev().map(|p| Some(*p)).collect()),
            offered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WizardPrompter for ScriptedPrompter {
    async fn input_text(&self, _prompt: &str) -> Result<Option<String>, DomainError> {
        Ok(self.texts.lock().unwrap().pop().flatten())
    }

    async fn pick(&self, _prompt: &str, items: &[String]) -> Result<Option<usize>, DomainError> {
        self.offered.lock().unwrap().push(items.to_vec());
        Ok(self.picks.lock().unwrap().pop().flatten())
    }
}

pub struct Harness {
    pub session: Arc<ExplorerSession>,
    pub hub: Arc<FakeHub>,
    pub registry: Arc<FakeRegistry>,
    pub output: Arc<MemoryOutput>,
}

pub fn harness(registry: Arc<FakeRegistry>, settings: SessionSettings) -> Harness {
    let hub = FakeHub::new();
    let output = Arc::new(MemoryOutput::default());
    let session = Arc::new(ExplorerSession::new(
        SessionPorts {
            transport: hub.clone(),
            registry: registry.clone(),
            secrets: Arc::new(MemorySecrets::default()),
            state: Arc::new(MemoryState::default()),
            output: output.clone(),
        },
        settings,
    ));
    Harness {
        session,
        hub,
        registry,
        output,
    }
}

pub fn selection(device_id: &str, modules: &[&str]) -> DeviceSelection {
    DeviceSelection::new(device_id, modules.iter().map(|m| m.to_string()).collect())
}
