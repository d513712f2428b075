use serde::{Deserialize, Serialize};

/// Protocol version carried as `@apiVersion` in every direct-method payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiVersion {
    #[serde(rename = "1.0")]
    V1_0,
    #[serde(rename = "1.1")]
    V1_1,
    /// Legacy (graph-based) module generation
    #[serde(rename = "2.0")]
    V2_0,
}

impl ApiVersion {
    /// Order tried when negotiating with an unknown module
    pub const NEGOTIATION_ORDER: [ApiVersion; 3] = [Self::V1_1, Self::V1_0, Self::V2_0];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
            Self::V2_0 => "2.0",
        }
    }

    pub fn generation(&self) -> ModuleGeneration {
        match self {
            Self::V2_0 => ModuleGeneration::Legacy,
            Self::V1_0 | Self::V1_1 => ModuleGeneration::Current,
        }
    }

    /// Remote device adapters first shipped with 1.1
    pub fn supports_remote_device_adapters(&self) -> bool {
        matches!(self, Self::V1_1)
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two method-name families a module may speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleGeneration {
    /// `GraphTopology*` / `GraphInstance*`
    Legacy,
    /// `pipelineTopology*` / `livePipeline*` / `remoteDeviceAdapter*`
    Current,
}

impl ModuleGeneration {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy)
    }
}

/// One discovered (device, module) pair and the API it speaks.
///
/// Immutable once discovered; a version change means rediscovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDetails {
    #[serde(rename = "deviceId")]
    device_id: String,
    #[serde(rename = "moduleId")]
    module_id: String,
    #[serde(rename = "legacyModule")]
    legacy_module: bool,
    #[serde(rename = "apiVersion")]
    api_version: ApiVersion,
}

impl ModuleDetails {
    pub fn new(
        device_id: impl Into<String>,
        module_id: impl Into<String>,
        api_version: ApiVersion,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            module_id: module_id.into(),
            legacy_module: api_version.generation().is_legacy(),
            api_version,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn legacy_module(&self) -> bool {
        self.legacy_module
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    pub fn generation(&self) -> ModuleGeneration {
        self.api_version.generation()
    }
}

impl std::fmt::Display for ModuleDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_id, self.module_id)
    }
}
