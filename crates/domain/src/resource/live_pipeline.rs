use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Resource;
use crate::method::ResourceKind;

/// Run state of a live pipeline.
///
/// Legacy modules report `Active`, current ones `active`; parsing ignores case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PipelineState {
    Active,
    Inactive,
    Activating,
    Deactivating,
    #[default]
    Unknown,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Activating => "activating",
            Self::Deactivating => "deactivating",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Activating | Self::Deactivating)
    }
}

impl From<String> for PipelineState {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "activating" => Self::Activating,
            "deactivating" => Self::Deactivating,
            _ => Self::Unknown,
        }
    }
}

impl From<PipelineState> for String {
    fn from(value: PipelineState) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter binding supplied when instantiating a topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

/// Instance of a topology (a.k.a. graph instance)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePipeline {
    pub name: String,
    pub properties: LivePipelineProperties,
    #[serde(rename = "systemData", default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePipelineProperties {
    #[serde(rename = "topologyName")]
    pub topology_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterValue>,
    #[serde(rename = "bitrateKbps", default, skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(default, skip_serializing_if = "PipelineState::is_unknown")]
    pub state: PipelineState,
    /// Fields this model does not name, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LivePipeline {
    pub fn new(name: impl Into<String>, topology_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: LivePipelineProperties {
                topology_name: topology_name.into(),
                description: None,
                parameters: Vec::new(),
                bitrate_kbps: None,
                state: PipelineState::Unknown,
                extra: Map::new(),
            },
            system_data: None,
            extra: Map::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.parameters.push(ParameterValue {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn topology_name(&self) -> &str {
        &self.properties.topology_name
    }

    pub fn state(&self) -> PipelineState {
        self.properties.state
    }
}

impl Resource for LivePipeline {
    const KIND: ResourceKind = ResourceKind::LivePipeline;

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_parsing_ignores_case() {
        let legacy: LivePipeline = serde_json::from_value(json!({
            "name": "p1",
            "properties": {"topologyName": "t1", "state": "Active"}
        }))
        .unwrap();
        let current: LivePipeline = serde_json::from_value(json!({
            "name": "p2",
            "properties": {"topologyName": "t1", "state": "inactive"}
        }))
        .unwrap();

        assert_eq!(legacy.state(), PipelineState::Active);
        assert_eq!(current.state(), PipelineState::Inactive);
    }

    #[test]
    fn test_unrecognized_state_is_unknown() {
        let pipeline: LivePipeline = serde_json::from_value(json!({
            "name": "p1",
            "properties": {"topologyName": "t1", "state": "Exploding"}
        }))
        .unwrap();
        assert_eq!(pipeline.state(), PipelineState::Unknown);
    }

    #[test]
    fn test_new_pipeline_omits_unknown_state() {
        let pipeline = LivePipeline::new("p1", "t1").with_parameter("rtspUrl", "rtsp://cam");
        let value = serde_json::to_value(&pipeline).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "p1",
                "properties": {
                    "topologyName": "t1",
                    "parameters": [{"name": "rtspUrl", "value": "rtsp://cam"}]
                }
            })
        );
    }

    #[test]
    fn test_unmodelled_fields_survive_round_trip() {
        let pipeline: LivePipeline = serde_json::from_value(json!({
            "name": "p1",
            "properties": {"topologyName": "t1", "state": "Active", "extra": 5}
        }))
        .unwrap();

        let out = serde_json::to_value(&pipeline).unwrap();
        assert_eq!(out["properties"]["extra"], 5);
        assert_eq!(out["properties"]["state"], "active");
        assert_eq!(out["properties"]["topologyName"], "t1");
    }

    #[test]
    fn test_transitioning_states() {
        assert!(PipelineState::Activating.is_transitioning());
        assert!(PipelineState::Deactivating.is_transitioning());
        assert!(!PipelineState::Active.is_transitioning());
    }
}
