use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Resource;
use crate::method::ResourceKind;

/// Named pipeline template hosted by a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub name: String,
    #[serde(default)]
    pub properties: TopologyProperties,
    #[serde(rename = "systemData", default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<Value>,
    /// Fields this model does not name, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopologyProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    #[serde(default)]
    pub sources: Vec<TopologyNode>,
    #[serde(default)]
    pub processors: Vec<TopologyNode>,
    #[serde(default)]
    pub sinks: Vec<TopologyNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parameter a live pipeline may bind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A source, processor or sink node.
/// Node-specific settings are kept verbatim so nothing is lost on round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyNode {
    #[serde(rename = "@type")]
    pub node_type: String,
    pub name: String,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Topology {
    pub fn new(name: impl Into<String>, properties: TopologyProperties) -> Self {
        Self {
            name: name.into(),
            properties,
            system_data: None,
            extra: Map::new(),
        }
    }

    /// All source, processor and sink nodes in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.properties
            .sources
            .iter()
            .chain(self.properties.processors.iter())
            .chain(self.properties.sinks.iter())
    }

    pub fn find_node(&self, name: &str) -> Option<&TopologyNode> {
        self.nodes().find(|node| node.name == name)
    }
}

impl Resource for Topology {
    const KIND: ResourceKind = ResourceKind::Topology;

    fn name(&self) -> &str {
        &self.name
    }
}
