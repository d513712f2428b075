mod support;

use std::sync::Arc;

use application::{ExplorerCommands, ModuleTarget, RefreshReason, SessionSettings};
use domain::resource::{TopologyNode, TopologyProperties};
use domain::{ApiVersion, DomainError, LivePipeline, PipelineState, ResourceKind, Topology, TreeNode};
use serde_json::{Map, json};
use support::*;
use tokio::sync::broadcast::error::TryRecvError;

async fn setup(module: Arc<FakeModule>) -> (Harness, ExplorerCommands) {
    let h = harness(FakeRegistry::with_devices(vec![edge("edge-1")]), SessionSettings::default());
    h.hub.install("edge-1", "avaedge", module);
    h.session
        .connect(CONNECTION_STRING, vec![selection("edge-1", &["avaedge"])])
        .await
        .unwrap();
    let commands = ExplorerCommands::new(h.session.clone());
    (h, commands)
}

fn target() -> ModuleTarget {
    ModuleTarget::new("edge-1", "avaedge")
}

fn topology(name: &str) -> Topology {
    Topology::new(
        name,
        TopologyProperties {
            sources: vec![TopologyNode {
                node_type: "#Microsoft.VideoAnalyzer.RtspSource".to_string(),
                name: "src1".to_string(),
                settings: Map::new(),
            }],
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_put_topology_refreshes_tree() {
    let module = FakeModule::new(ApiVersion::V1_1).with_topology("t0");
    let (h, commands) = setup(module.clone()).await;
    let mut refreshes = h.session.bus().subscribe();
    let list = TreeNode::ResourceList {
        hub: h.session.connection().unwrap(),
        module: h.session.module("edge-1", "avaedge").await.unwrap(),
        kind: ResourceKind::Topology,
    };
    assert_eq!(h.session.children(&list).await.len(), 1);

    let saved = commands.save_topology(&target(), &topology("t1")).await.unwrap();

    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].name, "t1");
    assert_eq!(refreshes.try_recv().unwrap(), RefreshReason::Mutation);
    assert!(matches!(refreshes.try_recv(), Err(TryRecvError::Empty)));

    let labels: Vec<String> = h.session.children(&list).await.iter().map(TreeNode::label).collect();
    assert_eq!(labels, vec!["t0".to_string(), "t1".to_string()]);

    let (_, payload) = module.calls().into_iter().find(|(m, _)| m == "pipelineTopologySet").unwrap();
    assert_eq!(payload["@apiVersion"], "1.1");
    assert_eq!(payload["name"], "t1");
}

#[tokio::test]
async fn test_activate_with_missing_topology_fails_without_refresh() {
    let module = FakeModule::new(ApiVersion::V1_1).with_pipeline("p1", "missing-topology", "inactive");
    let (h, commands) = setup(module).await;
    let mut refreshes = h.session.bus().subscribe();

    let err = commands.activate_pipeline(&target(), "p1").await.unwrap_err();

    assert!(matches!(err.source, DomainError::RemoteOperation(_)));
    assert!(err.summary.contains("p1"));
    assert!(err.diagnostics[0].message.contains("p1"));
    assert!(matches!(refreshes.try_recv(), Err(TryRecvError::Empty)));
    assert!(h.output.errors().iter().any(|line| line.contains("p1")));
}

#[tokio::test]
async fn test_activate_and_deactivate_pipeline() {
    let module = FakeModule::new(ApiVersion::V1_1)
        .with_topology("t1")
        .with_pipeline("p1", "t1", "inactive");
    let (h, commands) = setup(module).await;
    let mut refreshes = h.session.bus().subscribe();

    commands.activate_pipeline(&target(), "p1").await.unwrap();
    assert_eq!(refreshes.try_recv().unwrap(), RefreshReason::Mutation);
    let pipelines = commands.list_pipelines(&target()).await.unwrap();
    assert_eq!(pipelines[0].state(), PipelineState::Active);

    commands.deactivate_pipeline(&target(), "p1").await.unwrap();
    let pipelines = commands.list_pipelines(&target()).await.unwrap();
    assert_eq!(pipelines[0].state(), PipelineState::Inactive);
}

#[tokio::test]
async fn test_legacy_module_uses_graph_methods() {
    let module = FakeModule::new(ApiVersion::V2_0).with_topology("t1");
    let (_h, commands) = setup(module.clone()).await;

    commands
        .save_pipeline(&target(), &LivePipeline::new("p1", "t1").with_parameter("rtspUrl", "rtsp://cam"))
        .await
        .unwrap();
    commands.activate_pipeline(&target(), "p1").await.unwrap();

    assert_eq!(module.call_count("GraphInstanceSet"), 1);
    assert_eq!(module.call_count("GraphInstanceActivate"), 1);
    let pipelines = commands.list_pipelines(&target()).await.unwrap();
    assert_eq!(pipelines[0].state(), PipelineState::Active);
}

#[tokio::test]
async fn test_validation_error_is_decoded_against_request() {
    let module = FakeModule::new(ApiVersion::V1_1);
    module.fail_method(
        "pipelineTopologySet",
        json!({
            "code": "InvalidInput",
            "message": "Validation failed",
            "details": [{"message": "Unknown source type", "target": "properties.sources.0.@type"}]
        }),
    );
    let (h, commands) = setup(module).await;

    let err = commands.save_topology(&target(), &topology("t1")).await.unwrap_err();

    assert_eq!(err.summary, "Failed to save topology 't1'");
    assert_eq!(err.diagnostics.len(), 2);
    assert_eq!(err.diagnostics[0].message, "Validation failed");
    assert_eq!(err.diagnostics[1].node_name.as_deref(), Some("src1"));
    assert_eq!(err.diagnostics[1].field_path.as_deref(), Some("@type"));
    assert_eq!(
        h.output.errors(),
        vec![
            "Failed to save topology 't1'".to_string(),
            "  Validation failed".to_string(),
            "  Unknown source type (node 'src1', field '@type')".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_invalid_name_rejected_before_any_call() {
    let module = FakeModule::new(ApiVersion::V1_1);
    let (_h, commands) = setup(module.clone()).await;
    commands.list_topologies(&target()).await.unwrap();
    module.reset_calls();

    let err = commands.save_topology(&target(), &topology("bad name")).await.unwrap_err();

    assert!(matches!(err.source, DomainError::InvalidResource(_)));
    assert!(module.calls().is_empty());
}

#[tokio::test]
async fn test_show_and_delete_topology() {
    let module = FakeModule::new(ApiVersion::V1_1).with_topology("t1");
    let (_h, commands) = setup(module).await;

    let shown = commands.show_topology(&target(), "t1").await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(value["name"], "t1");

    commands.delete_topology(&target(), "t1").await.unwrap();

    let err = commands.show_topology(&target(), "t1").await.unwrap_err();
    assert!(matches!(err.source, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_adapter_commands_require_api_1_1() {
    let module = FakeModule::new(ApiVersion::V1_0);
    let (_h, commands) = setup(module).await;

    let err = commands.list_adapters(&target()).await.unwrap_err();

    assert!(matches!(err.source, DomainError::RemoteOperation(_)));
}

#[tokio::test]
async fn test_commands_after_reset_report_not_connected() {
    let module = FakeModule::new(ApiVersion::V1_1);
    let (h, commands) = setup(module).await;
    let mut refreshes = h.session.bus().subscribe();

    h.session.reset().await.unwrap();

    assert_eq!(refreshes.try_recv().unwrap(), RefreshReason::Reset);
    assert!(matches!(h.session.root(), Err(DomainError::NotConnected)));
    let err = commands.list_topologies(&target()).await.unwrap_err();
    assert!(matches!(err.source, DomainError::NotConnected));
}
