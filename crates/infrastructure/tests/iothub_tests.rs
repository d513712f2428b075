use domain::method::{DirectMethodTransport, MethodCall};
use domain::registry::DeviceRegistry;
use domain::{ConnectionString, DomainError, HubConnection};
use infrastructure::{HttpDeviceRegistry, HttpDirectMethodTransport, IotHubClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hub() -> HubConnection {
    HubConnection::new(
        ConnectionString::parse(
            "HostName=hub1.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0",
        )
        .unwrap(),
        Vec::new(),
    )
}

fn client(server: &MockServer) -> IotHubClient {
    IotHubClient::default().with_base_url(server.uri())
}

fn list_call() -> MethodCall {
    MethodCall {
        method_name: "pipelineTopologyList".to_string(),
        payload: json!({"@apiVersion": "1.1"}),
        response_timeout_secs: 10,
        connect_timeout_secs: 10,
    }
}

#[tokio::test]
async fn test_direct_method_posts_envelope_with_sas_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twins/edge-1/modules/avaedge/methods"))
        .and(query_param("api-version", "2021-04-12"))
        .and(header_exists("authorization"))
        .and(body_json(json!({
            "methodName": "pipelineTopologyList",
            "payload": {"@apiVersion": "1.1"},
            "responseTimeoutInSeconds": 10,
            "connectTimeoutInSeconds": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "payload": {"value": [{"name": "t1"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpDirectMethodTransport::new(client(&server));
    let response = transport
        .invoke(&hub(), "edge-1", "avaedge", &list_call())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.payload["value"][0]["name"], "t1");

    let requests = server.received_requests().await.unwrap();
    let token = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(token.starts_with("SharedAccessSignature sr=hub1.azure-devices.net&sig="));
    assert!(token.ends_with("&skn=iothubowner"));
}

#[tokio::test]
async fn test_module_rejection_is_returned_as_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 400,
            "payload": {"error": {"code": "InvalidInput", "message": "bad"}}
        })))
        .mount(&server)
        .await;

    let response = HttpDirectMethodTransport::new(client(&server))
        .invoke(&hub(), "edge-1", "avaedge", &list_call())
        .await
        .unwrap();

    assert_eq!(response.status, 400);
    assert_eq!(response.payload["error"]["message"], "bad");
}

#[tokio::test]
async fn test_unknown_module_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"Message":"{\"errorCode\":404010,\"message\":\"Module not found\"}"}"#,
        ))
        .mount(&server)
        .await;

    let err = HttpDirectMethodTransport::new(client(&server))
        .invoke(&hub(), "edge-1", "nope", &list_call())
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_offline_device_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"Message":"{\"errorCode\":404103,\"message\":\"Timed out waiting for device to connect.\"}","ExceptionMessage":""}"#,
        ))
        .mount(&server)
        .await;

    let err = HttpDirectMethodTransport::new(client(&server))
        .invoke(&hub(), "edge-1", "avaedge", &list_call())
        .await
        .unwrap_err();

    match err {
        DomainError::Transport(message) => assert!(message.contains("not online")),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gateway_failure_and_bad_body_are_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twins/edge-1/modules/avaedge/methods"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/twins/edge-2/modules/avaedge/methods"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let transport = HttpDirectMethodTransport::new(client(&server));

    let gateway = transport.invoke(&hub(), "edge-1", "avaedge", &list_call()).await;
    let malformed = transport.invoke(&hub(), "edge-2", "avaedge", &list_call()).await;

    assert!(matches!(gateway, Err(DomainError::Transport(_))));
    assert!(matches!(malformed, Err(DomainError::Transport(_))));
}

#[tokio::test]
async fn test_unreachable_hub_is_transport_error() {
    // Bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = HttpDirectMethodTransport::new(IotHubClient::default().with_base_url(uri))
        .invoke(&hub(), "edge-1", "avaedge", &list_call())
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Transport(_)));
}

#[tokio::test]
async fn test_device_query_follows_continuation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/devices/query"))
        .and(header("x-ms-continuation", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"deviceId": "cam-1", "capabilities": {"iotEdge": false}}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/query"))
        .and(body_json(json!({"query": "SELECT * FROM devices"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ms-continuation", "page-2")
                .set_body_json(json!([
                    {"deviceId": "edge-1", "capabilities": {"iotEdge": true}}
                ])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let devices = HttpDeviceRegistry::new(client(&server))
        .list_devices(&hub())
        .await
        .unwrap();

    let summary: Vec<(String, bool)> = devices.into_iter().map(|d| (d.device_id, d.is_edge)).collect();
    assert_eq!(
        summary,
        vec![("edge-1".to_string(), true), ("cam-1".to_string(), false)]
    );
}

#[tokio::test]
async fn test_list_modules_and_get_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/edge-1/modules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"moduleId": "$edgeAgent"},
            {"moduleId": "avaedge"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices/cam-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deviceId": "cam-1",
            "authentication": {"type": "sas", "symmetricKey": {"primaryKey": "pk==", "secondaryKey": "sk=="}}
        })))
        .mount(&server)
        .await;
    let registry = HttpDeviceRegistry::new(client(&server));

    let modules = registry.list_modules(&hub(), "edge-1").await.unwrap();
    let device = registry.get_device(&hub(), "cam-1").await.unwrap();
    let missing = registry.get_device(&hub(), "ghost").await.unwrap_err();

    assert_eq!(modules, vec!["$edgeAgent".to_string(), "avaedge".to_string()]);
    assert_eq!(device.primary_key.as_deref(), Some("pk=="));
    assert!(!device.is_edge);
    assert!(matches!(missing, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_create_device_requests_sas_identity() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/devices/cam-new"))
        .and(body_json(json!({"deviceId": "cam-new", "authentication": {"type": "sas"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deviceId": "cam-new",
            "authentication": {"type": "sas", "symmetricKey": {"primaryKey": "generated"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let device = HttpDeviceRegistry::new(client(&server))
        .create_device(&hub(), "cam-new")
        .await
        .unwrap();

    assert_eq!(device.device_id, "cam-new");
    assert_eq!(device.primary_key.as_deref(), Some("generated"));
}

#[tokio::test]
async fn test_stalled_registry_call_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/edge-1/modules"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let registry = HttpDeviceRegistry::new(
        client(&server).with_request_timeout(std::time::Duration::from_millis(200)),
    );
    let err = registry.list_modules(&hub(), "edge-1").await.unwrap_err();

    assert!(matches!(err, DomainError::Transport(_)));
}
