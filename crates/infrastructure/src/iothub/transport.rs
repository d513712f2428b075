use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, warn};

use domain::method::{DirectMethodTransport, MethodCall, MethodResponse};
use domain::{DomainError, HubConnection};

use super::auth::encode_component;
use super::client::{IotHubClient, check_status, json, send};

/// Extra time allowed on top of the hub-side timeouts before giving up locally
const TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Invokes module direct methods through the hub's REST endpoint
#[derive(Debug, Clone, Default)]
pub struct HttpDirectMethodTransport {
    client: IotHubClient,
}

impl HttpDirectMethodTransport {
    pub fn new(client: IotHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DirectMethodTransport for HttpDirectMethodTransport {
    async fn invoke(
        &self,
        hub: &HubConnection,
        device_id: &str,
        module_id: &str,
        call: &MethodCall,
    ) -> Result<MethodResponse, DomainError> {
        let path = format!(
            "/twins/{}/modules/{}/methods",
            encode_component(device_id),
            encode_component(module_id)
        );
        let timeout = Duration::from_secs(call.connect_timeout_secs + call.response_timeout_secs)
            + TIMEOUT_SLACK;

        let request = self
            .client
            .request(hub, Method::POST, &path)?
            .timeout(timeout)
            .json(call);

        let response = send(request).await.inspect_err(|e| {
            warn!(device_id = %device_id, module_id = %module_id, method = %call.method_name, error = %e, "Direct method request failed");
        })?;
        let what = format!("Direct method {} on {}/{}", call.method_name, device_id, module_id);
        let response: MethodResponse = json(check_status(response, &what).await?).await?;

        debug!(
            device_id = %device_id,
            module_id = %module_id,
            method = %call.method_name,
            status = response.status,
            "Direct method completed"
        );
        Ok(response)
    }
}
