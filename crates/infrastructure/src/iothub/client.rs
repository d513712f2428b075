use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use domain::{DomainError, HubConnection};

use super::auth::{DEFAULT_TOKEN_TTL, sas_token_from_now};

pub const DEFAULT_SERVICE_API_VERSION: &str = "2021-04-12";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Applied to every request that does not set its own timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Hub error codes for a device that exists but has no live connection
const DEVICE_OFFLINE_CODES: [&str; 2] = ["404103", "404104"];

/// Authenticated HTTPS access to one hub's service API.
///
/// `base_url` replaces `https://{host}` when set; used to point at a local
/// server in tests.
#[derive(Debug, Clone)]
pub struct IotHubClient {
    http: Client,
    api_version: String,
    base_url: Option<String>,
    token_ttl: Duration,
    request_timeout: Duration,
}

impl Default for IotHubClient {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_API_VERSION)
    }
}

impl IotHubClient {
    pub fn new(api_version: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });
        Self {
            http,
            api_version: api_version.into(),
            base_url: None,
            token_ttl: DEFAULT_TOKEN_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn url(&self, hub: &HubConnection, path: &str) -> String {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{}", hub.host_name()),
        };
        format!("{}{}?api-version={}", base, path, self.api_version)
    }

    pub fn request(
        &self,
        hub: &HubConnection,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, DomainError> {
        let token = sas_token_from_now(hub.connection_string(), self.token_ttl)?;
        let url = self.url(hub, path);
        debug!(%method, %url, "IoT Hub request");
        Ok(self
            .http
            .request(method, url)
            .timeout(self.request_timeout)
            .header(reqwest::header::AUTHORIZATION, token))
    }
}

pub async fn send(request: RequestBuilder) -> Result<Response, DomainError> {
    request
        .send()
        .await
        .map_err(|e| DomainError::Transport(e.to_string()))
}

/// Fail non-success statuses.
///
/// 404 becomes [`DomainError::NotFound`] unless the hub says the device is
/// registered but offline, which is a [`DomainError::Transport`] failure.
pub async fn check_status(response: Response, what: &str) -> Result<Response, DomainError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        if device_offline(&body) {
            return Err(DomainError::Transport(format!("{}: device is not online: {}", what, body)));
        }
        return Err(DomainError::NotFound(format!("{}: {}", what, body)));
    }
    Err(DomainError::Transport(format!(
        "{} failed with HTTP {}: {}",
        what,
        status.as_u16(),
        body
    )))
}

pub async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, DomainError> {
    response
        .json::<T>()
        .await
        .map_err(|e| DomainError::Transport(format!("Malformed response body: {}", e)))
}

/// The hub nests its error JSON inside a `Message` string, so match on the
/// raw text rather than parsing it.
fn device_offline(body: &str) -> bool {
    body.contains("DeviceNotOnline") || DEVICE_OFFLINE_CODES.iter().any(|code| body.contains(code))
}
