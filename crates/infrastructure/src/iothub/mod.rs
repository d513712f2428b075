//! IoT Hub service API: SAS auth, direct methods and the identity registry

pub mod auth;
mod client;
mod registry;
mod transport;

pub use client::{DEFAULT_SERVICE_API_VERSION, IotHubClient};
pub use registry::HttpDeviceRegistry;
pub use transport::HttpDirectMethodTransport;
