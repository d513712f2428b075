//! Infrastructure layer - External integrations

pub mod config;
pub mod iothub;
pub mod output;
pub mod stores;

pub use config::ExplorerConfig;
pub use iothub::{HttpDeviceRegistry, HttpDirectMethodTransport, IotHubClient};
pub use output::TracingOutputLog;
pub use stores::{FileSecretStore, JsonFileHubStateStore};
