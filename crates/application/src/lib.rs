//! Application layer - Use cases over the domain ports
//!
//! - Remote invocation client and per-resource command services
//! - Module API negotiation
//! - Explorer tree, refresh bus and auto-refresh scheduler
//! - Session lifecycle, operator commands and the adapter wizard

pub mod commands;
pub mod credentials;
pub mod discovery;
pub mod invocation;
pub mod scheduler;
pub mod services;
pub mod session;
pub mod tree;
pub mod wizard;

pub use commands::{CommandError, ExplorerCommands, ModuleTarget};
pub use credentials::CredentialManager;
pub use discovery::{ModuleDiscovery, ScanReport};
pub use invocation::{InvocationTimeouts, RemoteInvocationClient};
pub use scheduler::AutoRefreshScheduler;
pub use services::{LivePipelineService, RemoteDeviceAdapterService, ResourceService, TopologyService};
pub use session::{ExplorerSession, SessionPorts, SessionSettings};
pub use tree::{ExplorerTree, RefreshBus, RefreshReason, RefreshTarget, TreeLoader};
pub use wizard::AdapterWizardDriver;
