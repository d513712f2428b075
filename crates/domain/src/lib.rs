//! Domain layer - Pure model of the pipeline explorer with no I/O
//!
//! This crate contains:
//! - Resources (Topology, LivePipeline, RemoteDeviceAdapter)
//! - Module identity and API generation (ModuleDetails, ApiVersion)
//! - The method-name table used to address each module generation
//! - Remote error decoding into operator diagnostics
//! - Tree node variants and their load state machine
//! - Ports (traits) implemented by the infrastructure layer
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Wire shapes are typed; loose JSON stays at the edges
//! - Testable in isolation

pub mod diagnostic;
pub mod error;
pub mod hub;
pub mod method;
pub mod module;
pub mod output;
pub mod registry;
pub mod resource;
pub mod tree;
pub mod wizard;

// Re-export commonly used types
pub use diagnostic::{Diagnostic, ErrorDetail, RemoteError};
pub use error::DomainError;
pub use hub::{ConnectionString, DeviceSelection, HubConnection};
pub use method::{Operation, ResourceKind};
pub use module::{ApiVersion, ModuleDetails, ModuleGeneration};
pub use resource::{LivePipeline, PipelineState, RemoteDeviceAdapter, Resource, Topology};
pub use tree::{NodeState, TreeNode};
