//! Operator commands.
//!
//! Each mutation goes through the matching resource service once. On success
//! one refresh is published; on failure nothing is refreshed, the decoded
//! diagnostics go to the output log and a condensed [`CommandError`] is
//! returned.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use domain::diagnostic::decode;
use domain::{
    Diagnostic, DomainError, LivePipeline, ModuleDetails, PipelineState, RemoteDeviceAdapter,
    Resource, Topology,
};

use crate::services::ResourceService;
use crate::session::ExplorerSession;
use crate::tree::RefreshReason;

#[derive(Debug, Error)]
#[error("{summary}")]
pub struct CommandError {
    pub summary: String,
    pub diagnostics: Vec<Diagnostic>,
    #[source]
    pub source: DomainError,
}

impl CommandError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, DomainError::Cancelled)
    }
}

/// Identifies one module for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTarget {
    pub device_id: String,
    pub module_id: String,
}

impl ModuleTarget {
    pub fn new(device_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            module_id: module_id.into(),
        }
    }
}

pub struct ExplorerCommands {
    session: Arc<ExplorerSession>,
}

impl ExplorerCommands {
    pub fn new(session: Arc<ExplorerSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<ExplorerSession> {
        &self.session
    }

    pub fn refresh(&self) {
        self.session.refresh();
    }

    // Topologies

    pub async fn list_topologies(&self, target: &ModuleTarget) -> Result<Vec<Topology>, CommandError> {
        self.list(self.session.topologies(), target).await
    }

    pub async fn show_topology(&self, target: &ModuleTarget, name: &str) -> Result<String, CommandError> {
        self.show(self.session.topologies(), target, name).await
    }

    pub async fn save_topology(
        &self,
        target: &ModuleTarget,
        topology: &Topology,
    ) -> Result<Vec<Topology>, CommandError> {
        self.save(self.session.topologies(), target, topology).await
    }

    pub async fn delete_topology(&self, target: &ModuleTarget, name: &str) -> Result<(), CommandError> {
        self.delete(self.session.topologies(), target, name).await
    }

    // Live pipelines

    pub async fn list_pipelines(&self, target: &ModuleTarget) -> Result<Vec<LivePipeline>, CommandError> {
        self.list(self.session.pipelines(), target).await
    }

    pub async fn show_pipeline(&self, target: &ModuleTarget, name: &str) -> Result<String, CommandError> {
        self.show(self.session.pipelines(), target, name).await
    }

    pub async fn save_pipeline(
        &self,
        target: &ModuleTarget,
        pipeline: &LivePipeline,
    ) -> Result<Vec<LivePipeline>, CommandError> {
        self.save(self.session.pipelines(), target, pipeline).await
    }

    pub async fn delete_pipeline(&self, target: &ModuleTarget, name: &str) -> Result<(), CommandError> {
        self.delete(self.session.pipelines(), target, name).await
    }

    pub async fn activate_pipeline(&self, target: &ModuleTarget, name: &str) -> Result<(), CommandError> {
        self.transition(target, name, PipelineState::Activating, "activate", |module| async move {
            let hub = self.session.connection()?;
            self.session.pipelines().activate(&hub, &module, name).await
        })
        .await
    }

    pub async fn deactivate_pipeline(&self, target: &ModuleTarget, name: &str) -> Result<(), CommandError> {
        self.transition(target, name, PipelineState::Deactivating, "deactivate", |module| async move {
            let hub = self.session.connection()?;
            self.session.pipelines().deactivate(&hub, &module, name).await
        })
        .await
    }

    // Remote device adapters

    pub async fn list_adapters(
        &self,
        target: &ModuleTarget,
    ) -> Result<Vec<RemoteDeviceAdapter>, CommandError> {
        self.list(self.session.adapters(), target).await
    }

    pub async fn show_adapter(&self, target: &ModuleTarget, name: &str) -> Result<String, CommandError> {
        self.show(self.session.adapters(), target, name).await
    }

    pub async fn save_adapter(
        &self,
        target: &ModuleTarget,
        adapter: &RemoteDeviceAdapter,
    ) -> Result<Vec<RemoteDeviceAdapter>, CommandError> {
        self.save(self.session.adapters(), target, adapter).await
    }

    pub async fn delete_adapter(&self, target: &ModuleTarget, name: &str) -> Result<(), CommandError> {
        self.delete(self.session.adapters(), target, name).await
    }

    /// Report a failure the same way every command does
    pub fn fail(&self, summary: String, request: Option<&Value>, error: DomainError) -> CommandError {
        let diagnostics = match error.remote_error() {
            Some(remote) => decode(remote, request),
            None => vec![Diagnostic::new(error.to_string())],
        };

        let output = self.session.output();
        output.error(&summary);
        for diagnostic in &diagnostics {
            output.error(&format!("  {}", diagnostic));
        }

        CommandError {
            summary,
            diagnostics,
            source: error,
        }
    }

    async fn list<R: Resource>(
        &self,
        service: &ResourceService<R>,
        target: &ModuleTarget,
    ) -> Result<Vec<R>, CommandError> {
        let summary = || format!("Failed to list {}", R::KIND.plural_label().to_lowercase());
        let module = self.module(target).await.map_err(|e| self.fail(summary(), None, e))?;
        let hub = self.session.connection().map_err(|e| self.fail(summary(), None, e))?;
        service
            .list(&hub, &module)
            .await
            .map_err(|e| self.fail(summary(), None, e))
    }

    async fn show<R: Resource>(
        &self,
        service: &ResourceService<R>,
        target: &ModuleTarget,
        name: &str,
    ) -> Result<String, CommandError> {
        let summary = || format!("Failed to show {} '{}'", R::KIND, name);
        let module = self.module(target).await.map_err(|e| self.fail(summary(), None, e))?;
        let hub = self.session.connection().map_err(|e| self.fail(summary(), None, e))?;
        let resource = service
            .get(&hub, &module, name)
            .await
            .map_err(|e| self.fail(summary(), None, e))?;
        serde_json::to_string_pretty(&resource)
            .map_err(|e| self.fail(summary(), None, DomainError::InvalidResource(e.to_string())))
    }

    async fn save<R: Resource>(
        &self,
        service: &ResourceService<R>,
        target: &ModuleTarget,
        resource: &R,
    ) -> Result<Vec<R>, CommandError> {
        let summary = || format!("Failed to save {} '{}'", R::KIND, resource.name());
        let request = serde_json::to_value(resource).ok();
        let module = self.module(target).await.map_err(|e| self.fail(summary(), None, e))?;
        let hub = self.session.connection().map_err(|e| self.fail(summary(), None, e))?;

        let saved = service
            .put(&hub, &module, resource)
            .await
            .map_err(|e| self.fail(summary(), request.as_ref(), e))?;

        self.succeeded(&format!("Saved {} '{}'", R::KIND, resource.name()));
        Ok(saved)
    }

    async fn delete<R: Resource>(
        &self,
        service: &ResourceService<R>,
        target: &ModuleTarget,
        name: &str,
    ) -> Result<(), CommandError> {
        let summary = || format!("Failed to delete {} '{}'", R::KIND, name);
        let module = self.module(target).await.map_err(|e| self.fail(summary(), None, e))?;
        let hub = self.session.connection().map_err(|e| self.fail(summary(), None, e))?;

        service
            .delete(&hub, &module, name)
            .await
            .map_err(|e| self.fail(summary(), None, e))?;

        self.succeeded(&format!("Deleted {} '{}'", R::KIND, name));
        Ok(())
    }

    async fn transition<'a, F, Fut>(
        &'a self,
        target: &ModuleTarget,
        name: &'a str,
        pending: PipelineState,
        verb: &str,
        call: F,
    ) -> Result<(), CommandError>
    where
        F: FnOnce(ModuleDetails) -> Fut,
        Fut: Future<Output = Result<(), DomainError>> + 'a,
    {
        let summary = || format!("Failed to {} {} '{}'", verb, LivePipeline::KIND, name);
        let module = self.module(target).await.map_err(|e| self.fail(summary(), None, e))?;

        let tree = self.session.tree();
        tree.set_pipeline_state(&module, name, pending);
        debug!(module = %module, name = %name, state = %pending, "Optimistic pipeline state");

        if let Err(e) = call(module.clone()).await {
            tree.clear_pipeline_state(&module, name);
            return Err(self.fail(summary(), None, e));
        }

        self.succeeded(&format!("Requested {} of {} '{}'", verb, LivePipeline::KIND, name));
        Ok(())
    }

    async fn module(&self, target: &ModuleTarget) -> Result<ModuleDetails, DomainError> {
        self.session.module(&target.device_id, &target.module_id).await
    }

    fn succeeded(&self, message: &str) {
        info!("{}", message);
        self.session.output().info(message);
        self.session.bus().publish(RefreshReason::Mutation);
    }
}
