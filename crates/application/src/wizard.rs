use tracing::{debug, info};

use domain::method::Operation;
use domain::wizard::{AdapterPlan, AdapterWizard, DeviceChoice, WizardInput, WizardPrompter, WizardStep};
use domain::{DomainError, HubConnection, RemoteDeviceAdapter, ResourceKind};

use crate::commands::{CommandError, ExplorerCommands, ModuleTarget};

pub const CREATE_NEW_DEVICE: &str = "Create new device";

/// Drives [`AdapterWizard`] with operator prompts, provisions the device
/// identity and saves the resulting adapter.
pub struct AdapterWizardDriver<'a> {
    commands: &'a ExplorerCommands,
    prompter: &'a dyn WizardPrompter,
}

impl<'a> AdapterWizardDriver<'a> {
    pub fn new(commands: &'a ExplorerCommands, prompter: &'a dyn WizardPrompter) -> Self {
        Self { commands, prompter }
    }

    pub async fn run(&self, target: &ModuleTarget) -> Result<RemoteDeviceAdapter, CommandError> {
        let summary = "Failed to create remote device adapter";
        match self.collect(target).await {
            Ok(adapter) => {
                self.commands.save_adapter(target, &adapter).await?;
                Ok(adapter)
            }
            Err(DomainError::Cancelled) => {
                info!("Remote device adapter wizard cancelled");
                self.commands
                    .session()
                    .output()
                    .info("Remote device adapter creation cancelled");
                Err(CommandError {
                    summary: "Remote device adapter creation cancelled".to_string(),
                    diagnostics: Vec::new(),
                    source: DomainError::Cancelled,
                })
            }
            Err(e) => Err(self.commands.fail(summary.to_string(), None, e)),
        }
    }

    async fn collect(&self, target: &ModuleTarget) -> Result<RemoteDeviceAdapter, DomainError> {
        let session = self.commands.session();
        let module = session.module(&target.device_id, &target.module_id).await?;
        if !module.api_version().supports_remote_device_adapters() {
            return Err(DomainError::UnsupportedOperation {
                operation: Operation::Put,
                kind: ResourceKind::RemoteDeviceAdapter,
            });
        }
        let hub = session.connection()?;

        let plan = self.prompt(&hub).await?;
        debug!(?plan, "Wizard completed");

        let device = if plan.create_device {
            session.registry().create_device(&hub, &plan.device_id).await?
        } else {
            session.registry().get_device(&hub, &plan.device_id).await?
        };
        let key = device.primary_key.ok_or_else(|| {
            DomainError::InvalidResource(format!(
                "Device {} has no symmetric key",
                plan.device_id
            ))
        })?;

        Ok(RemoteDeviceAdapter::new(plan.name, plan.host, plan.device_id, key))
    }

    async fn prompt(&self, hub: &HubConnection) -> Result<AdapterPlan, DomainError> {
        let mut wizard = AdapterWizard::new();
        let output = self.commands.session().output();

        while wizard.step() != WizardStep::Done {
            let input = match wizard.step() {
                WizardStep::Name => {
                    WizardInput::Name(self.text("Remote device adapter name").await?)
                }
                WizardStep::DeviceSelection => WizardInput::Device(self.pick_device(hub).await?),
                WizardStep::NewDeviceId => {
                    WizardInput::NewDeviceId(self.text("New device ID").await?)
                }
                WizardStep::Host => {
                    WizardInput::Host(self.text("Host name or IP address of the device").await?)
                }
                WizardStep::Done => break,
            };

            if let Err(e) = wizard.advance(input) {
                output.error(&e.to_string());
            }
        }

        wizard.finish()
    }

    /// Leaf devices only; IoT Edge devices cannot back an adapter
    async fn pick_device(&self, hub: &HubConnection) -> Result<DeviceChoice, DomainError> {
        let mut devices: Vec<String> = self
            .commands
            .session()
            .registry()
            .list_devices(hub)
            .await?
            .into_iter()
            .filter(|d| !d.is_edge)
            .map(|d| d.device_id)
            .collect();
        devices.push(CREATE_NEW_DEVICE.to_string());

        let index = self
            .prompter
            .pick("Select the IoT device for this adapter", &devices)
            .await?
            .ok_or(DomainError::Cancelled)?;

        match devices.get(index) {
            Some(_) if index == devices.len() - 1 => Ok(DeviceChoice::CreateNew),
            Some(id) => Ok(DeviceChoice::Existing(id.clone())),
            None => Err(DomainError::InvalidResource(format!(
                "No device at index {}",
                index
            ))),
        }
    }

    async fn text(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompter
            .input_text(prompt)
            .await?
            .ok_or(DomainError::Cancelled)
    }
}
