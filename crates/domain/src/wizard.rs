//! Remote device adapter creation as an explicit state machine.
//!
//! Steps: name -> device selection -> [new device id] -> host -> done.
//! The machine only validates and accumulates; prompting and provisioning are
//! done by the driver in the application layer.

use async_trait::async_trait;

use crate::DomainError;
use crate::resource::validate_resource_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Name,
    DeviceSelection,
    NewDeviceId,
    Host,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceChoice {
    Existing(String),
    CreateNew,
}

/// Input accepted at each step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    Name(String),
    Device(DeviceChoice),
    NewDeviceId(String),
    Host(String),
}

/// Values collected so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterDraft {
    pub name: Option<String>,
    pub device: Option<DeviceChoice>,
    pub new_device_id: Option<String>,
    pub host: Option<String>,
}

/// Completed wizard output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterPlan {
    pub name: String,
    pub device_id: String,
    pub create_device: bool,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterWizard {
    step: WizardStep,
    draft: AdapterDraft,
}

impl Default for AdapterWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Name,
            draft: AdapterDraft::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &AdapterDraft {
        &self.draft
    }

    /// Apply input for the current step. On a validation error the machine
    /// stays on the same step.
    pub fn advance(&mut self, input: WizardInput) -> Result<WizardStep, DomainError> {
        let next = match (self.step, input) {
            (WizardStep::Name, WizardInput::Name(name)) => {
                let name = name.trim().to_string();
                validate_resource_name(&name)?;
                self.draft.name = Some(name);
                WizardStep::DeviceSelection
            }
            (WizardStep::DeviceSelection, WizardInput::Device(choice)) => {
                let next = match &choice {
                    DeviceChoice::CreateNew => WizardStep::NewDeviceId,
                    DeviceChoice::Existing(id) if id.trim().is_empty() => {
                        return Err(DomainError::InvalidResource(
                            "Device ID cannot be empty".to_string(),
                        ));
                    }
                    DeviceChoice::Existing(_) => WizardStep::Host,
                };
                self.draft.device = Some(choice);
                next
            }
            (WizardStep::NewDeviceId, WizardInput::NewDeviceId(id)) => {
                let id = id.trim().to_string();
                validate_device_id(&id)?;
                self.draft.new_device_id = Some(id);
                WizardStep::Host
            }
            (WizardStep::Host, WizardInput::Host(host)) => {
                let host = host.trim().to_string();
                if host.is_empty() || host.contains(char::is_whitespace) {
                    return Err(DomainError::InvalidResource(format!(
                        "Invalid host '{}'",
                        host
                    )));
                }
                self.draft.host = Some(host);
                WizardStep::Done
            }
            (step, input) => {
                return Err(DomainError::InvalidResource(format!(
                    "Unexpected input {:?} at step {:?}",
                    input, step
                )));
            }
        };
        self.step = next;
        Ok(next)
    }

    /// Consume a completed wizard
    pub fn finish(self) -> Result<AdapterPlan, DomainError> {
        if self.step != WizardStep::Done {
            return Err(DomainError::InvalidResource(format!(
                "Wizard not complete, at step {:?}",
                self.step
            )));
        }

        let AdapterDraft {
            name,
            device,
            new_device_id,
            host,
        } = self.draft;

        let incomplete = || DomainError::InvalidResource("Wizard draft is incomplete".to_string());
        let (device_id, create_device) = match device.ok_or_else(incomplete)? {
            DeviceChoice::Existing(id) => (id, false),
            DeviceChoice::CreateNew => (new_device_id.ok_or_else(incomplete)?, true),
        };

        Ok(AdapterPlan {
            name: name.ok_or_else(incomplete)?,
            device_id,
            create_device,
            host: host.ok_or_else(incomplete)?,
        })
    }
}

/// IoT Hub device id rule: up to 128 ASCII letters, digits and `-.%_*?!(),:=@$'`
fn validate_device_id(id: &str) -> Result<(), DomainError> {
    const ALLOWED: &str = "-.%_*?!(),:=@$'";
    if id.is_empty() || id.len() > 128 {
        return Err(DomainError::InvalidResource(format!(
            "Device ID must be 1-128 characters, got {}",
            id.len()
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ALLOWED.contains(c))
    {
        return Err(DomainError::InvalidResource(format!(
            "Device ID {id} contains invalid characters"
        )));
    }
    Ok(())
}

/// Port for asking the operator for wizard input.
/// `None` means the operator dismissed the prompt.
#[async_trait]
pub trait WizardPrompter: Send + Sync {
    async fn input_text(&self, prompt: &str) -> Result<Option<String>, DomainError>;

    async fn pick(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, DomainError>;
}
