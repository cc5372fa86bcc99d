use super::{DeviceTypeId, Priority, TicketInput};

/// Builder for ticket creation input
#[derive(Default)]
pub struct TicketInputBuilder {
    device_type_id: Option<DeviceTypeId>,
    device_name: Option<String>,
    issue_description: Option<String>,
    priority: Option<String>,
}

impl TicketInputBuilder {
    /// Create a new input builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device type
    #[must_use]
    pub const fn device_type(mut self, id: DeviceTypeId) -> Self {
        self.device_type_id = Some(id);
        self
    }

    /// Set the device name
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Set the issue description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.issue_description = Some(description.into());
        self
    }

    /// Set the priority
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority.as_str().to_string());
        self
    }

    /// Set the priority from raw text; unknown values default at creation
    #[must_use]
    pub fn raw_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Build the input
    pub fn build(self) -> TicketInput {
        TicketInput {
            device_type_id: self.device_type_id,
            device_name: self.device_name,
            issue_description: self.issue_description,
            priority: self.priority,
        }
    }
}
