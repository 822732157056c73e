//! Autopilot Provider
//!
//! The provider contract a Signal K style host uses to drive autopilot
//! devices. Every operation is keyed by a device id and maps 1:1 onto an
//! [`Autopilot`](skpilot_core::Autopilot) command; the synchronous core
//! call is wrapped in an async method.

use async_trait::async_trait;
use skpilot_core::{
    AutopilotStatus, DodgeCommand, PilotMode, PilotOptions, PilotState, TackGybeDirection,
};

use crate::pilot::{PilotError, SharedPilots};

#[async_trait]
pub trait AutopilotProvider: Send + Sync {
    /// Options catalog merged with the current status
    async fn get_data(&self, device_id: &str) -> Result<AutopilotStatus, PilotError>;

    async fn get_state(&self, device_id: &str) -> Result<Option<PilotState>, PilotError>;

    /// Returns whether the new state is actively steering the vessel
    async fn set_state(&self, device_id: &str, state: &str) -> Result<bool, PilotError>;

    async fn get_mode(&self, device_id: &str) -> Result<Option<PilotMode>, PilotError>;

    async fn set_mode(&self, device_id: &str, mode: &str) -> Result<(), PilotError>;

    async fn get_target(&self, device_id: &str) -> Result<Option<f64>, PilotError>;

    async fn set_target(&self, device_id: &str, value: f64) -> Result<(), PilotError>;

    async fn adjust_target(&self, device_id: &str, value: f64) -> Result<(), PilotError>;

    async fn engage(&self, device_id: &str) -> Result<(), PilotError>;

    async fn disengage(&self, device_id: &str) -> Result<(), PilotError>;

    async fn tack(&self, device_id: &str, direction: TackGybeDirection)
        -> Result<(), PilotError>;

    async fn gybe(&self, device_id: &str, direction: TackGybeDirection)
        -> Result<(), PilotError>;

    async fn dodge(&self, device_id: &str, command: DodgeCommand) -> Result<(), PilotError>;

    /// Capability descriptor the host uses to validate and display choices
    async fn options(&self, device_id: &str) -> Result<PilotOptions, PilotError> {
        Ok(self.get_data(device_id).await?.options)
    }
}

#[async_trait]
impl AutopilotProvider for SharedPilots {
    async fn get_data(&self, device_id: &str) -> Result<AutopilotStatus, PilotError> {
        Ok(self.get(device_id)?.status())
    }

    async fn get_state(&self, device_id: &str) -> Result<Option<PilotState>, PilotError> {
        Ok(self.get(device_id)?.status().device.state)
    }

    async fn set_state(&self, device_id: &str, state: &str) -> Result<bool, PilotError> {
        self.get(device_id)?.command(|c| c.set_state(state))
    }

    async fn get_mode(&self, device_id: &str) -> Result<Option<PilotMode>, PilotError> {
        Ok(self.get(device_id)?.status().device.mode)
    }

    async fn set_mode(&self, device_id: &str, mode: &str) -> Result<(), PilotError> {
        self.get(device_id)?.command(|c| c.set_mode(mode))
    }

    async fn get_target(&self, device_id: &str) -> Result<Option<f64>, PilotError> {
        Ok(self.get(device_id)?.status().device.target)
    }

    async fn set_target(&self, device_id: &str, value: f64) -> Result<(), PilotError> {
        self.get(device_id)?.command(|c| c.set_target(value))
    }

    async fn adjust_target(&self, device_id: &str, value: f64) -> Result<(), PilotError> {
        self.get(device_id)?.command(|c| c.adjust_target(value))
    }

    async fn engage(&self, device_id: &str) -> Result<(), PilotError> {
        self.get(device_id)?.command(|c| {
            c.engage();
            Ok(())
        })
    }

    async fn disengage(&self, device_id: &str) -> Result<(), PilotError> {
        self.get(device_id)?.command(|c| {
            c.disengage();
            Ok(())
        })
    }

    async fn tack(
        &self,
        device_id: &str,
        direction: TackGybeDirection,
    ) -> Result<(), PilotError> {
        self.get(device_id)?.command(|c| c.tack(direction))
    }

    async fn gybe(
        &self,
        device_id: &str,
        direction: TackGybeDirection,
    ) -> Result<(), PilotError> {
        self.get(device_id)?.command(|c| c.gybe(direction))
    }

    async fn dodge(&self, device_id: &str, command: DodgeCommand) -> Result<(), PilotError> {
        self.get(device_id)?.command(|c| {
            c.dodge(command);
            Ok(())
        })
    }
}
