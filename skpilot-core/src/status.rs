//! Autopilot Device Status
//!
//! This module holds the in-memory record of a single autopilot device
//! (state, mode, engaged, target) together with the catalog of states and
//! modes the device accepts. It contains no validation logic: the
//! [`Autopilot`](crate::Autopilot) controller checks every command before it
//! touches a [`DeviceStatus`], so a rejected command never changes it.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Operating state of the autopilot
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PilotState {
    /// Actively steering the vessel
    On,
    /// Standby
    Off,
    /// Device unreachable. Only entered after a failed connection attempt.
    OffLine,
}

impl PilotState {
    /// Whether a caller may request this state through `set_state`
    pub fn is_commandable(&self) -> bool {
        matches!(self, PilotState::On | PilotState::Off)
    }

    /// Whether this state is actively steering the vessel
    pub fn engaged(&self) -> bool {
        matches!(self, PilotState::On)
    }
}

/// Steering mode of the autopilot
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PilotMode {
    /// Steer to a compass heading
    Compass,
    /// Steer to an apparent wind angle
    Wind,
    /// Follow the active route
    Route,
    /// Steer to a GPS course
    Gps,
    /// Temporary manual deviation, see [`DodgeCommand`](crate::DodgeCommand)
    Dodge,
}

impl PilotMode {
    /// Modes a caller may request through `set_mode`
    pub fn commandable() -> impl Iterator<Item = PilotMode> {
        PilotMode::iter().filter(PilotMode::is_commandable)
    }

    /// Whether a caller may request this mode through `set_mode`.
    /// Dodge is only entered through the dodge command.
    pub fn is_commandable(&self) -> bool {
        !matches!(self, PilotMode::Dodge)
    }
}

/// One entry of the state catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOption {
    pub name: PilotState,
    pub engaged: bool,
}

/// Capability descriptor advertised to the host.
///
/// Lists the states and modes a caller may command. The host uses it to
/// validate and display the available choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotOptions {
    pub states: Vec<StateOption>,
    pub modes: Vec<PilotMode>,
}

impl Default for PilotOptions {
    fn default() -> Self {
        PilotOptions {
            states: PilotState::iter()
                .filter(PilotState::is_commandable)
                .map(|name| StateOption {
                    name,
                    engaged: name.engaged(),
                })
                .collect(),
            modes: PilotMode::commandable().collect(),
        }
    }
}

impl PilotOptions {
    /// Look up a commandable state by its API name
    pub fn find_state(&self, name: &str) -> Option<PilotState> {
        self.states
            .iter()
            .map(|option| option.name)
            .find(|state| state.to_string() == name)
    }

    /// Look up a commandable mode by its API name
    pub fn find_mode(&self, name: &str) -> Option<PilotMode> {
        self.modes
            .iter()
            .copied()
            .find(|mode| mode.to_string() == name)
    }
}

/// Current values of a single autopilot device.
///
/// `engaged` is derived from `state` and only changes through
/// [`DeviceStatus::apply_state`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub state: Option<PilotState>,
    pub mode: Option<PilotMode>,
    pub engaged: bool,
    /// Steering setpoint in radians
    pub target: Option<f64>,
    /// Offset of the last dodge request, present while dodging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dodge: Option<f64>,
}

impl DeviceStatus {
    pub(crate) fn apply_state(&mut self, state: PilotState) {
        self.state = Some(state);
        self.engaged = state.engaged();
    }

    pub fn is_dodging(&self) -> bool {
        self.mode == Some(PilotMode::Dodge)
    }
}

/// Snapshot returned by `status()`: the catalog merged with current values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopilotStatus {
    #[serde(flatten)]
    pub options: PilotOptions,
    #[serde(flatten)]
    pub device: DeviceStatus,
}
