//! Update and alarm emission
//!
//! The controller does not know how updates reach the consuming system.
//! After every successful mutation it hands the full device status to an
//! injected [`EventSink`]; alarms go to the same sink through a separate
//! method. Delivery is fire-and-forget: the controller never waits for,
//! retries, or inspects the outcome of an emission.

use serde::Serialize;

use crate::alarm::{AlarmKind, AlarmPayload};
use crate::status::DeviceStatus;

/// Receiver for status updates and alarms emitted by an autopilot
pub trait EventSink: Send + Sync {
    /// Called after every successful state-changing operation
    fn update(&self, device_type: &str, status: &DeviceStatus);

    /// Called when the device raises an alarm
    fn alarm(&self, device_type: &str, kind: AlarmKind, payload: &AlarmPayload);
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn update(&self, _device_type: &str, _status: &DeviceStatus) {}

    fn alarm(&self, _device_type: &str, _kind: AlarmKind, _payload: &AlarmPayload) {}
}

/// Owned form of an emission, for shells that forward events over channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AutopilotEvent {
    #[serde(rename_all = "camelCase")]
    Update {
        device_type: String,
        status: DeviceStatus,
    },
    #[serde(rename_all = "camelCase")]
    Alarm {
        device_type: String,
        kind: AlarmKind,
        payload: AlarmPayload,
    },
}

impl AutopilotEvent {
    pub fn device_type(&self) -> &str {
        match self {
            AutopilotEvent::Update { device_type, .. } => device_type,
            AutopilotEvent::Alarm { device_type, .. } => device_type,
        }
    }
}
