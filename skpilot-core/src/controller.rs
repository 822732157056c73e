//! Autopilot controller
//!
//! Validates commands against the current [`DeviceStatus`] and applies them.
//! Every operation either succeeds completely or returns an
//! [`AutopilotError`] with the status unchanged. After each successful
//! mutation the full status is handed to the [`EventSink`].
//!
//! # Dodge
//!
//! Dodge is the only real state machine in the controller:
//!
//! ```text
//!            dodge(Enter)                 dodge(Enter)
//!   ┌──────────┐ ──────────▶ ┌───────────────┐ ◀──┐ (no transition)
//!   │ Normal(M)│             │ Dodging(M)    │ ───┘
//!   └──────────┘ ◀────────── └───────────────┘
//!            dodge(Exit)
//! ```
//!
//! The mode active when entering dodge is kept in a single-slot register and
//! restored on exit.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use skpilot_core::{Autopilot, AutopilotError, NullSink, PilotMode, PilotState};
//!
//! let mut pilot = Autopilot::new("mockPilotSK", Arc::new(NullSink));
//! pilot.start();
//! assert_eq!(pilot.status().device.state, Some(PilotState::Off));
//!
//! pilot.engage();
//! pilot.set_target(1.0).unwrap();
//! assert!(matches!(
//!     pilot.adjust_target(10.0),
//!     Err(AutopilotError::OutOfRange { .. })
//! ));
//! assert_eq!(pilot.status().device.target, Some(1.0));
//! assert_eq!(pilot.status().device.mode, Some(PilotMode::Compass));
//! ```

use std::f64::consts::{PI, TAU};
use std::ops::RangeInclusive;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::alarm::{AlarmKind, AlarmPayload};
use crate::error::AutopilotError;
use crate::events::EventSink;
use crate::link::{DeviceLink, SimulatedLink};
use crate::status::{AutopilotStatus, DeviceStatus, PilotMode, PilotOptions, PilotState};

/// Device type the mock provider registers under. Must be URI path safe.
pub const DEVICE_TYPE: &str = "mockPilotSK";

/// Valid target range in wind mode: signed apparent wind angle
pub const WIND_TARGET_RANGE: RangeInclusive<f64> = -PI..=PI;

/// Valid target range in all other modes: heading
pub const HEADING_TARGET_RANGE: RangeInclusive<f64> = 0.0..=TAU;

/// Range `adjust_target` enforces for the given mode
pub fn target_range(mode: Option<PilotMode>) -> RangeInclusive<f64> {
    match mode {
        Some(PilotMode::Wind) => WIND_TARGET_RANGE,
        _ => HEADING_TARGET_RANGE,
    }
}

/// Argument of the dodge operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DodgeCommand {
    /// Enter dodge, or report a new offset while already dodging
    Enter(f64),
    /// Leave dodge and return to the previous mode
    Exit,
}

/// Side for tack and gybe manoeuvres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TackGybeDirection {
    Port,
    Starboard,
}

/// Controller for a single autopilot device
pub struct Autopilot {
    device_type: String,
    options: PilotOptions,
    status: DeviceStatus,
    /// Mode to restore when leaving dodge
    pre_dodge_mode: Option<PilotMode>,
    link: Box<dyn DeviceLink>,
    sink: Arc<dyn EventSink>,
}

impl Autopilot {
    /// Create a controller with a simulated link and the default catalog.
    ///
    /// The status stays unset until [`Autopilot::start`] is called.
    pub fn new<S: Into<String>>(device_type: S, sink: Arc<dyn EventSink>) -> Self {
        Autopilot {
            device_type: device_type.into(),
            options: PilotOptions::default(),
            status: DeviceStatus::default(),
            pre_dodge_mode: None,
            link: Box::new(SimulatedLink::new()),
            sink,
        }
    }

    /// Replace the link used by `start()`
    pub fn with_link(mut self, link: Box<dyn DeviceLink>) -> Self {
        self.link = link;
        self
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn options(&self) -> &PilotOptions {
        &self.options
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Connect to the device and establish the baseline status.
    ///
    /// Calling `start` again re-initializes the device. A connection failure
    /// is not returned: the device is marked `off-line` instead.
    pub fn start(&mut self) {
        info!("Initialising autopilot device ({})", self.device_type);

        self.status = DeviceStatus::default();
        self.pre_dodge_mode = None;

        match self.link.connect(&self.device_type) {
            Ok(()) => {
                self.status.apply_state(PilotState::Off);
                self.status.mode = Some(PilotMode::Compass);
            }
            Err(e) => {
                warn!(
                    "Error connecting to autopilot device ({}): {}",
                    self.device_type, e
                );
                self.status.apply_state(PilotState::OffLine);
            }
        }
        self.emit_update();
    }

    /// Disconnect and discard the device status. Idempotent.
    pub fn stop(&mut self) {
        debug!("Stopping autopilot device ({})", self.device_type);
        self.link.disconnect();
        self.status = DeviceStatus::default();
        self.pre_dodge_mode = None;
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Catalog merged with the current values
    pub fn status(&self) -> AutopilotStatus {
        AutopilotStatus {
            options: self.options.clone(),
            device: self.status,
        }
    }

    /// Current values without the catalog
    pub fn device_status(&self) -> DeviceStatus {
        self.status
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Set the operating state by name.
    ///
    /// Returns whether the new state is actively steering the vessel.
    pub fn set_state(&mut self, value: &str) -> Result<bool, AutopilotError> {
        let state = self
            .options
            .find_state(value)
            .ok_or_else(|| AutopilotError::InvalidState {
                value: value.to_string(),
                state: self.status.state,
            })?;
        Ok(self.apply_state(state))
    }

    pub fn engage(&mut self) {
        self.apply_state(PilotState::On);
    }

    pub fn disengage(&mut self) {
        self.apply_state(PilotState::Off);
    }

    fn apply_state(&mut self, state: PilotState) -> bool {
        debug!("[{}] state -> {}", self.device_type, state);
        if self.status.target.is_none() {
            self.status.target = Some(0.0);
        }
        self.status.apply_state(state);
        self.emit_update();
        self.status.engaged
    }

    /// Set the steering mode by name.
    ///
    /// The current target is kept as is, even when it lies outside the range
    /// of the new mode; the next `set_target` or `adjust_target` deals with it.
    /// Selecting a mode while dodging leaves dodge for the new mode.
    pub fn set_mode(&mut self, value: &str) -> Result<(), AutopilotError> {
        let mode = self
            .options
            .find_mode(value)
            .ok_or_else(|| AutopilotError::InvalidMode {
                value: value.to_string(),
                mode: self.status.mode,
            })?;

        debug!("[{}] mode -> {}", self.device_type, mode);
        if self.status.is_dodging() {
            self.pre_dodge_mode = None;
            self.status.dodge = None;
        }
        self.status.mode = Some(mode);
        self.emit_update();
        Ok(())
    }

    /// Replace the target.
    ///
    /// Negative values are only accepted in wind mode. There is no upper
    /// bound check here.
    pub fn set_target(&mut self, value: f64) -> Result<(), AutopilotError> {
        let mode = self.status.mode;
        if !value.is_finite() || (value < 0.0 && mode != Some(PilotMode::Wind)) {
            return Err(AutopilotError::InvalidTarget { value, mode });
        }

        debug!("[{}] target -> {}", self.device_type, value);
        self.status.target = Some(value);
        self.emit_update();
        Ok(())
    }

    /// Move the target by `delta`, keeping it inside the range of the
    /// current mode. An unset target counts as 0.
    pub fn adjust_target(&mut self, delta: f64) -> Result<(), AutopilotError> {
        let mode = self.status.mode;
        let candidate = self.status.target.unwrap_or(0.0) + delta;
        if !target_range(mode).contains(&candidate) {
            return Err(AutopilotError::OutOfRange {
                delta,
                candidate,
                mode,
            });
        }

        debug!(
            "[{}] target {} adjusted to {}",
            self.device_type, delta, candidate
        );
        self.status.target = Some(candidate);
        self.emit_update();
        Ok(())
    }

    /// Enter or leave dodge. Always emits an update.
    ///
    /// Entering while already dodging only records the new offset. The mode
    /// saved on entry is restored on exit, even when it was unset (device
    /// not started or off-line).
    pub fn dodge(&mut self, command: DodgeCommand) {
        match command {
            DodgeCommand::Enter(offset) => {
                if self.status.is_dodging() {
                    debug!("[{}] dodge offset {}", self.device_type, offset);
                } else {
                    debug!("[{}] enter dodge mode ({})", self.device_type, offset);
                    if self.status.mode.is_none() {
                        warn!(
                            "[{}] dodge entered without an active mode",
                            self.device_type
                        );
                    }
                    self.pre_dodge_mode = self.status.mode;
                    self.status.mode = Some(PilotMode::Dodge);
                }
                self.status.dodge = Some(offset);
            }
            DodgeCommand::Exit => {
                debug!("[{}] exit dodge mode", self.device_type);
                if self.status.is_dodging() {
                    self.status.mode = self.pre_dodge_mode.take();
                }
                self.status.dodge = None;
            }
        }
        self.emit_update();
    }

    pub fn tack(&mut self, direction: TackGybeDirection) -> Result<(), AutopilotError> {
        debug!("[{}] tack to {} refused", self.device_type, direction);
        Err(AutopilotError::NotImplemented { operation: "tack" })
    }

    pub fn gybe(&mut self, direction: TackGybeDirection) -> Result<(), AutopilotError> {
        debug!("[{}] gybe to {} refused", self.device_type, direction);
        Err(AutopilotError::NotImplemented { operation: "gybe" })
    }

    // -------------------------------------------------------------------------
    // Emission
    // -------------------------------------------------------------------------

    /// Forward a device alarm to the sink under its normalized id.
    pub fn raise_alarm(&self, raw_id: &str, payload: AlarmPayload) -> AlarmKind {
        let kind = AlarmKind::normalize(raw_id);
        info!(
            "[{}] alarm '{}' -> {} ({})",
            self.device_type, raw_id, kind, payload.state
        );
        self.sink.alarm(&self.device_type, kind, &payload);
        kind
    }

    fn emit_update(&self) {
        self.sink.update(&self.device_type, &self.status);
    }
}

impl std::fmt::Debug for Autopilot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autopilot")
            .field("device_type", &self.device_type)
            .field("status", &self.status)
            .field("pre_dodge_mode", &self.pre_dodge_mode)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmSeverity;
    use crate::events::AutopilotEvent;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<AutopilotEvent>>,
    }

    impl RecordingSink {
        fn take(&self) -> Vec<AutopilotEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl EventSink for RecordingSink {
        fn update(&self, device_type: &str, status: &DeviceStatus) {
            self.events.lock().unwrap().push(AutopilotEvent::Update {
                device_type: device_type.to_string(),
                status: *status,
            });
        }

        fn alarm(&self, device_type: &str, kind: AlarmKind, payload: &AlarmPayload) {
            self.events.lock().unwrap().push(AutopilotEvent::Alarm {
                device_type: device_type.to_string(),
                kind,
                payload: payload.clone(),
            });
        }
    }

    fn started() -> (Autopilot, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let mut pilot = Autopilot::new(DEVICE_TYPE, sink.clone());
        pilot.start();
        sink.take();
        (pilot, sink)
    }

    fn last_update(events: &[AutopilotEvent]) -> Option<DeviceStatus> {
        events.iter().rev().find_map(|e| match e {
            AutopilotEvent::Update { status, .. } => Some(*status),
            _ => None,
        })
    }

    #[test]
    fn test_unstarted_status() {
        let pilot = Autopilot::new(DEVICE_TYPE, Arc::new(crate::NullSink));
        let status = pilot.status();
        assert_eq!(status.device, DeviceStatus::default());
        assert_eq!(status.options, PilotOptions::default());
    }

    #[test]
    fn test_start_baseline() {
        let sink = Arc::new(RecordingSink::default());
        let mut pilot = Autopilot::new(DEVICE_TYPE, sink.clone());
        pilot.start();

        let device = pilot.device_status();
        assert_eq!(device.state, Some(PilotState::Off));
        assert_eq!(device.mode, Some(PilotMode::Compass));
        assert!(!device.engaged);
        assert_eq!(device.target, None);
        assert_eq!(last_update(&sink.take()), Some(device));
    }

    #[test]
    fn test_start_connection_failure() {
        let sink = Arc::new(RecordingSink::default());
        let mut pilot = Autopilot::new(DEVICE_TYPE, sink.clone())
            .with_link(Box::new(SimulatedLink::failing()));
        pilot.start();

        let device = pilot.device_status();
        assert_eq!(device.state, Some(PilotState::OffLine));
        assert!(!device.engaged);
        assert_eq!(device.mode, None);
        assert_eq!(device.target, None);
    }

    #[test]
    fn test_restart_reinitializes() {
        let (mut pilot, _sink) = started();
        pilot.engage();
        pilot.set_mode("wind").unwrap();
        pilot.set_target(-1.0).unwrap();
        pilot.dodge(DodgeCommand::Enter(5.0));

        pilot.start();
        let device = pilot.device_status();
        assert_eq!(device.state, Some(PilotState::Off));
        assert_eq!(device.mode, Some(PilotMode::Compass));
        assert_eq!(device.target, None);
        assert_eq!(device.dodge, None);

        // register was cleared as well
        pilot.dodge(DodgeCommand::Exit);
        assert_eq!(pilot.device_status().mode, Some(PilotMode::Compass));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut pilot, sink) = started();
        pilot.engage();
        pilot.stop();
        pilot.stop();
        assert_eq!(pilot.device_status(), DeviceStatus::default());
        // engage emitted, stop did not
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn test_set_state_derives_engaged() {
        let (mut pilot, _sink) = started();
        for option in pilot.options().states.clone() {
            let name = option.name.to_string();
            let engaged = pilot.set_state(&name).unwrap();
            assert_eq!(engaged, name == "on");
            assert_eq!(pilot.device_status().engaged, name == "on");
            assert_eq!(pilot.device_status().state, Some(option.name));
        }
    }

    #[test]
    fn test_set_state_defaults_target() {
        let (mut pilot, _sink) = started();
        assert_eq!(pilot.device_status().target, None);
        pilot.set_state("off").unwrap();
        assert_eq!(pilot.device_status().target, Some(0.0));

        pilot.set_target(2.0).unwrap();
        pilot.set_state("on").unwrap();
        assert_eq!(pilot.device_status().target, Some(2.0));
    }

    #[test]
    fn test_invalid_state_leaves_status() {
        let (mut pilot, sink) = started();
        pilot.engage();
        sink.take();
        let before = pilot.status();

        for value in ["off-line", "standby", "ON", ""] {
            match pilot.set_state(value) {
                Err(AutopilotError::InvalidState { value: v, state }) => {
                    assert_eq!(v, value);
                    assert_eq!(state, Some(PilotState::On));
                }
                other => panic!("unexpected result {:?}", other),
            }
        }
        assert_eq!(pilot.status(), before);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_engage_disengage() {
        let (mut pilot, sink) = started();
        pilot.engage();
        assert!(pilot.device_status().engaged);
        assert_eq!(pilot.device_status().state, Some(PilotState::On));
        pilot.disengage();
        assert!(!pilot.device_status().engaged);
        assert_eq!(pilot.device_status().state, Some(PilotState::Off));
        assert_eq!(sink.take().len(), 2);
    }

    #[test]
    fn test_set_mode() {
        let (mut pilot, sink) = started();
        for mode in ["wind", "route", "gps", "compass"] {
            pilot.set_mode(mode).unwrap();
            assert_eq!(pilot.device_status().mode.unwrap().to_string(), mode);
        }
        assert_eq!(sink.take().len(), 4);
    }

    #[test]
    fn test_invalid_mode_leaves_status() {
        let (mut pilot, sink) = started();
        let before = pilot.status();

        for value in ["dodge", "standby", "Wind", ""] {
            match pilot.set_mode(value) {
                Err(AutopilotError::InvalidMode { value: v, mode }) => {
                    assert_eq!(v, value);
                    assert_eq!(mode, Some(PilotMode::Compass));
                }
                other => panic!("unexpected result {:?}", other),
            }
        }
        assert_eq!(pilot.status(), before);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_set_mode_keeps_stale_target() {
        // Switching mode does not re-validate the target
        let (mut pilot, _sink) = started();
        pilot.set_target(5.0).unwrap();
        pilot.set_mode("wind").unwrap();
        assert_eq!(pilot.device_status().target, Some(5.0));
        assert!(!WIND_TARGET_RANGE.contains(&5.0));

        // the next adjustment is checked against the wind range
        assert!(matches!(
            pilot.adjust_target(0.1),
            Err(AutopilotError::OutOfRange { .. })
        ));
        assert!(pilot.adjust_target(-2.0).is_ok());
        assert_eq!(pilot.device_status().target, Some(3.0));
    }

    #[test]
    fn test_set_target() {
        let (mut pilot, sink) = started();
        pilot.set_target(1.0).unwrap();
        assert_eq!(pilot.device_status().target, Some(1.0));

        // no upper bound check
        pilot.set_target(100.0).unwrap();
        assert_eq!(pilot.device_status().target, Some(100.0));
        assert_eq!(sink.take().len(), 2);
    }

    #[test]
    fn test_set_target_negative() {
        let (mut pilot, sink) = started();
        pilot.set_target(1.0).unwrap();
        sink.take();

        for mode in ["compass", "route", "gps"] {
            pilot.set_mode(mode).unwrap();
            assert_eq!(
                pilot.set_target(-0.1),
                Err(AutopilotError::InvalidTarget {
                    value: -0.1,
                    mode: mode.parse().ok(),
                })
            );
            assert_eq!(pilot.device_status().target, Some(1.0));
        }

        pilot.set_mode("wind").unwrap();
        pilot.set_target(-0.1).unwrap();
        assert_eq!(pilot.device_status().target, Some(-0.1));
    }

    #[test]
    fn test_set_target_not_finite() {
        let (mut pilot, _sink) = started();
        pilot.set_mode("wind").unwrap();
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                pilot.set_target(value),
                Err(AutopilotError::InvalidTarget { .. })
            ));
        }
        assert_eq!(pilot.device_status().target, None);
    }

    #[test]
    fn test_adjust_target_heading_range() {
        let (mut pilot, sink) = started();
        pilot.adjust_target(1.0).unwrap();
        assert_eq!(pilot.device_status().target, Some(1.0));

        pilot.adjust_target(TAU - 1.0).unwrap();
        assert_eq!(pilot.device_status().target, Some(TAU));
        sink.take();

        let before = pilot.status();
        assert!(matches!(
            pilot.adjust_target(0.001),
            Err(AutopilotError::OutOfRange { .. })
        ));
        assert!(matches!(
            pilot.adjust_target(-TAU - 0.001),
            Err(AutopilotError::OutOfRange { .. })
        ));
        assert!(matches!(
            pilot.adjust_target(f64::NAN),
            Err(AutopilotError::OutOfRange { .. })
        ));
        assert_eq!(pilot.status(), before);
        assert!(sink.take().is_empty());

        pilot.adjust_target(-TAU).unwrap();
        assert_eq!(pilot.device_status().target, Some(0.0));
    }

    #[test]
    fn test_adjust_target_wind_range() {
        let (mut pilot, _sink) = started();
        pilot.set_mode("wind").unwrap();
        pilot.set_target(0.0).unwrap();

        pilot.adjust_target(-PI).unwrap();
        assert_eq!(pilot.device_status().target, Some(-PI));
        assert!(matches!(
            pilot.adjust_target(-0.01),
            Err(AutopilotError::OutOfRange { .. })
        ));
        pilot.adjust_target(TAU).unwrap();
        assert_eq!(pilot.device_status().target, Some(PI));
        assert!(matches!(
            pilot.adjust_target(0.01),
            Err(AutopilotError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_adjust_target_sequence_matches_sum() {
        let steps = [(0.5, 0.25), (1.0, 6.0), (3.0, -4.0), (-0.5, 1.0), (2.0, 2.0)];
        for (d1, d2) in steps {
            let (mut twice, _) = started();
            twice.set_target(1.0).unwrap();
            let first = twice.adjust_target(d1);
            let second = twice.adjust_target(d2);

            let (mut once, _) = started();
            once.set_target(1.0).unwrap();
            let combined = once.adjust_target(d1 + d2);

            let intermediate_ok = HEADING_TARGET_RANGE.contains(&(1.0 + d1));
            let final_ok = HEADING_TARGET_RANGE.contains(&(1.0 + d1 + d2));
            assert_eq!(first.is_ok(), intermediate_ok, "step {} {}", d1, d2);
            if intermediate_ok {
                assert_eq!(second.is_ok(), final_ok, "step {} {}", d1, d2);
            }
            if first.is_ok() && second.is_ok() {
                assert!(combined.is_ok());
                assert_eq!(
                    twice.device_status().target,
                    once.device_status().target
                );
            }
        }
    }

    #[test]
    fn test_dodge_round_trip() {
        for mode in ["compass", "wind", "route", "gps"] {
            let (mut pilot, _sink) = started();
            pilot.set_mode(mode).unwrap();

            pilot.dodge(DodgeCommand::Enter(5.0));
            assert_eq!(pilot.device_status().mode, Some(PilotMode::Dodge));
            assert_eq!(pilot.device_status().dodge, Some(5.0));

            pilot.dodge(DodgeCommand::Enter(5.0));
            pilot.dodge(DodgeCommand::Enter(-3.0));
            assert_eq!(pilot.device_status().mode, Some(PilotMode::Dodge));
            assert_eq!(pilot.device_status().dodge, Some(-3.0));

            pilot.dodge(DodgeCommand::Exit);
            assert_eq!(pilot.device_status().mode.unwrap().to_string(), mode);
            assert_eq!(pilot.device_status().dodge, None);
        }
    }

    #[test]
    fn test_dodge_always_emits() {
        let (mut pilot, sink) = started();
        pilot.dodge(DodgeCommand::Enter(5.0));
        pilot.dodge(DodgeCommand::Enter(10.0));
        pilot.dodge(DodgeCommand::Exit);
        pilot.dodge(DodgeCommand::Exit);

        let events = sink.take();
        assert_eq!(events.len(), 4);
        match &events[1] {
            AutopilotEvent::Update { status, .. } => {
                assert_eq!(status.mode, Some(PilotMode::Dodge));
                assert_eq!(status.dodge, Some(10.0));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_dodge_exit_without_enter() {
        let (mut pilot, _sink) = started();
        pilot.set_mode("route").unwrap();
        pilot.dodge(DodgeCommand::Exit);
        assert_eq!(pilot.device_status().mode, Some(PilotMode::Route));
    }

    #[test]
    fn test_dodge_without_mode() {
        let mut pilot = Autopilot::new(DEVICE_TYPE, Arc::new(crate::NullSink))
            .with_link(Box::new(SimulatedLink::failing()));
        pilot.start();
        assert_eq!(pilot.device_status().state, Some(PilotState::OffLine));

        pilot.dodge(DodgeCommand::Enter(5.0));
        assert_eq!(pilot.device_status().mode, Some(PilotMode::Dodge));
        assert_eq!(pilot.device_status().dodge, Some(5.0));

        pilot.dodge(DodgeCommand::Exit);
        assert_eq!(pilot.device_status().mode, None);
        assert_eq!(pilot.device_status().dodge, None);
    }

    #[test]
    fn test_set_mode_while_dodging() {
        let (mut pilot, _sink) = started();
        pilot.dodge(DodgeCommand::Enter(5.0));
        pilot.set_mode("wind").unwrap();
        assert_eq!(pilot.device_status().mode, Some(PilotMode::Wind));
        assert_eq!(pilot.device_status().dodge, None);

        // the selected mode wins over the saved one
        pilot.dodge(DodgeCommand::Exit);
        assert_eq!(pilot.device_status().mode, Some(PilotMode::Wind));
    }

    #[test]
    fn test_tack_gybe_not_implemented() {
        let (mut pilot, sink) = started();
        let before = pilot.status();
        for direction in [TackGybeDirection::Port, TackGybeDirection::Starboard] {
            let e = pilot.tack(direction).unwrap_err();
            assert!(e.is_not_implemented());
            let e = pilot.gybe(direction).unwrap_err();
            assert_eq!(e, AutopilotError::NotImplemented { operation: "gybe" });
        }
        assert_eq!(pilot.status(), before);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_raise_alarm() {
        let (pilot, sink) = started();
        let kind = pilot.raise_alarm(
            "WP Arrival",
            AlarmPayload::new(AlarmSeverity::Alert, "Arriving at waypoint"),
        );
        assert_eq!(kind, AlarmKind::WaypointArrival);
        let kind = pilot.raise_alarm("Rudder Fault", AlarmPayload::new(AlarmSeverity::Alarm, ""));
        assert_eq!(kind, AlarmKind::Unknown);

        let events = sink.take();
        assert_eq!(
            events[0],
            AutopilotEvent::Alarm {
                device_type: DEVICE_TYPE.to_string(),
                kind: AlarmKind::WaypointArrival,
                payload: AlarmPayload::new(AlarmSeverity::Alert, "Arriving at waypoint"),
            }
        );
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_scenario() {
        let (mut pilot, sink) = started();
        assert_eq!(pilot.status().device.state, Some(PilotState::Off));
        assert_eq!(pilot.status().device.mode, Some(PilotMode::Compass));

        pilot.engage();
        assert!(pilot.status().device.engaged);

        pilot.set_target(1.0).unwrap();
        assert_eq!(pilot.status().device.target, Some(1.0));

        let e = pilot.adjust_target(10.0).unwrap_err();
        assert_eq!(
            e,
            AutopilotError::OutOfRange {
                delta: 10.0,
                candidate: 11.0,
                mode: Some(PilotMode::Compass),
            }
        );
        assert_eq!(pilot.status().device.target, Some(1.0));

        let events = sink.take();
        assert_eq!(events.len(), 2);
        assert_eq!(
            last_update(&events).map(|s| s.target),
            Some(Some(1.0))
        );
    }
}
