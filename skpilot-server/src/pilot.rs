use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio_graceful_shutdown::SubsystemHandle;
use tokio_util::sync::CancellationToken;

use skpilot_core::{
    AlarmKind, AlarmPayload, Autopilot, AutopilotError, AutopilotEvent, AutopilotStatus,
    DeviceStatus, EventSink, PilotState, SimulatedLink,
};

use crate::alarm_sim;
use crate::PilotConfig;

#[derive(Error, Debug)]
pub enum PilotError {
    #[error("{0}")]
    Autopilot(#[from] AutopilotError),
    #[error("No such autopilot device '{0}'")]
    NoSuchDevice(String),
}

// Tell axum how to convert `PilotError` into a response.
impl IntoResponse for PilotError {
    fn into_response(self) -> Response {
        let status = match &self {
            PilotError::NoSuchDevice(_) => StatusCode::NOT_FOUND,
            PilotError::Autopilot(e) if e.is_not_implemented() => StatusCode::NOT_IMPLEMENTED,
            PilotError::Autopilot(AutopilotError::ConnectionFailure(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PilotError::Autopilot(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

///
/// Forwards controller emissions onto a broadcast channel.
///
/// Sending never blocks; with no subscribers the event is dropped.
///
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<AutopilotEvent>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<AutopilotEvent>) -> Self {
        BroadcastSink { tx }
    }
}

impl EventSink for BroadcastSink {
    fn update(&self, device_type: &str, status: &DeviceStatus) {
        log::trace!("{}: update {:?}", device_type, status);
        let _ = self.tx.send(AutopilotEvent::Update {
            device_type: device_type.to_string(),
            status: *status,
        });
    }

    fn alarm(&self, device_type: &str, kind: AlarmKind, payload: &AlarmPayload) {
        let _ = self.tx.send(AutopilotEvent::Alarm {
            device_type: device_type.to_string(),
            kind,
            payload: payload.clone(),
        });
    }
}

/// One hosted autopilot device
pub struct PilotDevice {
    id: String,
    controller: Mutex<Autopilot>,
    /// Last published status, readable without the controller lock
    snapshot: watch::Sender<AutopilotStatus>,
    alarm_timer: Mutex<Option<CancellationToken>>,
}

impl PilotDevice {
    fn new(id: &str, controller: Autopilot) -> Self {
        let (snapshot, _) = watch::channel(controller.status());
        PilotDevice {
            id: id.to_string(),
            controller: Mutex::new(controller),
            snapshot,
            alarm_timer: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock(&self) -> MutexGuard<'_, Autopilot> {
        self.controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a command under the controller lock and publish the new status.
    ///
    /// The lock covers validate-then-apply, so concurrent callers can never
    /// observe or cause a partially applied command.
    pub fn command<T, F>(&self, f: F) -> Result<T, PilotError>
    where
        F: FnOnce(&mut Autopilot) -> Result<T, AutopilotError>,
    {
        let mut controller = self.lock();
        match f(&mut controller) {
            Ok(r) => {
                self.snapshot.send_replace(controller.status());
                Ok(r)
            }
            Err(e) => {
                warn!("{}: {}", self.id, e);
                Err(e.into())
            }
        }
    }

    /// Last published status
    pub fn status(&self) -> AutopilotStatus {
        self.snapshot.borrow().clone()
    }

    /// Receiver that sees every published status
    pub fn watch(&self) -> watch::Receiver<AutopilotStatus> {
        self.snapshot.subscribe()
    }

    pub fn raise_alarm(&self, raw_id: &str, payload: AlarmPayload) -> AlarmKind {
        self.lock().raise_alarm(raw_id, payload)
    }

    /// Lock order is always alarm timer, then controller.
    fn lock_timer(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.alarm_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise a simulated alarm unless its timer was cancelled meanwhile.
    ///
    /// Tokens are only cancelled under the timer lock, so holding it here
    /// keeps a racing `stop()` or restart from letting the alarm through.
    fn fire_alarm(&self, token: &CancellationToken, raw_id: &str) {
        let _timer = self.lock_timer();
        if token.is_cancelled() {
            debug!("{}: simulated alarm {} dropped", self.id, raw_id);
            return;
        }
        self.raise_alarm(raw_id, alarm_sim::simulated_payload(raw_id));
    }

    pub fn has_alarm_timer(&self) -> bool {
        self.lock_timer()
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}

fn cancel_timer(timer: &mut Option<CancellationToken>) {
    if let Some(old) = timer.take() {
        old.cancel();
    }
}

/// Registry of all hosted autopilot devices.
///
/// The set of devices is fixed at construction; each device is its own
/// actor with its own lock.
#[derive(Clone)]
pub struct SharedPilots {
    inner: Arc<PilotsInner>,
}

struct PilotsInner {
    config: PilotConfig,
    devices: BTreeMap<String, Arc<PilotDevice>>,
    events: broadcast::Sender<AutopilotEvent>,
}

impl SharedPilots {
    pub fn new(config: PilotConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let sink = Arc::new(BroadcastSink::new(events.clone()));

        let mut devices = BTreeMap::new();
        for id in &config.devices {
            let link = if config.fake_errors {
                SimulatedLink::failing()
            } else {
                SimulatedLink::new()
            };
            let controller = Autopilot::new(id.as_str(), sink.clone()).with_link(Box::new(link));
            devices.insert(id.clone(), Arc::new(PilotDevice::new(id, controller)));
        }

        SharedPilots {
            inner: Arc::new(PilotsInner {
                config,
                devices,
                events,
            }),
        }
    }

    pub fn config(&self) -> &PilotConfig {
        &self.inner.config
    }

    /// Id of the device used when a host does not name one
    pub fn default_id(&self) -> Option<&str> {
        self.inner.config.devices.first().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.inner.devices.keys().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Result<Arc<PilotDevice>, PilotError> {
        self.inner
            .devices
            .get(id)
            .cloned()
            .ok_or_else(|| PilotError::NoSuchDevice(id.to_string()))
    }

    /// Subscribe to updates and alarms of all devices
    pub fn subscribe(&self) -> broadcast::Receiver<AutopilotEvent> {
        self.inner.events.subscribe()
    }

    /// Start (or restart) a device.
    ///
    /// When alarm simulation is enabled this must run inside a tokio runtime.
    pub fn start(&self, id: &str) -> Result<(), PilotError> {
        let device = self.get(id)?;
        // Held until the new timer is installed, so a concurrent stop()
        // either runs before this start or cancels the timer it installs.
        let mut timer = device.lock_timer();
        cancel_timer(&mut timer);

        let state = device.command(|c| {
            c.start();
            Ok(c.device_status().state)
        })?;

        if state == Some(PilotState::OffLine) {
            warn!("Autopilot device {} is off-line", id);
            return Ok(());
        }
        info!("Autopilot device {} started", id);

        let config = &self.inner.config;
        if config.simulate_alarms {
            let delay = alarm_sim::random_delay(config.alarm_delay_min, config.alarm_delay_max);
            let raw_id = alarm_sim::random_alarm();
            let target = device.clone();
            *timer = Some(alarm_sim::schedule_once(
                id.to_string(),
                delay,
                move |token| target.fire_alarm(token, raw_id),
            ));
        }
        Ok(())
    }

    /// Stop a device, cancelling its pending alarm. Idempotent.
    pub fn stop(&self, id: &str) -> Result<(), PilotError> {
        let device = self.get(id)?;
        let mut timer = device.lock_timer();
        cancel_timer(&mut timer);
        device.command(|c| {
            c.stop();
            Ok(())
        })?;
        debug!("Autopilot device {} stopped", id);
        Ok(())
    }

    pub fn start_all(&self) {
        for id in self.inner.devices.keys() {
            if let Err(e) = self.start(id) {
                warn!("Cannot start autopilot device {}: {}", id, e);
            }
        }
    }

    pub fn stop_all(&self) {
        for id in self.inner.devices.keys() {
            if let Err(e) = self.stop(id) {
                warn!("Cannot stop autopilot device {}: {}", id, e);
            }
        }
    }

    /// Subsystem body: keep the devices running until shutdown is requested.
    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), PilotError> {
        self.start_all();
        subsys.on_shutdown_requested().await;
        info!("Stopping autopilot devices");
        self.stop_all();
        Ok(())
    }
}

impl std::fmt::Debug for SharedPilots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPilots")
            .field("devices", &self.inner.devices.keys().collect::<Vec<_>>())
            .finish()
    }
}
