//! Simulated device alarms
//!
//! A real autopilot raises alarms on its own schedule. To exercise that path
//! without hardware, each started device gets one alarm at a random moment
//! after `start()`. The alarm runs as a spawned task owned by the device and
//! is cancelled through its [`CancellationToken`] when the device stops or
//! restarts, so repeated start/stop cycles never leave stray timers behind.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use skpilot_core::{AlarmKind, AlarmPayload, AlarmSeverity};
use tokio_util::sync::CancellationToken;

/// Raw alarm names the simulated device may send.
///
/// The last one is not in the normalization table on purpose.
pub const SIMULATED_ALARMS: [&str; 7] = [
    "WP Arrival",
    "Pilot Way Point Advance",
    "Pilot Route Complete",
    "XTE Alarm",
    "Heading Drift Alarm",
    "Wind Alarm",
    "Pilot Rudder Feedback Fault",
];

/// Pick a delay in `[min, max]`
pub fn random_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

/// Pick one of [`SIMULATED_ALARMS`]
pub fn random_alarm() -> &'static str {
    SIMULATED_ALARMS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(SIMULATED_ALARMS[0])
}

/// Payload the simulated device sends with `raw_id`
pub fn simulated_payload(raw_id: &str) -> AlarmPayload {
    let state = match AlarmKind::normalize(raw_id) {
        AlarmKind::WaypointArrival | AlarmKind::WaypointAdvance | AlarmKind::RouteComplete => {
            AlarmSeverity::Alert
        }
        AlarmKind::Xte | AlarmKind::Heading | AlarmKind::Wind => AlarmSeverity::Warn,
        AlarmKind::Unknown => AlarmSeverity::Alarm,
    };
    AlarmPayload::new(state, raw_id)
}

/// Run `fire` once after `delay`, unless the returned token is cancelled first.
///
/// `fire` gets the token so it can check for a cancellation that raced with
/// the timer. The token is cancelled once `fire` returns.
///
/// Must be called from within a tokio runtime. Returns immediately.
pub fn schedule_once<F>(name: String, delay: Duration, fire: F) -> CancellationToken
where
    F: FnOnce(&CancellationToken) + Send + 'static,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();

    log::debug!("{}: simulated alarm in {:?}", name, delay);
    tokio::spawn(async move {
        tokio::select! {
            _ = cancelled.cancelled() => {
                log::debug!("{}: simulated alarm cancelled", name);
            }
            _ = tokio::time::sleep(delay) => {
                fire(&cancelled);
                cancelled.cancel();
            }
        }
    });

    token
}
