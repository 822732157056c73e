//! # skpilot Server
//!
//! Signal K autopilot provider with REST API and WebSocket support.
//!
//! This crate hosts one or more [`skpilot_core::Autopilot`] controllers and
//! exposes them through:
//! - the [`provider::AutopilotProvider`] contract, keyed by device id
//! - a REST API modelled on the Signal K Autopilot API v2
//! - a WebSocket stream of status updates and alarms per device
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    skpilot-server                       │
//! │  ┌─────────────┐  ┌─────────────┐                       │
//! │  │ REST API    │  │ WebSocket   │                       │
//! │  │ (axum)      │  │ (events)    │                       │
//! │  └──────┬──────┘  └──────┬──────┘                       │
//! │         │                │                              │
//! │         ▼                ▼                              │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │         SharedPilots (AutopilotProvider)            ││
//! │  │  - one Mutex<Autopilot> per device                  ││
//! │  │  - watch channel with the last status snapshot      ││
//! │  │  - broadcast channel of AutopilotEvents             ││
//! │  │  - simulated alarm task per device                  ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## REST API
//!
//! All paths are below `/signalk/v2/api/vehicles/self/autopilots`:
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `GET /` | List autopilot devices |
//! | `GET /{id}` | Options and current status |
//! | `GET, PUT /{id}/state` | Operating state |
//! | `GET, PUT /{id}/mode` | Steering mode |
//! | `GET, PUT /{id}/target` | Target in radians |
//! | `PUT /{id}/target/adjust` | Adjust target |
//! | `POST /{id}/engage`, `POST /{id}/disengage` | Engage / disengage |
//! | `POST /{id}/tack/{direction}`, `POST /{id}/gybe/{direction}` | Not implemented |
//! | `POST, PUT, DELETE /{id}/dodge` | Enter / exit dodge |
//! | `WS /{id}/stream` | Update and alarm events |
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `-p, --port` - HTTP server port (default: 6503)
//! - `-v` - Increase verbosity (use multiple times)
//! - `--simulate-alarms` - Raise one random alarm per device after start
//! - `--fake-errors` - Simulate a failed connection to the autopilot

use clap::Parser;
use std::time::Duration;

use skpilot_core::DEVICE_TYPE;

pub mod alarm_sim;
pub mod pilot;
pub mod provider;
pub mod web;

pub use pilot::{PilotError, SharedPilots};
pub use provider::AutopilotProvider;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name under which the provider is registered with the host
pub const PROVIDER_ID: &str = "mock-autopilot-provider";

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Port for webserver
    #[arg(short, long, default_value_t = 6503)]
    pub port: u16,

    /// Autopilot device id, may be repeated. The first one is the default device.
    #[arg(short, long = "device", default_value = DEVICE_TYPE)]
    pub devices: Vec<String>,

    /// Raise one simulated alarm per device at a random moment after start
    #[arg(long, default_value_t = false)]
    pub simulate_alarms: bool,

    /// Earliest simulated alarm, in seconds after start
    #[arg(long, default_value_t = 5)]
    pub alarm_delay_min: u64,

    /// Latest simulated alarm, in seconds after start
    #[arg(long, default_value_t = 30)]
    pub alarm_delay_max: u64,

    /// Fake error mode: every connection attempt to the autopilot fails
    #[arg(long, default_value_t = false)]
    pub fake_errors: bool,
}

/// Runtime configuration of the autopilot host
#[derive(Clone, Debug, PartialEq)]
pub struct PilotConfig {
    pub devices: Vec<String>,
    pub simulate_alarms: bool,
    pub alarm_delay_min: Duration,
    pub alarm_delay_max: Duration,
    pub fake_errors: bool,
}

impl Default for PilotConfig {
    fn default() -> Self {
        PilotConfig {
            devices: vec![DEVICE_TYPE.to_string()],
            simulate_alarms: false,
            alarm_delay_min: Duration::from_secs(5),
            alarm_delay_max: Duration::from_secs(30),
            fake_errors: false,
        }
    }
}

impl From<&Cli> for PilotConfig {
    fn from(args: &Cli) -> Self {
        let mut devices: Vec<String> = Vec::new();
        for id in &args.devices {
            if !devices.contains(id) {
                devices.push(id.clone());
            }
        }
        if devices.is_empty() {
            devices.push(DEVICE_TYPE.to_string());
        }
        let min = args.alarm_delay_min.min(args.alarm_delay_max);
        let max = args.alarm_delay_min.max(args.alarm_delay_max);

        PilotConfig {
            devices,
            simulate_alarms: args.simulate_alarms,
            alarm_delay_min: Duration::from_secs(min),
            alarm_delay_max: Duration::from_secs(max),
            fake_errors: args.fake_errors,
        }
    }
}
