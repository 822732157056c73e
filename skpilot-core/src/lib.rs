//! # skpilot Core
//!
//! Platform-independent control logic for a Signal K autopilot provider.
//!
//! This crate contains the autopilot state machine with **zero I/O
//! dependencies**. Hardware access is abstracted through the [`DeviceLink`]
//! trait and outbound notifications through the [`EventSink`] trait, so the
//! same controller runs inside the tokio server or any other host.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  skpilot-core (platform-independent, no tokio/async deps)  │
//! │  ├── status/     (device status model & catalog)           │
//! │  ├── controller/ (command validation, dodge state machine) │
//! │  ├── alarm/      (alarm normalization)                     │
//! │  ├── events/     (EventSink emission contract)             │
//! │  └── link/       (DeviceLink, abstracts the hardware)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  skpilot-server         │
//!                 │  (provider, REST, WS)   │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`controller`] - The [`Autopilot`] controller and its commands
//! - [`status`] - [`DeviceStatus`], state/mode enums and the options catalog
//! - [`alarm`] - Raw alarm names to [`AlarmKind`]
//! - [`events`] - [`EventSink`] and [`AutopilotEvent`]
//! - [`link`] - [`DeviceLink`] and [`SimulatedLink`]
//!
//! ## Units
//!
//! Targets are in radians. In wind mode the target is a signed wind angle in
//! `[-π, π]`; in every other mode it is a heading in `[0, 2π]`.

pub mod alarm;
pub mod controller;
pub mod error;
pub mod events;
pub mod link;
pub mod status;

// Re-export commonly used types
pub use alarm::{AlarmKind, AlarmPayload, AlarmSeverity};
pub use controller::{Autopilot, DodgeCommand, TackGybeDirection, DEVICE_TYPE};
pub use error::AutopilotError;
pub use events::{AutopilotEvent, EventSink, NullSink};
pub use link::{DeviceLink, SimulatedLink};
pub use status::{AutopilotStatus, DeviceStatus, PilotMode, PilotOptions, PilotState, StateOption};
