//! Alarm normalization
//!
//! Autopilot devices report alarms as free-form text. The Signal K
//! Autopilot API only knows a closed set of alarm ids, so raw names are
//! mapped through a fixed table. Anything not in the table becomes
//! [`AlarmKind::Unknown`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Normalized alarm ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AlarmKind {
    WaypointArrival,
    WaypointAdvance,
    RouteComplete,
    /// Cross track error
    Xte,
    Heading,
    Wind,
    Unknown,
}

/// Device alarm text mapped to normalized ids
pub const ALARM_TABLE: [(&str, AlarmKind); 6] = [
    ("WP Arrival", AlarmKind::WaypointArrival),
    ("Pilot Way Point Advance", AlarmKind::WaypointAdvance),
    ("Pilot Route Complete", AlarmKind::RouteComplete),
    ("XTE Alarm", AlarmKind::Xte),
    ("Heading Drift Alarm", AlarmKind::Heading),
    ("Wind Alarm", AlarmKind::Wind),
];

impl AlarmKind {
    /// Map a raw device alarm name to its normalized id.
    ///
    /// Matching is exact (case sensitive), as devices send fixed strings.
    pub fn normalize(raw: &str) -> AlarmKind {
        ALARM_TABLE
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, kind)| *kind)
            .unwrap_or(AlarmKind::Unknown)
    }
}

/// Notification severity, as used by Signal K notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlarmSeverity {
    Normal,
    Alert,
    Warn,
    Alarm,
    Emergency,
}

/// Payload delivered with an alarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub state: AlarmSeverity,
    pub message: String,
}

impl AlarmPayload {
    pub fn new<S: Into<String>>(state: AlarmSeverity, message: S) -> Self {
        AlarmPayload {
            state,
            message: message.into(),
        }
    }
}
