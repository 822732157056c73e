//! Device link abstraction
//!
//! The controller reaches its hardware through a [`DeviceLink`]. This
//! crate only ships [`SimulatedLink`]; a shell talking to a real autopilot
//! (serial, NMEA 2000, ...) implements the trait for its own transport.

use crate::error::AutopilotError;

/// Connection to the autopilot hardware
pub trait DeviceLink: Send {
    /// Perform the connection handshake.
    ///
    /// Called by `start()`. A failure leaves the device `off-line`.
    fn connect(&mut self, device_type: &str) -> Result<(), AutopilotError>;

    /// Release the connection. Must be safe to call when not connected.
    fn disconnect(&mut self) {}
}

/// In-memory stand-in for a hardware link
#[derive(Debug, Clone, Default)]
pub struct SimulatedLink {
    fail_connect: bool,
    connected: bool,
}

impl SimulatedLink {
    /// A link whose handshake always succeeds
    pub fn new() -> Self {
        SimulatedLink::default()
    }

    /// A link whose handshake always fails
    pub fn failing() -> Self {
        SimulatedLink {
            fail_connect: true,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl DeviceLink for SimulatedLink {
    fn connect(&mut self, device_type: &str) -> Result<(), AutopilotError> {
        if self.fail_connect {
            self.connected = false;
            return Err(AutopilotError::ConnectionFailure(format!(
                "simulated device {} did not answer",
                device_type
            )));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}
