pub mod radio;
pub mod state;
pub mod supervisor;

use serde::Deserialize;
use std::time::Duration;

pub use radio::{LinkError, Radio};
pub use state::{LinkHandle, LinkState, LinkStatus, LinkWatch};
pub use supervisor::{ConnectionSupervisor, FailsafeActuator, LinkEvent};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkConfig {
    /// Silence after the last ping before the link is declared lost. Default 6000.
    pub connection_timeout_ms: Option<u64>,
    /// Keep-alive period toward the base station. Default 3000.
    pub ping_interval_ms: Option<u64>,
    /// Receive/dispatch tick. Default 100.
    pub receive_interval_ms: Option<u64>,
    /// Telemetry period while connected. Default 1000.
    pub telemetry_interval_ms: Option<u64>,
    /// Upward thrust on the vertical pair during failsafe ascent. Default 25.
    pub failsafe_ascent_speed: Option<f64>,
}

impl LinkConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms.unwrap_or(6_000))
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms.unwrap_or(3_000))
    }

    pub fn receive_interval(&self) -> Duration {
        Duration::from_millis(self.receive_interval_ms.unwrap_or(100))
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms.unwrap_or(1_000))
    }

    pub fn failsafe_ascent_speed(&self) -> f64 {
        self.failsafe_ascent_speed.unwrap_or(25.0)
    }
}
