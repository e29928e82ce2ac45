use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::state::{LinkHandle, LinkState, LinkWatch};
use crate::LinkConfig;

/// What the supervisor drives when the link comes up or goes away.
pub trait FailsafeActuator: Send + Sync {
    /// Drops pending motion and stops every motor.
    fn all_stop(&self);
    /// One failsafe-ascent step: `thrust` upward on the vertical pair while
    /// below the surface, all motors off at the surface or without a depth reading.
    fn ascend_step(&self, thrust: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Established,
    Lost,
}

/// Ping/timeout state machine. Starts `Disconnected`; the sole writer of the
/// link state.
pub struct ConnectionSupervisor {
    link: LinkHandle,
    actuator: Arc<dyn FailsafeActuator>,
    timeout: Duration,
    ascent_thrust: f64,
}

impl ConnectionSupervisor {
    /// `link` carries the boot time the first timeout is measured from.
    pub fn new(cfg: &LinkConfig, link: LinkHandle, actuator: Arc<dyn FailsafeActuator>) -> Self {
        Self {
            link,
            actuator,
            timeout: cfg.connection_timeout(),
            ascent_thrust: cfg.failsafe_ascent_speed(),
        }
    }

    pub fn watch(&self) -> LinkWatch {
        self.link.watch()
    }

    pub fn state(&self) -> LinkState {
        self.link.snapshot().state
    }

    pub fn on_ping(&mut self, now: Instant) -> Option<LinkEvent> {
        self.link.record_ping(now);
        match self.link.set_state(LinkState::Connected) {
            LinkState::Disconnected => {
                info!("link: connection to base station verified");
                // never resume into whatever was commanded before the gap
                self.actuator.all_stop();
                Some(LinkEvent::Established)
            }
            LinkState::Connected => None,
        }
    }

    /// Timeout check. While the link is down past the timeout, every call
    /// re-applies one failsafe-ascent step.
    pub fn on_tick(&mut self, now: Instant) -> Option<LinkEvent> {
        let status = self.link.snapshot();
        if now.saturating_duration_since(status.last_ping_at) <= self.timeout {
            return None;
        }

        let event = match self.link.set_state(LinkState::Disconnected) {
            LinkState::Connected => {
                warn!("link: lost connection to base station, starting failsafe ascent");
                self.actuator.all_stop();
                Some(LinkEvent::Lost)
            }
            LinkState::Disconnected => None,
        };
        self.actuator.ascend_step(self.ascent_thrust);
        event
    }

    /// Keeps the timeout window fresh without a state change, for maneuvers
    /// that take the vehicle out of radio contact on purpose.
    pub fn hold_off(&mut self, now: Instant) {
        self.link.record_ping(now);
    }
}
