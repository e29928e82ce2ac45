//! Motion execution: a single-consumer task queue that turns navigate,
//! teleop, dive and motor-test requests into closed-loop motor output.

pub mod control;
pub mod dive;
mod engine;
mod motor_test;
pub mod reckoning;
mod turn;

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub use dive::DivePhase;
pub use engine::MotionEngine;
pub use turn::NavPhase;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionTask {
    TurnAndAdvance { distance_m: f64, turn_deg: f64 },
    Teleop { x: i8, y: i8, vertical: bool },
    MotorTest(MotorSelect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorSelect {
    Forward,
    Turn,
    Front,
    Back,
    All,
}

impl FromStr for MotorSelect {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FORWARD" => Ok(MotorSelect::Forward),
            "TURN" => Ok(MotorSelect::Turn),
            "FRONT" => Ok(MotorSelect::Front),
            "BACK" => Ok(MotorSelect::Back),
            "ALL" => Ok(MotorSelect::All),
            _ => Err(MotionError::UnknownMotor(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MotionError {
    #[error("link down, refusing {0}")]
    LinkDown(&'static str),
    #[error("no motor named {0:?}")]
    UnknownMotor(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Motion consumer period.
    pub control_period_ms: u64,
    /// Saturation of the bounded correction output.
    pub max_correction: f64,
    pub heading_tolerance_deg: f64,
    pub distance_tolerance_m: f64,
    /// Consecutive in-tolerance reads that end a phase.
    pub settle_reads: u32,
    /// Acceleration magnitude per axis treated as rest, m/s².
    pub accel_noise_gate: f64,
    /// Consecutive rest samples after which velocity is forced to zero.
    pub stillness_samples: u32,
    /// Gain on heading error while advancing.
    pub heading_hold_gain: f64,
    /// Upper bound on a single turn-and-advance.
    pub maneuver_timeout_s: u64,
    /// Vertical-pair thrust for dives.
    pub dive_speed: f64,
    /// Bounds the descent, and the ascent when no depth reading is available.
    pub dive_timeout_s: u64,
    pub dive_hold_s: u64,
    /// Teleop stick units (±100) to motor speed.
    pub teleop_scale: f64,
    pub motor_test_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            control_period_ms: 5,
            max_correction: 25.0,
            heading_tolerance_deg: 1.0,
            distance_tolerance_m: 0.1,
            settle_reads: 2,
            accel_noise_gate: 0.5,
            stillness_samples: 5,
            heading_hold_gain: 0.2,
            maneuver_timeout_s: 120,
            dive_speed: 100.0,
            dive_timeout_s: 60,
            dive_hold_s: 10,
            teleop_scale: 1.5,
            motor_test_ms: 1_000,
        }
    }
}

impl MotionConfig {
    pub fn control_period(&self) -> Duration {
        Duration::from_millis(self.control_period_ms.max(1))
    }
}

/// Logs a sensor fault once when it starts and once when it clears, however
/// many control ticks it spans.
#[derive(Debug, Default)]
pub(crate) struct FaultLatch {
    active: bool,
}

impl FaultLatch {
    pub(crate) fn fail(&mut self, what: &str, err: &dyn std::fmt::Display) {
        if !self.active {
            warn!("motion: {} read failed: {}; retrying", what, err);
            self.active = true;
        }
    }

    pub(crate) fn clear(&mut self, what: &str) {
        if self.active {
            info!("motion: {} readings restored", what);
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_names() {
        assert_eq!("forward".parse::<MotorSelect>(), Ok(MotorSelect::Forward));
        assert_eq!("ALL".parse::<MotorSelect>(), Ok(MotorSelect::All));
        assert!("LEFT".parse::<MotorSelect>().is_err());
    }
}
