use std::time::{Duration, Instant};

use auv_hw::ALL_STOP;
use auv_motion::dive::vertical;
use auv_motion::MotionEngine;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Dispatch ticks a mission may run before it is aborted.
    pub max_iterations: u32,
    pub default_depth_m: f64,
    pub max_depth_m: f64,
    pub default_hold_s: u64,
    /// Depth at which a rising mission counts as surfaced.
    pub near_surface_m: f64,
    pub descend_speed: f64,
    pub rise_speed: f64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 6_000,
            default_depth_m: 5.0,
            max_depth_m: 50.0,
            default_hold_s: 30,
            near_surface_m: 0.5,
            descend_speed: 50.0,
            rise_speed: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionStatus {
    Running,
    Complete,
}

/// An autonomous routine stepped once per dispatch tick.
pub trait Mission: Send {
    fn name(&self) -> &'static str;
    fn step(&mut self, engine: &MotionEngine, now: Instant) -> MissionStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Powered rise after the hold.
    A,
    /// Motors off after the hold; the hull floats up.
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfilePhase {
    Descend,
    Hold { until: Instant },
    Rise,
    Done,
}

/// Descend to a depth, hold there, come back up to near-surface.
pub struct DepthProfileMission {
    kind: ProfileKind,
    target_m: f64,
    hold: Duration,
    near_surface_m: f64,
    descend_speed: f64,
    rise_speed: f64,
    phase: ProfilePhase,
}

impl DepthProfileMission {
    /// Zero depth or duration selects the configured default.
    pub fn new(kind: ProfileKind, depth_m: u8, duration_s: u16, cfg: &MissionConfig) -> Self {
        let target_m = if depth_m == 0 { cfg.default_depth_m } else { f64::from(depth_m) };
        let hold_s = if duration_s == 0 { cfg.default_hold_s } else { u64::from(duration_s) };
        Self {
            kind,
            target_m: target_m.min(cfg.max_depth_m),
            hold: Duration::from_secs(hold_s),
            near_surface_m: cfg.near_surface_m,
            descend_speed: cfg.descend_speed,
            rise_speed: cfg.rise_speed,
            phase: ProfilePhase::Descend,
        }
    }

    pub fn target_m(&self) -> f64 {
        self.target_m
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }
}

impl Mission for DepthProfileMission {
    fn name(&self) -> &'static str {
        match self.kind {
            ProfileKind::A => "depth profile A",
            ProfileKind::B => "depth profile B",
        }
    }

    fn step(&mut self, engine: &MotionEngine, now: Instant) -> MissionStatus {
        let depth = match engine.sensors().depth_m() {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("mission: depth read failed: {}", e);
                None
            }
        };

        self.phase = match (self.phase, depth) {
            (ProfilePhase::Descend, Some(d)) if d >= self.target_m => {
                info!("mission: {:.1} m reached, holding {} s", d, self.hold.as_secs());
                engine.apply_speeds(ALL_STOP);
                ProfilePhase::Hold { until: now + self.hold }
            }
            (ProfilePhase::Descend, _) => {
                engine.apply_speeds(vertical(self.descend_speed));
                ProfilePhase::Descend
            }
            (ProfilePhase::Hold { until }, _) if now >= until => {
                info!("mission: hold complete, rising");
                let rise = match self.kind {
                    ProfileKind::A => vertical(-self.rise_speed),
                    ProfileKind::B => ALL_STOP,
                };
                engine.apply_speeds(rise);
                ProfilePhase::Rise
            }
            (ProfilePhase::Rise, Some(d)) if d <= self.near_surface_m => {
                info!("mission: {} complete at {:.1} m", self.name(), d);
                engine.apply_speeds(ALL_STOP);
                ProfilePhase::Done
            }
            (phase, _) => phase,
        };

        if self.phase == ProfilePhase::Done {
            MissionStatus::Complete
        } else {
            MissionStatus::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auv_hw::sim::{MotorLog, SimMotors, SimPressure, SimPressureHandle};
    use auv_hw::{DepthGauge, Sensors};
    use auv_link::LinkHandle;
    use auv_motion::MotionConfig;

    fn engine() -> (MotionEngine, MotorLog, SimPressureHandle) {
        let (m, log) = SimMotors::new();
        let (p, depth) = SimPressure::new(0.0);
        let sensors = Sensors::new(DepthGauge::new(Some(Box::new(p))), None);
        let link = LinkHandle::new(Instant::now()).watch();
        (MotionEngine::new(MotionConfig::default(), link, sensors, Box::new(m)), log, depth)
    }

    #[test]
    fn test_defaults_and_clamp() {
        let cfg = MissionConfig::default();
        let m = DepthProfileMission::new(ProfileKind::A, 0, 0, &cfg);
        assert_eq!(m.target_m(), 5.0);
        assert_eq!(m.hold(), Duration::from_secs(30));
        let m = DepthProfileMission::new(ProfileKind::A, 63, 12, &cfg);
        assert_eq!(m.target_m(), 50.0);
        assert_eq!(m.hold(), Duration::from_secs(12));
    }

    #[test]
    fn test_profile_a() {
        let (engine, log, depth) = engine();
        let cfg = MissionConfig::default();
        let mut m = DepthProfileMission::new(ProfileKind::A, 4, 10, &cfg);
        let t0 = Instant::now();

        assert_eq!(m.step(&engine, t0), MissionStatus::Running);
        assert_eq!(log.last(), Some(vertical(50.0)));

        depth.set_depth(4.1);
        m.step(&engine, t0 + Duration::from_secs(8));
        assert_eq!(log.last(), Some(ALL_STOP));
        m.step(&engine, t0 + Duration::from_secs(17));
        assert_eq!(log.last(), Some(ALL_STOP));

        m.step(&engine, t0 + Duration::from_secs(18));
        assert_eq!(log.last(), Some(vertical(-50.0)));

        depth.set_depth(0.4);
        assert_eq!(m.step(&engine, t0 + Duration::from_secs(30)), MissionStatus::Complete);
        assert_eq!(log.last(), Some(ALL_STOP));
    }

    #[test]
    fn test_profile_b_floats_up() {
        let (engine, log, depth) = engine();
        let cfg = MissionConfig::default();
        let mut m = DepthProfileMission::new(ProfileKind::B, 2, 1, &cfg);
        let t0 = Instant::now();
        depth.set_depth(2.0);
        m.step(&engine, t0);
        m.step(&engine, t0 + Duration::from_secs(1));
        assert_eq!(log.last(), Some(ALL_STOP));
        assert_eq!(m.step(&engine, t0 + Duration::from_secs(2)), MissionStatus::Running);
        depth.set_depth(0.0);
        assert_eq!(m.step(&engine, t0 + Duration::from_secs(3)), MissionStatus::Complete);
    }
}
