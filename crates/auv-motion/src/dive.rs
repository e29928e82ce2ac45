//! Dive to a target depth, hold out of radio contact, then surface.

use std::time::{Duration, Instant};

use auv_hw::{MotorSpeeds, Sensors, ALL_STOP, BACK, FRONT};
use tracing::{info, warn};

use crate::{FaultLatch, MotionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivePhase {
    Descend,
    Hold,
    Ascend,
    Surfaced,
}

impl DivePhase {
    /// Descend and Hold take the vehicle out of radio contact.
    pub fn is_submerged_silent(self) -> bool {
        matches!(self, DivePhase::Descend | DivePhase::Hold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DiveStep {
    pub speeds: MotorSpeeds,
    /// Set once, on leaving Hold: stale radio input should be discarded.
    pub flush_radio: bool,
}

pub(crate) struct Dive {
    target_m: f64,
    phase: DivePhase,
    since: Instant,
    depth_fault: FaultLatch,
}

/// Vertical-pair vector; positive drives the vehicle down.
pub fn vertical(speed: f64) -> MotorSpeeds {
    let mut s = ALL_STOP;
    s[FRONT] = speed;
    s[BACK] = speed;
    s
}

impl Dive {
    pub(crate) fn new(target_m: f64, now: Instant) -> Self {
        info!("motion: dive to {:.1} m", target_m);
        Self { target_m, phase: DivePhase::Descend, since: now, depth_fault: FaultLatch::default() }
    }

    pub(crate) fn phase(&self) -> DivePhase {
        self.phase
    }

    pub(crate) fn step(&mut self, cfg: &MotionConfig, sensors: &Sensors, now: Instant) -> DiveStep {
        let elapsed = now.saturating_duration_since(self.since);
        let mut flush_radio = false;

        let speeds = match self.phase {
            DivePhase::Descend => {
                let reached = self.read_depth(sensors).map(|d| d >= self.target_m).unwrap_or(false);
                if reached {
                    info!("motion: reached {:.1} m, holding", self.target_m);
                    self.enter(DivePhase::Hold, now);
                    ALL_STOP
                } else if elapsed >= Duration::from_secs(cfg.dive_timeout_s) {
                    warn!("motion: descent timed out after {} s, holding", cfg.dive_timeout_s);
                    self.enter(DivePhase::Hold, now);
                    ALL_STOP
                } else {
                    vertical(cfg.dive_speed)
                }
            }
            DivePhase::Hold => {
                if elapsed >= Duration::from_secs(cfg.dive_hold_s) {
                    info!("motion: hold complete, ascending");
                    self.enter(DivePhase::Ascend, now);
                    flush_radio = true;
                    vertical(-cfg.dive_speed)
                } else {
                    ALL_STOP
                }
            }
            DivePhase::Ascend => match self.read_depth(sensors) {
                Some(d) if d <= 0.0 => {
                    info!("motion: surfaced");
                    self.enter(DivePhase::Surfaced, now);
                    ALL_STOP
                }
                None if elapsed >= Duration::from_secs(cfg.dive_timeout_s) => {
                    warn!("motion: no depth reading for {} s of ascent, stopping", cfg.dive_timeout_s);
                    self.enter(DivePhase::Surfaced, now);
                    ALL_STOP
                }
                _ => vertical(-cfg.dive_speed),
            },
            DivePhase::Surfaced => ALL_STOP,
        };

        DiveStep { speeds, flush_radio }
    }

    /// Operator contact during the ascent ends the dive where it is.
    pub(crate) fn interrupt(&mut self, now: Instant) -> bool {
        if self.phase != DivePhase::Ascend {
            return false;
        }
        info!("motion: ascent interrupted by base station");
        self.enter(DivePhase::Surfaced, now);
        true
    }

    fn enter(&mut self, phase: DivePhase, now: Instant) {
        self.phase = phase;
        self.since = now;
    }

    fn read_depth(&mut self, sensors: &Sensors) -> Option<f64> {
        match sensors.depth_m() {
            Ok(d) => {
                self.depth_fault.clear("depth");
                Some(d)
            }
            Err(e) => {
                self.depth_fault.fail("depth", &e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auv_hw::sim::{SimPressure, SimPressureHandle};
    use auv_hw::DepthGauge;

    fn sensors(depth: f64) -> (Sensors, SimPressureHandle) {
        let (p, h) = SimPressure::new(depth);
        (Sensors::new(DepthGauge::new(Some(Box::new(p))), None), h)
    }

    #[test]
    fn test_full_profile() {
        let cfg = MotionConfig::default();
        let (s, depth) = sensors(0.0);
        let t0 = Instant::now();
        let mut dive = Dive::new(5.0, t0);

        let st = dive.step(&cfg, &s, t0);
        assert_eq!(st.speeds, vertical(100.0));
        assert_eq!(dive.phase(), DivePhase::Descend);

        depth.set_depth(5.2);
        assert_eq!(dive.step(&cfg, &s, t0 + Duration::from_secs(20)).speeds, ALL_STOP);
        assert_eq!(dive.phase(), DivePhase::Hold);

        let st = dive.step(&cfg, &s, t0 + Duration::from_secs(25));
        assert!(!st.flush_radio);
        let st = dive.step(&cfg, &s, t0 + Duration::from_secs(30));
        assert!(st.flush_radio);
        assert_eq!(st.speeds, vertical(-100.0));
        assert_eq!(dive.phase(), DivePhase::Ascend);

        depth.set_depth(0.0);
        dive.step(&cfg, &s, t0 + Duration::from_secs(40));
        assert_eq!(dive.phase(), DivePhase::Surfaced);
    }

    #[test]
    fn test_descent_timeout() {
        let cfg = MotionConfig::default();
        let (s, _depth) = sensors(1.0);
        let t0 = Instant::now();
        let mut dive = Dive::new(40.0, t0);
        dive.step(&cfg, &s, t0 + Duration::from_secs(59));
        assert_eq!(dive.phase(), DivePhase::Descend);
        dive.step(&cfg, &s, t0 + Duration::from_secs(60));
        assert_eq!(dive.phase(), DivePhase::Hold);
    }

    #[test]
    fn test_failed_reads_keep_thrust() {
        let cfg = MotionConfig::default();
        let (s, depth) = sensors(0.0);
        let t0 = Instant::now();
        let mut dive = Dive::new(3.0, t0);
        depth.set_failing(true);
        for i in 0..10 {
            let st = dive.step(&cfg, &s, t0 + Duration::from_millis(100 * i));
            assert_eq!(st.speeds, vertical(100.0));
        }
        depth.set_depth(3.0);
        depth.set_failing(false);
        dive.step(&cfg, &s, t0 + Duration::from_secs(2));
        assert_eq!(dive.phase(), DivePhase::Hold);
    }

    #[test]
    fn test_ascent_without_depth_sensor_times_out() {
        let cfg = MotionConfig::default();
        let s = Sensors::new(DepthGauge::new(None), None);
        let t0 = Instant::now();
        let mut dive = Dive::new(3.0, t0);
        dive.enter(DivePhase::Ascend, t0);
        assert_eq!(dive.step(&cfg, &s, t0 + Duration::from_secs(59)).speeds, vertical(-100.0));
        assert_eq!(dive.phase(), DivePhase::Ascend);
        assert_eq!(dive.step(&cfg, &s, t0 + Duration::from_secs(60)).speeds, ALL_STOP);
        assert_eq!(dive.phase(), DivePhase::Surfaced);
    }

    #[test]
    fn test_ascent_with_depth_reading_has_no_timeout() {
        let cfg = MotionConfig::default();
        let (s, _depth) = sensors(20.0);
        let t0 = Instant::now();
        let mut dive = Dive::new(20.0, t0);
        dive.enter(DivePhase::Ascend, t0);
        assert_eq!(dive.step(&cfg, &s, t0 + Duration::from_secs(90)).speeds, vertical(-100.0));
        assert_eq!(dive.phase(), DivePhase::Ascend);
    }

    #[test]
    fn test_interrupt_only_during_ascent() {
        let t0 = Instant::now();
        let mut dive = Dive::new(3.0, t0);
        assert!(!dive.interrupt(t0));
        dive.enter(DivePhase::Ascend, t0);
        assert!(dive.interrupt(t0));
        assert_eq!(dive.phase(), DivePhase::Surfaced);
    }
}
