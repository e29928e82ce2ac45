use std::time::{Duration, Instant};

use auv_hw::{MotorSpeeds, Sensors, ALL_STOP, FORWARD, TURN};
use tracing::{debug, info, warn};

use crate::control::{correction_speed, turn_error};
use crate::reckoning::DeadReckoner;
use crate::{FaultLatch, MotionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPhase {
    Turning,
    Advancing,
    Done,
}

/// Result of one control iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Progress {
    Drive(MotorSpeeds),
    Finished,
}

/// Turn to a relative heading, then drive straight for a distance.
pub(crate) struct TurnAdvance {
    target_heading: f64,
    distance_m: f64,
    phase: NavPhase,
    settled: u32,
    reckoner: DeadReckoner,
    deadline: Instant,
    heading_fault: FaultLatch,
    accel_fault: FaultLatch,
}

impl TurnAdvance {
    pub(crate) fn start(
        cfg: &MotionConfig,
        sensors: &Sensors,
        distance_m: f64,
        turn_deg: f64,
        now: Instant,
    ) -> Self {
        let mut phase = NavPhase::Turning;
        let heading = match sensors.heading_deg() {
            Ok(h) => h,
            Err(e) => {
                warn!("motion: heading unavailable ({}), assuming 0", e);
                if !sensors.has_imu() {
                    warn!("motion: no IMU, skipping turn and advance");
                    phase = NavPhase::Done;
                }
                0.0
            }
        };
        let target_heading = (heading + turn_deg).rem_euclid(360.0);
        info!(
            "motion: turn {:+.0} deg to {:.1}, then advance {:.1} m",
            turn_deg, target_heading, distance_m
        );

        Self {
            target_heading,
            distance_m,
            phase,
            settled: 0,
            reckoner: DeadReckoner::new(cfg.accel_noise_gate, cfg.stillness_samples),
            deadline: now + Duration::from_secs(cfg.maneuver_timeout_s),
            heading_fault: FaultLatch::default(),
            accel_fault: FaultLatch::default(),
        }
    }

    pub(crate) fn phase(&self) -> NavPhase {
        self.phase
    }

    #[cfg(test)]
    fn target_heading(&self) -> f64 {
        self.target_heading
    }

    pub(crate) fn position(&self) -> [f64; 2] {
        self.reckoner.position()
    }

    pub(crate) fn step(&mut self, cfg: &MotionConfig, sensors: &Sensors, now: Instant) -> Progress {
        if self.phase != NavPhase::Done && now >= self.deadline {
            warn!(
                "motion: maneuver timed out in {:?} after {} s",
                self.phase, cfg.maneuver_timeout_s
            );
            self.phase = NavPhase::Done;
        }
        match self.phase {
            NavPhase::Turning => self.turn(cfg, sensors, now),
            NavPhase::Advancing => self.advance(cfg, sensors, now),
            NavPhase::Done => Progress::Finished,
        }
    }

    fn turn(&mut self, cfg: &MotionConfig, sensors: &Sensors, now: Instant) -> Progress {
        let heading = match sensors.heading_deg() {
            Ok(h) => {
                self.heading_fault.clear("heading");
                h
            }
            Err(e) => {
                // no steering blind; retried next tick
                self.heading_fault.fail("heading", &e);
                return Progress::Drive(ALL_STOP);
            }
        };

        let error = turn_error(self.target_heading, heading);
        if error.abs() <= cfg.heading_tolerance_deg {
            self.settled += 1;
            if self.settled >= cfg.settle_reads {
                debug!("motion: heading {:.1} reached, advancing", heading);
                self.settled = 0;
                self.phase = NavPhase::Advancing;
                self.reckoner.reset();
                // time base for the first integration step
                if let Ok(a) = sensors.linear_acceleration() {
                    self.reckoner.update([a[0], a[1]], now);
                }
            }
            return Progress::Drive(ALL_STOP);
        }
        self.settled = 0;

        let mut speeds = ALL_STOP;
        speeds[TURN] = correction_speed(error, cfg.max_correction);
        Progress::Drive(speeds)
    }

    fn advance(&mut self, cfg: &MotionConfig, sensors: &Sensors, now: Instant) -> Progress {
        let accel = match sensors.linear_acceleration() {
            Ok(a) => {
                self.accel_fault.clear("acceleration");
                a
            }
            Err(e) => {
                self.accel_fault.fail("acceleration", &e);
                return Progress::Drive(ALL_STOP);
            }
        };
        let position = self.reckoner.update([accel[0], accel[1]], now);

        let error = self.distance_m - position[0];
        if error.abs() <= cfg.distance_tolerance_m {
            self.settled += 1;
            if self.settled >= cfg.settle_reads {
                info!("motion: advanced {:.2} m", position[0]);
                self.phase = NavPhase::Done;
                return Progress::Finished;
            }
        } else {
            self.settled = 0;
        }

        let mut speeds = ALL_STOP;
        speeds[FORWARD] = correction_speed(error, cfg.max_correction);
        // yaw hold; a missed heading read only skips the correction
        if let Ok(h) = sensors.heading_deg() {
            let drift = turn_error(self.target_heading, h);
            speeds[TURN] = correction_speed(drift * cfg.heading_hold_gain, cfg.max_correction);
        }
        Progress::Drive(speeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auv_hw::sim::{SimImu, SimImuHandle, SimPressure};
    use auv_hw::DepthGauge;

    fn sensors(heading: f64) -> (Sensors, SimImuHandle) {
        let (imu, handle) = SimImu::new(heading);
        let (p, _) = SimPressure::new(0.0);
        let s = Sensors::new(DepthGauge::new(Some(Box::new(p))), Some(Box::new(imu)));
        (s, handle)
    }

    #[test]
    fn test_turn_direction_and_settle() {
        let cfg = MotionConfig::default();
        let (s, imu) = sensors(350.0);
        let t0 = Instant::now();
        let mut nav = TurnAdvance::start(&cfg, &s, 0.0, 20.0, t0);
        assert_eq!(nav.target_heading(), 10.0);

        match nav.step(&cfg, &s, t0) {
            Progress::Drive(sp) => assert_eq!(sp[TURN], 20.0),
            other => panic!("unexpected {other:?}"),
        }

        imu.set_heading(15.0);
        match nav.step(&cfg, &s, t0) {
            Progress::Drive(sp) => assert_eq!(sp[TURN], -5.0),
            other => panic!("unexpected {other:?}"),
        }

        imu.set_heading(10.5);
        nav.step(&cfg, &s, t0);
        assert_eq!(nav.phase(), NavPhase::Turning);
        nav.step(&cfg, &s, t0);
        assert_eq!(nav.phase(), NavPhase::Advancing);
    }

    #[test]
    fn test_settle_needs_consecutive_reads() {
        let cfg = MotionConfig::default();
        let (s, imu) = sensors(0.0);
        let t0 = Instant::now();
        let mut nav = TurnAdvance::start(&cfg, &s, 0.0, 0.0, t0);
        nav.step(&cfg, &s, t0);
        imu.set_heading(5.0);
        nav.step(&cfg, &s, t0);
        imu.set_heading(0.0);
        nav.step(&cfg, &s, t0);
        assert_eq!(nav.phase(), NavPhase::Turning);
        nav.step(&cfg, &s, t0);
        assert_eq!(nav.phase(), NavPhase::Advancing);
    }

    #[test]
    fn test_advance_reaches_distance() {
        let cfg = MotionConfig::default();
        let (s, imu) = sensors(0.0);
        let t0 = Instant::now();
        let mut nav = TurnAdvance::start(&cfg, &s, 1.0, 0.0, t0);
        nav.step(&cfg, &s, t0);
        nav.step(&cfg, &s, t0);
        assert_eq!(nav.phase(), NavPhase::Advancing);

        // 2 m/s² for 1 s covers 1 m
        imu.set_accel([2.0, 0.0, 0.0]);
        let mut t = t0;
        let mut first = None;
        for _ in 0..100 {
            t += Duration::from_millis(10);
            let p = nav.step(&cfg, &s, t);
            first.get_or_insert(p);
        }
        match first {
            Some(Progress::Drive(sp)) => assert!((sp[FORWARD] - 1.0).abs() < 1e-3),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(nav.phase(), NavPhase::Done);
        assert!((nav.position()[0] - 1.0).abs() <= cfg.distance_tolerance_m);
        assert_eq!(nav.phase(), NavPhase::Done);
    }

    #[test]
    fn test_failed_heading_read_stops_turn() {
        let cfg = MotionConfig::default();
        let (s, imu) = sensors(0.0);
        let t0 = Instant::now();
        let mut nav = TurnAdvance::start(&cfg, &s, 0.0, 90.0, t0);
        assert!(matches!(nav.step(&cfg, &s, t0), Progress::Drive(sp) if sp[TURN] == 25.0));

        imu.set_failing(true);
        for i in 1..=10 {
            let t = t0 + Duration::from_millis(5 * i);
            assert_eq!(nav.step(&cfg, &s, t), Progress::Drive(ALL_STOP));
        }
        assert_eq!(nav.phase(), NavPhase::Turning);

        imu.set_failing(false);
        assert!(matches!(nav.step(&cfg, &s, t0 + Duration::from_millis(100)), Progress::Drive(sp) if sp[TURN] == 25.0));
    }

    #[test]
    fn test_failed_accel_read_stops_advance() {
        let cfg = MotionConfig::default();
        let (s, imu) = sensors(0.0);
        let t0 = Instant::now();
        let mut nav = TurnAdvance::start(&cfg, &s, 5.0, 0.0, t0);
        nav.step(&cfg, &s, t0);
        nav.step(&cfg, &s, t0);
        assert_eq!(nav.phase(), NavPhase::Advancing);
        assert!(matches!(nav.step(&cfg, &s, t0 + Duration::from_millis(5)), Progress::Drive(sp) if sp[FORWARD] > 0.0));

        imu.set_failing(true);
        assert_eq!(nav.step(&cfg, &s, t0 + Duration::from_millis(10)), Progress::Drive(ALL_STOP));
        assert_eq!(nav.phase(), NavPhase::Advancing);
    }

    #[test]
    fn test_missing_imu_skips_maneuver() {
        let cfg = MotionConfig::default();
        let (p, _) = SimPressure::new(0.0);
        let s = Sensors::new(DepthGauge::new(Some(Box::new(p))), None);
        let t0 = Instant::now();
        let mut nav = TurnAdvance::start(&cfg, &s, 5.0, 90.0, t0);
        assert_eq!(nav.target_heading(), 90.0);
        assert_eq!(nav.step(&cfg, &s, t0), Progress::Finished);
    }

    #[test]
    fn test_maneuver_timeout() {
        let cfg = MotionConfig::default();
        let (s, _imu) = sensors(0.0);
        let t0 = Instant::now();
        let mut nav = TurnAdvance::start(&cfg, &s, 0.0, 90.0, t0);
        assert!(matches!(nav.step(&cfg, &s, t0), Progress::Drive(_)));
        let late = t0 + Duration::from_secs(cfg.maneuver_timeout_s);
        assert_eq!(nav.step(&cfg, &s, late), Progress::Finished);
    }
}
