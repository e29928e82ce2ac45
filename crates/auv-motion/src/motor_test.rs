use std::time::{Duration, Instant};

use auv_hw::{MotorSpeeds, ALL_STOP, BACK, FORWARD, FRONT, MAX_MOTOR_SPEED, TURN};
use tracing::info;

use crate::turn::Progress;
use crate::MotorSelect;

/// Calibration spin: each selected motor at a sixth of full speed for one
/// slot, one motor at a time.
pub(crate) struct MotorTest {
    motors: Vec<usize>,
    slot: Duration,
    started: Option<Instant>,
    announced: Option<usize>,
}

const TEST_SPEED: f64 = MAX_MOTOR_SPEED / 6.0;

fn motor_name(idx: usize) -> &'static str {
    match idx {
        FORWARD => "forward",
        TURN => "turn",
        FRONT => "front",
        BACK => "back",
        _ => "?",
    }
}

impl MotorTest {
    pub(crate) fn new(select: MotorSelect, slot: Duration) -> Self {
        let motors = match select {
            MotorSelect::Forward => vec![FORWARD],
            MotorSelect::Turn => vec![TURN],
            MotorSelect::Front => vec![FRONT],
            MotorSelect::Back => vec![BACK],
            MotorSelect::All => vec![FORWARD, TURN, FRONT, BACK],
        };
        Self { motors, slot, started: None, announced: None }
    }

    pub(crate) fn step(&mut self, now: Instant) -> Progress {
        let started = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        let idx = (elapsed.as_millis() / self.slot.as_millis().max(1)) as usize;

        match self.motors.get(idx) {
            Some(&motor) => {
                if self.announced.replace(idx) != Some(idx) {
                    info!("motion: testing {} motor", motor_name(motor));
                }
                let mut speeds: MotorSpeeds = ALL_STOP;
                speeds[motor] = TEST_SPEED;
                Progress::Drive(speeds)
            }
            None => Progress::Finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_runs_each_motor_in_turn() {
        let t0 = Instant::now();
        let mut t = MotorTest::new(MotorSelect::All, Duration::from_secs(1));
        let mut seen = Vec::new();
        for ms in (0..4_000).step_by(500) {
            match t.step(t0 + Duration::from_millis(ms)) {
                Progress::Drive(sp) => seen.push(sp.iter().position(|v| *v == 25.0)),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(
            seen,
            vec![Some(0), Some(0), Some(1), Some(1), Some(2), Some(2), Some(3), Some(3)]
        );
        assert_eq!(t.step(t0 + Duration::from_secs(4)), Progress::Finished);
    }

    #[test]
    fn test_single_motor() {
        let t0 = Instant::now();
        let mut t = MotorTest::new(MotorSelect::Back, Duration::from_millis(1_000));
        assert_eq!(t.step(t0), Progress::Drive([0.0, 0.0, 0.0, 25.0]));
        assert_eq!(t.step(t0 + Duration::from_millis(1_000)), Progress::Finished);
    }
}
