use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use auv_hw::{lock, MotorArray, MotorSpeeds, Sensors, ALL_STOP, FORWARD, MAX_MOTOR_SPEED, TURN};
use auv_link::{FailsafeActuator, LinkWatch};
use tracing::{debug, info, warn};

use crate::dive::{vertical, Dive, DivePhase};
use crate::motor_test::MotorTest;
use crate::turn::{NavPhase, Progress, TurnAdvance};
use crate::{MotionConfig, MotionError, MotionTask};

enum Active {
    Navigate(TurnAdvance),
    MotorTest(MotorTest),
}

struct Executor {
    motors: Box<dyn MotorArray>,
    active: Option<Active>,
    dive: Option<Dive>,
    last_output: MotorSpeeds,
    position: [f64; 2],
    write_failed: bool,
}

impl Executor {
    fn write(&mut self, speeds: MotorSpeeds) {
        let speeds = speeds.map(|v| v.clamp(-MAX_MOTOR_SPEED, MAX_MOTOR_SPEED));
        match self.motors.update_motor_speeds(speeds) {
            Ok(()) => {
                if self.write_failed {
                    info!("motion: motor output restored");
                    self.write_failed = false;
                }
            }
            Err(e) => {
                if !self.write_failed {
                    warn!("motion: motor write failed: {}", e);
                    self.write_failed = true;
                }
            }
        }
        self.last_output = speeds;
    }

    fn stop(&mut self) {
        self.active = None;
        self.dive = None;
        self.write(ALL_STOP);
    }
}

/// Single-consumer motion executor.
///
/// Producers push onto a FIFO; [`MotionEngine::run_tick`] runs one control
/// iteration while holding the executor lock. [`MotionEngine::halt`] takes the
/// same lock, so once it returns nothing queued before it can reach the motors.
pub struct MotionEngine {
    cfg: MotionConfig,
    link: LinkWatch,
    sensors: Sensors,
    queue: Mutex<VecDeque<MotionTask>>,
    exec: Mutex<Executor>,
    flush_requested: AtomicBool,
}

impl MotionEngine {
    pub fn new(cfg: MotionConfig, link: LinkWatch, sensors: Sensors, motors: Box<dyn MotorArray>) -> Self {
        Self {
            cfg,
            link,
            sensors,
            queue: Mutex::new(VecDeque::new()),
            exec: Mutex::new(Executor {
                motors,
                active: None,
                dive: None,
                last_output: ALL_STOP,
                position: [0.0; 2],
                write_failed: false,
            }),
            flush_requested: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.cfg
    }

    pub fn sensors(&self) -> &Sensors {
        &self.sensors
    }

    /// Queues a task. Operator motion is refused while the link is down; a
    /// motor test is a bench operation and always accepted.
    pub fn enqueue(&self, task: MotionTask) -> Result<(), MotionError> {
        match task {
            MotionTask::TurnAndAdvance { .. } if !self.link.is_connected() => {
                return Err(MotionError::LinkDown("navigate"))
            }
            MotionTask::Teleop { .. } if !self.link.is_connected() => {
                return Err(MotionError::LinkDown("teleop"))
            }
            _ => {}
        }
        debug!("motion: queued {:?}", task);
        lock(&self.queue).push_back(task);
        Ok(())
    }

    /// Drops queued and running tasks, ends any dive and zeroes the motors.
    pub fn halt(&self) {
        let mut exec = lock(&self.exec);
        let dropped = {
            let mut q = lock(&self.queue);
            let n = q.len();
            q.clear();
            n
        };
        if exec.active.is_some() || exec.dive.is_some() || dropped > 0 {
            info!("motion: halt ({} queued task(s) dropped)", dropped);
        }
        exec.stop();
    }

    /// One control iteration. A dive owns the motors until it surfaces;
    /// otherwise the running task steps, or the next queued task starts.
    pub fn run_tick(&self, now: Instant) {
        let mut exec = lock(&self.exec);

        if let Some(dive) = exec.dive.as_mut() {
            let step = dive.step(&self.cfg, &self.sensors, now);
            let surfaced = dive.phase() == DivePhase::Surfaced;
            if step.flush_radio {
                self.flush_requested.store(true, Ordering::SeqCst);
            }
            exec.write(step.speeds);
            if surfaced {
                exec.dive = None;
            }
            return;
        }

        if exec.active.is_none() {
            let next = lock(&self.queue).pop_front();
            match next {
                None => return,
                Some(MotionTask::Teleop { x, y, vertical }) => {
                    let speeds = self.teleop_speeds(x, y, vertical);
                    exec.write(speeds);
                    return;
                }
                Some(MotionTask::TurnAndAdvance { distance_m, turn_deg }) => {
                    let nav = TurnAdvance::start(&self.cfg, &self.sensors, distance_m, turn_deg, now);
                    exec.position = [0.0; 2];
                    exec.active = Some(Active::Navigate(nav));
                }
                Some(MotionTask::MotorTest(select)) => {
                    let slot = Duration::from_millis(self.cfg.motor_test_ms);
                    exec.active = Some(Active::MotorTest(MotorTest::new(select, slot)));
                }
            }
        }

        let (progress, position) = match exec.active.as_mut() {
            Some(Active::Navigate(nav)) => {
                let p = nav.step(&self.cfg, &self.sensors, now);
                (p, Some(nav.position()))
            }
            Some(Active::MotorTest(t)) => (t.step(now), None),
            None => return,
        };
        if let Some(pos) = position {
            exec.position = pos;
        }

        match progress {
            Progress::Drive(speeds) => exec.write(speeds),
            Progress::Finished => {
                exec.active = None;
                exec.write(ALL_STOP);
            }
        }
    }

    /// Starts a dive. Pending and running tasks are dropped and the motors
    /// zeroed before the descent begins on the next tick.
    pub fn dive(&self, target_depth_m: f64, now: Instant) {
        let mut exec = lock(&self.exec);
        lock(&self.queue).clear();
        exec.stop();
        exec.dive = Some(Dive::new(target_depth_m, now));
    }

    pub fn nav_phase(&self) -> Option<NavPhase> {
        match lock(&self.exec).active.as_ref() {
            Some(Active::Navigate(nav)) => Some(nav.phase()),
            _ => None,
        }
    }

    pub fn dive_phase(&self) -> Option<DivePhase> {
        lock(&self.exec).dive.as_ref().map(|d| d.phase())
    }

    /// Ends an ascent early; returns whether one was in progress.
    pub fn interrupt_ascent(&self, now: Instant) -> bool {
        let mut exec = lock(&self.exec);
        let interrupted = exec.dive.as_mut().map(|d| d.interrupt(now)).unwrap_or(false);
        if interrupted {
            exec.stop();
        }
        interrupted
    }

    /// Returns true once after a dive leaves Hold.
    pub fn take_flush_request(&self) -> bool {
        self.flush_requested.swap(false, Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn is_idle(&self) -> bool {
        let exec = lock(&self.exec);
        exec.active.is_none() && exec.dive.is_none() && lock(&self.queue).is_empty()
    }

    /// Dead-reckoned position of the current or last maneuver, metres.
    pub fn position_estimate(&self) -> [f64; 2] {
        lock(&self.exec).position
    }

    pub fn last_output(&self) -> MotorSpeeds {
        lock(&self.exec).last_output
    }

    /// Direct output for missions. Ignored while a task or dive is running.
    pub fn apply_speeds(&self, speeds: MotorSpeeds) -> bool {
        let mut exec = lock(&self.exec);
        if exec.active.is_some() || exec.dive.is_some() {
            return false;
        }
        exec.write(speeds);
        true
    }

    /// Zeroes the motors without touching the queue.
    pub fn zero_motors(&self) {
        lock(&self.exec).write(ALL_STOP);
    }

    fn teleop_speeds(&self, x: i8, y: i8, vertical_mode: bool) -> MotorSpeeds {
        let s = self.cfg.teleop_scale;
        let (x, y) = (f64::from(x) * s, f64::from(y) * s);
        let mut speeds = if vertical_mode {
            // stick up rises
            vertical(-y)
        } else {
            let mut v = ALL_STOP;
            v[FORWARD] = y;
            v
        };
        speeds[TURN] = -x;
        speeds
    }
}

impl FailsafeActuator for MotionEngine {
    fn all_stop(&self) {
        self.halt();
    }

    fn ascend_step(&self, thrust: f64) {
        let depth = self.sensors.depth_m();
        let mut exec = lock(&self.exec);
        exec.active = None;
        exec.dive = None;
        match depth {
            Ok(d) if d > 0.0 => exec.write(vertical(-thrust)),
            _ => exec.write(ALL_STOP),
        }
    }
}
