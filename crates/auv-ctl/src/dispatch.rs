use std::sync::Arc;
use std::time::Instant;

use auv_link::{ConnectionSupervisor, LinkEvent, LinkState, Radio};
use auv_motion::{DivePhase, MotionEngine, MotionTask};
use auv_proto::{classify, codec, Action, ActionCode, Command, Frame};
use tracing::{debug, info, warn};

use crate::mission::{DepthProfileMission, Mission, MissionConfig, MissionStatus, ProfileKind};

/// Upper bound on frames drained per tick so a flooding sender cannot starve
/// the timeout check.
const MAX_FRAMES_PER_TICK: usize = 32;

struct ActiveMission {
    mission: Box<dyn Mission>,
    steps: u32,
}

/// What one dispatch tick did, for logs and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub event: Option<LinkEvent>,
    pub frames: usize,
    pub rejected: usize,
    pub reconnected: bool,
}

/// Receive side of the vehicle: supervises the link, drains radio frames and
/// routes each command, and steps the active mission.
pub struct Dispatcher {
    radio: Arc<Radio>,
    engine: Arc<MotionEngine>,
    supervisor: ConnectionSupervisor,
    mission_cfg: MissionConfig,
    mission: Option<ActiveMission>,
    radio_down_logged: bool,
}

impl Dispatcher {
    pub fn new(
        radio: Arc<Radio>,
        engine: Arc<MotionEngine>,
        supervisor: ConnectionSupervisor,
        mission_cfg: MissionConfig,
    ) -> Self {
        Self { radio, engine, supervisor, mission_cfg, mission: None, radio_down_logged: false }
    }

    pub fn link_state(&self) -> LinkState {
        self.supervisor.state()
    }

    pub fn mission_name(&self) -> Option<&'static str> {
        self.mission.as_ref().map(|m| m.mission.name())
    }

    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        let dive = self.engine.dive_phase();

        // a dive is bounded by its own timeouts and leaves radio contact on purpose
        if dive.is_some() {
            self.supervisor.hold_off(now);
        } else if let Some(ev) = self.supervisor.on_tick(now) {
            if ev == LinkEvent::Lost {
                self.discard_input("link lost");
                // the failsafe owns the motors from here
                if let Some(active) = self.mission.take() {
                    warn!("mission: {} dropped, link lost", active.mission.name());
                }
            }
            report.event = Some(ev);
        }

        if self.engine.take_flush_request() {
            self.discard_input("dive hold over");
        }

        if !self.radio.is_available() {
            match self.radio.reconnect() {
                Ok(()) => {
                    self.radio_down_logged = false;
                    report.reconnected = true;
                }
                Err(e) => {
                    if !self.radio_down_logged {
                        warn!("radio: not available ({}), retrying every tick", e);
                        self.radio_down_logged = true;
                    }
                }
            }
        } else if !dive.map(DivePhase::is_submerged_silent).unwrap_or(false) {
            self.drain(now, &mut report);
            if let Err(e) = self.radio.flush() {
                debug!("radio: flush failed: {}", e);
            }
        }

        self.step_mission(now);
        report
    }

    fn drain(&mut self, now: Instant, report: &mut TickReport) {
        for _ in 0..MAX_FRAMES_PER_TICK {
            match self.radio.read_frame() {
                Ok(Some(frame)) => {
                    report.frames += 1;
                    if !self.handle_frame(&frame, now) {
                        report.rejected += 1;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("radio: read failed: {}", e);
                    break;
                }
            }
        }
    }

    /// Returns false when the frame was dropped.
    fn handle_frame(&mut self, frame: &Frame, now: Instant) -> bool {
        let payload = match codec::decode(frame) {
            Ok(p) => p,
            Err(e) => {
                warn!("link: dropped frame {:02x?}: {}", frame, e);
                self.engine.zero_motors();
                return false;
            }
        };

        if self.engine.interrupt_ascent(now) {
            info!("link: contact during ascent");
        }

        let cmd = match classify(payload) {
            Ok(c) => c,
            Err(e) => {
                warn!("link: dropped payload {:06x}: {}", payload, e);
                return false;
            }
        };
        debug!("link: {:?}", cmd);

        match cmd {
            Command::Ping => {
                self.supervisor.on_ping(now);
            }
            Command::Navigate { distance_m, turn_deg } => {
                let task = MotionTask::TurnAndAdvance {
                    distance_m: f64::from(distance_m),
                    turn_deg: f64::from(turn_deg),
                };
                self.submit(task);
            }
            Command::Teleop { x, y, vertical } => self.submit(MotionTask::Teleop { x, y, vertical }),
            Command::Dive { target_depth_m } => {
                self.abort_mission("dive commanded");
                self.engine.dive(f64::from(target_depth_m), now);
            }
            Command::Action(action) => self.handle_action(action),
        }
        true
    }

    fn submit(&self, task: MotionTask) {
        if let Err(e) = self.engine.enqueue(task) {
            warn!("motion: {}", e);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action.code {
            ActionCode::StartMissionA | ActionCode::StartMissionB => {
                let kind = if action.code == ActionCode::StartMissionA { ProfileKind::A } else { ProfileKind::B };
                self.start_mission(kind, action);
            }
            ActionCode::Halt => {
                info!("link: halt");
                self.abort_mission("halt");
                self.engine.halt();
            }
            ActionCode::CalibrateDepth => match self.engine.sensors().calibrate_depth() {
                Ok(offset) => info!("link: depth calibrated, surface offset {:.2} m", offset),
                Err(e) => warn!("link: depth calibration failed: {}", e),
            },
            ActionCode::Abort => self.abort_mission("abort"),
            ActionCode::DownloadData => info!("link: download requested, no recorder on board"),
        }
    }

    fn start_mission(&mut self, kind: ProfileKind, action: Action) {
        if !self.engine.sensors().has_pressure() {
            warn!("mission: cannot start, no pressure sensor");
            return;
        }
        if let Some(active) = &self.mission {
            warn!("mission: {} already running", active.mission.name());
            return;
        }
        self.engine.halt();
        let m = DepthProfileMission::new(kind, action.depth_m, action.duration_s, &self.mission_cfg);
        info!(
            "mission: starting {} ({:.0} m, {} s)",
            m.name(),
            m.target_m(),
            m.hold().as_secs()
        );
        self.mission = Some(ActiveMission { mission: Box::new(m), steps: 0 });
    }

    fn abort_mission(&mut self, why: &str) {
        if let Some(active) = self.mission.take() {
            info!("mission: {} aborted ({})", active.mission.name(), why);
            self.engine.halt();
        }
    }

    fn step_mission(&mut self, now: Instant) {
        let Some(active) = self.mission.as_mut() else { return };
        active.steps += 1;
        if active.steps > self.mission_cfg.max_iterations {
            warn!(
                "mission: {} exceeded {} iterations",
                active.mission.name(),
                self.mission_cfg.max_iterations
            );
            self.abort_mission("iteration limit");
            return;
        }
        if active.mission.step(&self.engine, now) == MissionStatus::Complete {
            self.mission = None;
        }
    }

    fn discard_input(&self, why: &str) {
        if !self.radio.is_available() {
            return;
        }
        match self.radio.clear_input() {
            Ok(()) => debug!("radio: input discarded ({})", why),
            Err(e) => debug!("radio: discard failed: {}", e),
        }
    }
}
