//! Vehicle control plane: the dispatch loop that routes radio commands, the
//! autonomous missions it can start, and the periodic ping, telemetry and
//! motion tasks.

pub mod dispatch;
pub mod doctor;
pub mod mission;
pub mod report;
pub mod tasks;

use std::sync::Arc;
use std::time::Instant;

use auv_hw::{Connector, MotorArray, Sensors};
use auv_link::{ConnectionSupervisor, LinkConfig, LinkHandle, LinkWatch, Radio};
use auv_motion::{MotionConfig, MotionEngine};

pub use dispatch::Dispatcher;
pub use mission::{DepthProfileMission, Mission, MissionConfig, MissionStatus, ProfileKind};

/// The wired-up vehicle: one radio, one motion engine, and the dispatcher
/// that owns the connection supervisor.
pub struct Vehicle {
    pub radio: Arc<Radio>,
    pub engine: Arc<MotionEngine>,
    pub link: LinkWatch,
    pub dispatcher: Dispatcher,
}

pub struct VehicleParts {
    pub connector: Box<dyn Connector>,
    pub sensors: Sensors,
    pub motors: Box<dyn MotorArray>,
}

impl Vehicle {
    pub fn assemble(
        parts: VehicleParts,
        link_cfg: &LinkConfig,
        motion_cfg: MotionConfig,
        mission_cfg: MissionConfig,
        boot: Instant,
    ) -> Self {
        let handle = LinkHandle::new(boot);
        let link = handle.watch();
        let engine = Arc::new(MotionEngine::new(motion_cfg, link.clone(), parts.sensors, parts.motors));
        let supervisor = ConnectionSupervisor::new(link_cfg, handle, engine.clone());
        let radio = Arc::new(Radio::new(parts.connector));
        let dispatcher = Dispatcher::new(radio.clone(), engine.clone(), supervisor, mission_cfg);
        Self { radio, engine, link, dispatcher }
    }
}
