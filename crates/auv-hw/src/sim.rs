//! In-memory hardware for bench runs and tests. Every sim device comes with a
//! cloneable handle to steer it or inspect what was commanded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{lock, Connector, HwError, Imu, MotorArray, MotorSpeeds, PressureSensor, Transport, ALL_STOP};

// ----- Radio -----

#[derive(Debug, Default)]
struct WireState {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    reachable: bool,
    generation: u64,
    connects: usize,
}

/// Both ends of a simulated radio link.
#[derive(Debug, Clone)]
pub struct SimWire {
    state: Arc<Mutex<WireState>>,
}

impl Default for SimWire {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWire {
    pub fn new() -> Self {
        let state = WireState { reachable: true, ..Default::default() };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Queues bytes as if the base station had sent them.
    pub fn push_inbound(&self, bytes: &[u8]) {
        lock(&self.state).inbound.extend(bytes.iter().copied());
    }

    pub fn pending_inbound(&self) -> usize {
        lock(&self.state).inbound.len()
    }

    /// Drains everything the vehicle wrote.
    pub fn take_outbound(&self) -> Vec<u8> {
        std::mem::take(&mut lock(&self.state).outbound)
    }

    /// Unplugging the modem closes live transports and fails new connects.
    pub fn set_reachable(&self, reachable: bool) {
        let mut st = lock(&self.state);
        st.reachable = reachable;
        if !reachable {
            st.generation += 1;
        }
    }

    pub fn connects(&self) -> usize {
        lock(&self.state).connects
    }

    pub fn connector(&self) -> SimConnector {
        SimConnector { wire: self.clone() }
    }
}

pub struct SimConnector {
    wire: SimWire,
}

impl Connector for SimConnector {
    fn connect(&self) -> Result<Box<dyn Transport>, HwError> {
        let mut st = lock(&self.wire.state);
        if !st.reachable {
            return Err(HwError::TransportUnavailable);
        }
        st.connects += 1;
        Ok(Box::new(SimTransport { wire: self.wire.clone(), generation: st.generation, open: true }))
    }

    fn describe(&self) -> String {
        "sim".into()
    }
}

pub struct SimTransport {
    wire: SimWire,
    generation: u64,
    open: bool,
}

impl SimTransport {
    fn live(&self) -> Result<std::sync::MutexGuard<'_, WireState>, HwError> {
        let st = lock(&self.wire.state);
        if !self.open || !st.reachable || st.generation != self.generation {
            return Err(HwError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sim radio unplugged",
            )));
        }
        Ok(st)
    }
}

impl Transport for SimTransport {
    fn read(&mut self, n: usize) -> Result<Vec<u8>, HwError> {
        let mut st = self.live()?;
        let k = n.min(st.inbound.len());
        Ok(st.inbound.drain(..k).collect())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), HwError> {
        self.live()?.outbound.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), HwError> {
        self.live().map(|_| ())
    }

    fn clear_input(&mut self) -> Result<(), HwError> {
        self.live()?.inbound.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open && self.live().is_ok()
    }

    fn close(&mut self) {
        self.open = false;
    }
}

// ----- Motors -----

/// Records every motor vector it is given.
pub struct SimMotors {
    log: MotorLog,
}

#[derive(Debug, Clone, Default)]
pub struct MotorLog {
    history: Arc<Mutex<Vec<MotorSpeeds>>>,
}

impl SimMotors {
    pub fn new() -> (Self, MotorLog) {
        let log = MotorLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl MotorArray for SimMotors {
    fn update_motor_speeds(&mut self, speeds: MotorSpeeds) -> Result<(), HwError> {
        debug!("sim motors: {:?}", speeds);
        lock(&self.log.history).push(speeds);
        Ok(())
    }
}

impl MotorLog {
    pub fn history(&self) -> Vec<MotorSpeeds> {
        lock(&self.history).clone()
    }

    pub fn last(&self) -> Option<MotorSpeeds> {
        lock(&self.history).last().copied()
    }

    pub fn len(&self) -> usize {
        lock(&self.history).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn zero_count(&self) -> usize {
        lock(&self.history).iter().filter(|s| **s == ALL_STOP).count()
    }

    pub fn clear(&self) {
        lock(&self.history).clear();
    }
}

// ----- Pressure -----

#[derive(Debug)]
struct PressureState {
    depth_m: f64,
    failing: bool,
}

pub struct SimPressure {
    state: Arc<Mutex<PressureState>>,
    last: f64,
}

#[derive(Debug, Clone)]
pub struct SimPressureHandle {
    state: Arc<Mutex<PressureState>>,
}

impl SimPressure {
    pub fn new(depth_m: f64) -> (Self, SimPressureHandle) {
        let state = Arc::new(Mutex::new(PressureState { depth_m, failing: false }));
        (Self { state: state.clone(), last: depth_m }, SimPressureHandle { state })
    }
}

impl PressureSensor for SimPressure {
    fn read(&mut self) -> Result<(), HwError> {
        let st = lock(&self.state);
        if st.failing {
            return Err(HwError::SensorRead { sensor: "pressure sensor", reason: "sim fault".into() });
        }
        self.last = st.depth_m;
        Ok(())
    }

    fn depth_m(&self) -> f64 {
        self.last
    }
}

impl SimPressureHandle {
    pub fn set_depth(&self, depth_m: f64) {
        lock(&self.state).depth_m = depth_m;
    }

    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}

// ----- IMU -----

#[derive(Debug)]
struct ImuState {
    heading_deg: f64,
    accel: [f64; 3],
    temperature_c: f64,
    failing: bool,
}

impl ImuState {
    fn check(&self) -> Result<(), HwError> {
        if self.failing {
            return Err(HwError::SensorRead { sensor: "imu", reason: "sim fault".into() });
        }
        Ok(())
    }
}

pub struct SimImu {
    state: Arc<Mutex<ImuState>>,
}

#[derive(Debug, Clone)]
pub struct SimImuHandle {
    state: Arc<Mutex<ImuState>>,
}

impl SimImu {
    pub fn new(heading_deg: f64) -> (Self, SimImuHandle) {
        let state = Arc::new(Mutex::new(ImuState { heading_deg, accel: [0.0; 3], temperature_c: 12.0, failing: false }));
        (Self { state: state.clone() }, SimImuHandle { state })
    }
}

impl Imu for SimImu {
    fn heading_deg(&mut self) -> Result<f64, HwError> {
        let st = lock(&self.state);
        st.check()?;
        Ok(st.heading_deg)
    }

    fn linear_acceleration(&mut self) -> Result<[f64; 3], HwError> {
        let st = lock(&self.state);
        st.check()?;
        Ok(st.accel)
    }

    fn temperature_c(&mut self) -> Result<f64, HwError> {
        let st = lock(&self.state);
        st.check()?;
        Ok(st.temperature_c)
    }
}

impl SimImuHandle {
    pub fn set_heading(&self, deg: f64) {
        lock(&self.state).heading_deg = deg;
    }

    pub fn set_accel(&self, accel: [f64; 3]) {
        lock(&self.state).accel = accel;
    }

    pub fn set_temperature(&self, c: f64) {
        lock(&self.state).temperature_c = c;
    }

    /// Makes every read fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}
