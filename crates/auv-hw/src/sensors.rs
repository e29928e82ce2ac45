use std::sync::{Arc, Mutex};

use crate::{lock, DepthGauge, HwError, Imu};

/// Shared handles to the vehicle sensors. Each reading takes the sensor's
/// lock for one call only.
#[derive(Clone)]
pub struct Sensors {
    depth: Arc<Mutex<DepthGauge>>,
    imu: Option<Arc<Mutex<Box<dyn Imu>>>>,
}

impl Sensors {
    pub fn new(depth: DepthGauge, imu: Option<Box<dyn Imu>>) -> Self {
        Self {
            depth: Arc::new(Mutex::new(depth)),
            imu: imu.map(|i| Arc::new(Mutex::new(i))),
        }
    }

    pub fn has_pressure(&self) -> bool {
        lock(&self.depth).is_present()
    }

    pub fn has_imu(&self) -> bool {
        self.imu.is_some()
    }

    pub fn depth_m(&self) -> Result<f64, HwError> {
        lock(&self.depth).read_depth()
    }

    pub fn calibrate_depth(&self) -> Result<f64, HwError> {
        lock(&self.depth).calibrate()
    }

    pub fn heading_deg(&self) -> Result<f64, HwError> {
        lock(self.imu()?).heading_deg()
    }

    pub fn linear_acceleration(&self) -> Result<[f64; 3], HwError> {
        lock(self.imu()?).linear_acceleration()
    }

    pub fn temperature_c(&self) -> Result<f64, HwError> {
        lock(self.imu()?).temperature_c()
    }

    fn imu(&self) -> Result<&Mutex<Box<dyn Imu>>, HwError> {
        self.imu.as_deref().ok_or(HwError::SensorUnavailable("imu"))
    }
}
