use crate::{HwError, PressureSensor};

/// Pressure sensor plus the surface reference set by depth calibration.
pub struct DepthGauge {
    sensor: Option<Box<dyn PressureSensor>>,
    surface_offset_m: f64,
}

impl DepthGauge {
    pub fn new(sensor: Option<Box<dyn PressureSensor>>) -> Self {
        Self { sensor, surface_offset_m: 0.0 }
    }

    pub fn is_present(&self) -> bool {
        self.sensor.is_some()
    }

    /// Depth below the calibrated surface, metres. Positive is down.
    pub fn read_depth(&mut self) -> Result<f64, HwError> {
        Ok(self.read_raw()? - self.surface_offset_m)
    }

    /// Takes the current reading as the surface. Returns the new offset.
    pub fn calibrate(&mut self) -> Result<f64, HwError> {
        self.surface_offset_m = self.read_raw()?;
        Ok(self.surface_offset_m)
    }

    fn read_raw(&mut self) -> Result<f64, HwError> {
        let sensor = self.sensor.as_mut().ok_or(HwError::SensorUnavailable("pressure sensor"))?;
        sensor.read()?;
        Ok(sensor.depth_m())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPressure;

    #[test]
    fn test_missing_sensor() {
        let mut gauge = DepthGauge::new(None);
        assert!(matches!(gauge.read_depth(), Err(HwError::SensorUnavailable(_))));
    }

    #[test]
    fn test_calibration_sets_surface() {
        let (sensor, handle) = SimPressure::new(0.4);
        let mut gauge = DepthGauge::new(Some(Box::new(sensor)));
        assert_eq!(gauge.calibrate().unwrap(), 0.4);
        handle.set_depth(2.4);
        assert!((gauge.read_depth().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_read_failure_propagates() {
        let (sensor, handle) = SimPressure::new(3.0);
        let mut gauge = DepthGauge::new(Some(Box::new(sensor)));
        handle.set_failing(true);
        assert!(matches!(gauge.read_depth(), Err(HwError::SensorRead { .. })));
        handle.set_failing(false);
        assert_eq!(gauge.read_depth().unwrap(), 3.0);
    }
}
