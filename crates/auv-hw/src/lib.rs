//! Seams to the vehicle hardware: radio transport, pressure sensor, IMU and
//! the motor array. Drivers live behind these traits; this crate ships the
//! serial radio adapter and simulation backends.

pub mod depth;
pub mod sensors;
pub mod serial;
pub mod sim;

use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use depth::DepthGauge;
pub use sensors::Sensors;
pub use serial::{RadioConfig, SerialConnector, SerialTransport};

pub const MOTOR_COUNT: usize = 4;

// Indices into [`MotorSpeeds`]
pub const FORWARD: usize = 0;
pub const TURN: usize = 1;
pub const FRONT: usize = 2;
pub const BACK: usize = 3;

/// Full-scale magnitude of a motor speed.
pub const MAX_MOTOR_SPEED: f64 = 150.0;

/// Signed speed per motor, `-150..=150`. On the vertical pair positive drives
/// the vehicle down.
pub type MotorSpeeds = [f64; MOTOR_COUNT];

pub const ALL_STOP: MotorSpeeds = [0.0; MOTOR_COUNT];

#[derive(Debug, Error)]
pub enum HwError {
    #[error("{0} unavailable")]
    SensorUnavailable(&'static str),
    #[error("{sensor} read failed: {reason}")]
    SensorRead { sensor: &'static str, reason: String },
    #[error("transport unavailable")]
    TransportUnavailable,
    #[error("serial: {0}")]
    Serial(#[from] tokio_serial::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Byte pipe to the radio modem. Reads never block.
pub trait Transport: Send {
    /// Returns up to `n` bytes that are already buffered.
    fn read(&mut self, n: usize) -> Result<Vec<u8>, HwError>;
    fn write(&mut self, bytes: &[u8]) -> Result<(), HwError>;
    /// Pushes buffered output onto the wire.
    fn flush(&mut self) -> Result<(), HwError>;
    /// Discards everything received but not yet read.
    fn clear_input(&mut self) -> Result<(), HwError>;
    fn is_open(&self) -> bool;
    fn close(&mut self);
}

/// Opens a fresh [`Transport`]; called again after every link failure.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn Transport>, HwError>;
    fn describe(&self) -> String;
}

pub trait PressureSensor: Send {
    /// Samples the sensor; `depth_m` reports the last good sample.
    fn read(&mut self) -> Result<(), HwError>;
    fn depth_m(&self) -> f64;
}

pub trait Imu: Send {
    fn heading_deg(&mut self) -> Result<f64, HwError>;
    /// Gravity-compensated acceleration in m/s², body frame (x forward).
    fn linear_acceleration(&mut self) -> Result<[f64; 3], HwError>;
    fn temperature_c(&mut self) -> Result<f64, HwError>;
}

pub trait MotorArray: Send {
    fn update_motor_speeds(&mut self, speeds: MotorSpeeds) -> Result<(), HwError>;

    fn zero_out_motors(&mut self) -> Result<(), HwError> {
        self.update_motor_speeds(ALL_STOP)
    }
}

/// Locks a mutex, taking the data even if a panicking thread poisoned it.
/// Control loops keep running on the last written state.
pub fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
