//! Snapshot of vehicle state packed into downlink telemetry frames.

use auv_motion::MotionEngine;
use auv_proto::Telemetry;

pub const FLAG_CONNECTED: u8 = 1 << 0;
pub const FLAG_DIVING: u8 = 1 << 1;
pub const FLAG_NAVIGATING: u8 = 1 << 2;
pub const FLAG_IMU: u8 = 1 << 3;
pub const FLAG_PRESSURE: u8 = 1 << 4;

/// One telemetry burst. Readings that fail are left out.
pub fn collect(engine: &MotionEngine, connected: bool) -> Vec<Telemetry> {
    let sensors = engine.sensors();
    let mut out = Vec::with_capacity(4);

    let [x, y] = engine.position_estimate();
    out.push(Telemetry::Position { x: saturate_i16(x), y: saturate_i16(y) });

    if let Ok(deg) = sensors.heading_deg() {
        out.push(Telemetry::Heading { deg });
    }

    let mut flags = 0;
    if connected {
        flags |= FLAG_CONNECTED;
    }
    if engine.dive_phase().is_some() {
        flags |= FLAG_DIVING;
    }
    if engine.nav_phase().is_some() {
        flags |= FLAG_NAVIGATING;
    }
    if sensors.has_imu() {
        flags |= FLAG_IMU;
    }
    if sensors.has_pressure() {
        flags |= FLAG_PRESSURE;
    }
    let temperature_c = sensors.temperature_c().map(|t| t.round().clamp(-128.0, 127.0) as i8).unwrap_or(0);
    out.push(Telemetry::Misc { temperature_c, flags });

    if let Ok(m) = sensors.depth_m() {
        out.push(Telemetry::Depth { m });
    }
    out
}

fn saturate_i16(v: f64) -> i16 {
    v.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}
