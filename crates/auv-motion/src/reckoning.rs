//! Planar dead reckoning from body-frame linear acceleration.

use std::time::Instant;

/// Integrates acceleration twice with the trapezoid rule. Readings inside the
/// noise gate count as rest; after enough rest samples in a row the velocity
/// is forced to zero to stop drift from accumulating.
#[derive(Debug, Clone)]
pub struct DeadReckoner {
    gate: f64,
    stillness_limit: u32,
    accel: [f64; 2],
    velocity: [f64; 2],
    position: [f64; 2],
    still: u32,
    last: Option<Instant>,
}

impl DeadReckoner {
    pub fn new(gate: f64, stillness_limit: u32) -> Self {
        Self {
            gate,
            stillness_limit,
            accel: [0.0; 2],
            velocity: [0.0; 2],
            position: [0.0; 2],
            still: 0,
            last: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.gate, self.stillness_limit);
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    pub fn velocity(&self) -> [f64; 2] {
        self.velocity
    }

    /// Feeds one sample taken at `now` and returns the updated position.
    /// The first sample only sets the time base.
    pub fn update(&mut self, raw: [f64; 2], now: Instant) -> [f64; 2] {
        let accel = raw.map(|a| if a.abs() < self.gate { 0.0 } else { a });

        if accel == [0.0; 2] {
            self.still = self.still.saturating_add(1);
        } else {
            self.still = 0;
        }

        let dt = match self.last.replace(now) {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64(),
            None => 0.0,
        };

        for axis in 0..2 {
            let v_prev = self.velocity[axis];
            let mut v = v_prev + (self.accel[axis] + accel[axis]) * 0.5 * dt;
            if self.still >= self.stillness_limit {
                v = 0.0;
            }
            self.position[axis] += (v_prev + v) * 0.5 * dt;
            self.velocity[axis] = v;
        }
        self.accel = accel;
        self.position
    }
}
