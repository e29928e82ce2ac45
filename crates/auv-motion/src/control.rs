//! Heading arithmetic and the bounded correction law shared by every
//! closed-loop phase.

/// Band offset marking reverse output in the correction encoding.
pub const REVERSE_BAND: f64 = 100.0;

/// Shortest signed rotation from `heading` to `target`, degrees in
/// `(-180, 180]`. Positive turns clockwise.
pub fn turn_error(target: f64, heading: f64) -> f64 {
    let d = (target - heading).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Clamped proportional output in the motor channel's two-band encoding:
/// `0..=max` forward, `100..=100+max` reverse with magnitude `value - 100`.
pub fn bounded_correction(error: f64, max: f64) -> f64 {
    if error < 0.0 {
        (REVERSE_BAND + error.abs()).min(REVERSE_BAND + max)
    } else {
        error.min(max)
    }
}

/// Converts a two-band correction value into a signed motor speed.
pub fn band_to_signed(band: f64) -> f64 {
    if band > REVERSE_BAND {
        -(band - REVERSE_BAND)
    } else {
        band
    }
}

/// Signed motor speed for `error`, saturated at `±max`.
pub fn correction_speed(error: f64, max: f64) -> f64 {
    band_to_signed(bounded_correction(error, max))
}
