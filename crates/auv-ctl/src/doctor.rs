use anyhow::Result;

use auv_hw::MAX_MOTOR_SPEED;
use auv_link::LinkConfig;
use auv_motion::MotionConfig;

use crate::MissionConfig;

pub fn check_link(cfg: &LinkConfig) -> Result<()> {
    let timeout = cfg.connection_timeout();
    anyhow::ensure!(cfg.ping_interval() < timeout, "link.ping_interval_ms must be below connection_timeout_ms");
    anyhow::ensure!(cfg.receive_interval() < cfg.ping_interval(), "link.receive_interval_ms must be below ping_interval_ms");
    anyhow::ensure!(!cfg.telemetry_interval().is_zero(), "link.telemetry_interval_ms must be > 0");
    let up = cfg.failsafe_ascent_speed();
    anyhow::ensure!(up > 0.0 && up <= MAX_MOTOR_SPEED, "link.failsafe_ascent_speed should be in 0..={}", MAX_MOTOR_SPEED);
    Ok(())
}

pub fn check_motion(cfg: &MotionConfig) -> Result<()> {
    anyhow::ensure!(cfg.control_period_ms >= 1 && cfg.control_period_ms <= 100, "motion.control_period_ms should be 1..100");
    anyhow::ensure!(cfg.max_correction > 0.0 && cfg.max_correction < 100.0, "motion.max_correction must stay below the reverse band (100)");
    anyhow::ensure!(cfg.settle_reads >= 1, "motion.settle_reads must be >= 1");
    anyhow::ensure!(cfg.heading_tolerance_deg > 0.0, "motion.heading_tolerance_deg must be > 0");
    anyhow::ensure!(cfg.distance_tolerance_m > 0.0, "motion.distance_tolerance_m must be > 0");
    anyhow::ensure!(cfg.dive_speed > 0.0 && cfg.dive_speed <= MAX_MOTOR_SPEED, "motion.dive_speed out of range");
    anyhow::ensure!(cfg.teleop_scale * 100.0 <= MAX_MOTOR_SPEED, "motion.teleop_scale saturates the motors");
    Ok(())
}

pub fn check_mission(cfg: &MissionConfig) -> Result<()> {
    anyhow::ensure!(cfg.max_iterations >= 1, "mission.max_iterations must be >= 1");
    anyhow::ensure!(cfg.default_depth_m > 0.0 && cfg.default_depth_m <= cfg.max_depth_m, "mission.default_depth_m outside 0..max_depth_m");
    anyhow::ensure!(cfg.near_surface_m >= 0.0 && cfg.near_surface_m < cfg.default_depth_m, "mission.near_surface_m too deep");
    Ok(())
}
