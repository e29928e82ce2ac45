use std::time::{Duration, Instant};

use auv_ctl::{MissionConfig, Vehicle, VehicleParts};
use auv_hw::sim::{MotorLog, SimImu, SimMotors, SimPressure, SimPressureHandle, SimWire};
use auv_hw::{DepthGauge, Sensors, ALL_STOP, BACK, FRONT};
use auv_link::{LinkConfig, LinkEvent, LinkState};
use auv_motion::{DivePhase, MotionConfig};
use auv_proto::{encode, Command, PING};

struct Sim {
    vehicle: Vehicle,
    wire: SimWire,
    motors: MotorLog,
    depth: SimPressureHandle,
    t0: Instant,
}

fn sim() -> Sim {
    let wire = SimWire::new();
    let (m, motors) = SimMotors::new();
    let (imu, _) = SimImu::new(0.0);
    let (p, depth) = SimPressure::new(0.0);
    let parts = VehicleParts {
        connector: Box::new(wire.connector()),
        sensors: Sensors::new(DepthGauge::new(Some(Box::new(p))), Some(Box::new(imu))),
        motors: Box::new(m),
    };
    let t0 = Instant::now();
    let vehicle = Vehicle::assemble(parts, &LinkConfig::default(), MotionConfig::default(), MissionConfig::default(), t0);
    Sim { vehicle, wire, motors, depth, t0 }
}

fn at(s: &Sim, ms: u64) -> Instant {
    s.t0 + Duration::from_millis(ms)
}

fn push(s: &Sim, cmd: Command) {
    s.wire.push_inbound(&encode(cmd.to_payload().unwrap()).unwrap());
}

/// Runs dispatch ticks every 100 ms over `[from, to)`, with a motion tick
/// after each, collecting link events.
fn run(s: &mut Sim, from: u64, to: u64, mut each: impl FnMut(&Sim, u64)) -> Vec<LinkEvent> {
    let mut events = Vec::new();
    let mut ms = from;
    while ms < to {
        each(s, ms);
        if let Some(ev) = s.vehicle.dispatcher.tick(at(s, ms)).event {
            events.push(ev);
        }
        s.vehicle.engine.run_tick(at(s, ms));
        ms += 100;
    }
    events
}

#[test]
fn reconnect_from_boot_connects_once() {
    let mut s = sim();
    let events = run(&mut s, 0, 10_000, |s, ms| {
        if ms % 1_000 == 0 {
            push(s, Command::Ping);
        }
    });
    assert!(events.is_empty(), "on_ping transitions are not tick events");
    assert_eq!(s.vehicle.dispatcher.link_state(), LinkState::Connected);
    assert!(s.vehicle.link.is_connected());
    // exactly one all-stop, issued on connect
    assert_eq!(s.motors.zero_count(), 1);
}

#[test]
fn silence_after_contact_starts_failsafe_ascent() {
    let mut s = sim();
    s.depth.set_depth(8.0);
    run(&mut s, 0, 1_000, |s, ms| {
        if ms == 100 {
            push(s, Command::Ping);
        }
    });
    assert!(s.vehicle.link.is_connected());

    let events = run(&mut s, 1_000, 8_000, |_, _| {});
    assert_eq!(events, vec![LinkEvent::Lost]);
    assert!(!s.vehicle.link.is_connected());
    let last = s.motors.last().unwrap();
    assert_eq!((last[FRONT], last[BACK]), (-25.0, -25.0));

    // at the surface the failsafe parks the motors
    s.depth.set_depth(0.0);
    run(&mut s, 8_000, 8_200, |_, _| {});
    assert_eq!(s.motors.last(), Some(ALL_STOP));
}

#[test]
fn garbled_frame_then_ping() {
    let mut s = sim();
    run(&mut s, 0, 200, |s, ms| {
        if ms == 100 {
            let mut bad = encode(PING).unwrap();
            bad[2] ^= 0x10;
            s.wire.push_inbound(&bad);
            push(s, Command::Ping);
        }
    });
    // the garbled frame zeroed the motors, the ping still connected
    assert!(s.vehicle.link.is_connected());
    assert_eq!(s.motors.zero_count(), 2);
    assert_eq!(s.wire.pending_inbound(), 0);
}

#[test]
fn dive_that_never_reaches_depth_times_out_and_surfaces() {
    let mut s = sim();
    run(&mut s, 0, 300, |s, ms| {
        if ms == 100 {
            push(s, Command::Ping);
        }
        if ms == 200 {
            push(s, Command::Dive { target_depth_m: 30 });
        }
    });
    assert_eq!(s.vehicle.engine.dive_phase(), Some(DivePhase::Descend));
    s.depth.set_depth(12.0);

    // frames sent while submerged are not read
    push(&s, Command::Teleop { x: 0, y: 50, vertical: false });
    run(&mut s, 300, 60_300, |_, _| {});
    assert_eq!(s.vehicle.engine.dive_phase(), Some(DivePhase::Hold));
    assert!(s.vehicle.link.is_connected(), "supervisor held off during the dive");

    run(&mut s, 60_300, 70_400, |_, _| {});
    assert_eq!(s.vehicle.engine.dive_phase(), Some(DivePhase::Ascend));
    assert_eq!(s.wire.pending_inbound(), 0, "stale input flushed after hold");

    s.depth.set_depth(0.0);
    run(&mut s, 70_400, 70_600, |_, _| {});
    assert_eq!(s.vehicle.engine.dive_phase(), None);
    assert_eq!(s.motors.last(), Some(ALL_STOP));
}

#[test]
fn valid_frame_interrupts_ascent() {
    let mut s = sim();
    s.depth.set_depth(3.0);
    run(&mut s, 0, 300, |s, ms| {
        if ms == 100 {
            push(s, Command::Ping);
        }
        if ms == 200 {
            push(s, Command::Dive { target_depth_m: 3 });
        }
    });
    run(&mut s, 300, 10_500, |_, _| {});
    assert_eq!(s.vehicle.engine.dive_phase(), Some(DivePhase::Ascend));

    let mut bad = encode(PING).unwrap();
    bad[0] ^= 0x01;
    s.wire.push_inbound(&bad);
    run(&mut s, 10_500, 10_600, |_, _| {});
    assert_eq!(s.vehicle.engine.dive_phase(), Some(DivePhase::Ascend), "garbled frames do not count");

    push(&s, Command::Ping);
    run(&mut s, 10_600, 10_700, |_, _| {});
    assert_eq!(s.vehicle.engine.dive_phase(), None);
}
