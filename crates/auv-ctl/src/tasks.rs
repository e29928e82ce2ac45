//! The four long-lived loops. Each owns handles only and runs on a fixed
//! tokio interval until its task is aborted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use auv_link::{LinkError, LinkWatch, Radio};
use auv_motion::MotionEngine;
use auv_proto::PING;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::report;

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut iv = interval(period);
    iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
    iv
}

pub async fn run_dispatch_loop(mut dispatcher: Dispatcher, period: Duration) {
    info!("dispatch: every {:?}", period);
    let mut iv = ticker(period);
    loop {
        iv.tick().await;
        let r = dispatcher.tick(Instant::now());
        if let Some(ev) = r.event {
            info!("dispatch: link {:?}", ev);
        }
    }
}

pub async fn run_ping_loop(radio: Arc<Radio>, period: Duration) {
    let mut iv = ticker(period);
    loop {
        iv.tick().await;
        match radio.send_payload(PING) {
            Ok(()) => {}
            Err(LinkError::TransportUnavailable) => {}
            Err(e) => debug!("ping: send failed: {}", e),
        }
    }
}

/// Sends one telemetry burst per period while the link is up.
pub async fn run_telemetry_loop(radio: Arc<Radio>, engine: Arc<MotionEngine>, link: LinkWatch, period: Duration) {
    let mut iv = ticker(period);
    loop {
        iv.tick().await;
        if !link.is_connected() {
            continue;
        }
        send_burst(&radio, &engine, true);
    }
}

pub(crate) fn send_burst(radio: &Radio, engine: &MotionEngine, connected: bool) -> usize {
    let mut sent = 0;
    for t in report::collect(engine, connected) {
        match radio.send_payload(t.to_payload()) {
            Ok(()) => sent += 1,
            // the occasional payload with no codeword is skipped until the next burst
            Err(e) => debug!("telemetry: {:?} not sent: {}", t, e),
        }
    }
    sent
}

pub async fn run_motion_loop(engine: Arc<MotionEngine>, period: Duration) {
    let mut iv = ticker(period);
    loop {
        iv.tick().await;
        engine.run_tick(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auv_hw::sim::{SimImu, SimMotors, SimPressure, SimWire};
    use auv_hw::{DepthGauge, Sensors};
    use auv_link::LinkHandle;
    use auv_motion::MotionConfig;
    use auv_proto::{decode, Frame, Telemetry, FRAME_LEN};

    #[tokio::test]
    async fn test_ping_loop_sends_pings() {
        let wire = SimWire::new();
        let radio = Arc::new(Radio::new(Box::new(wire.connector())));
        radio.reconnect().unwrap();
        let h = tokio::spawn(run_ping_loop(radio.clone(), Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(55)).await;
        h.abort();

        let out = wire.take_outbound();
        assert!(out.len() >= 2 * FRAME_LEN);
        assert_eq!(out.len() % FRAME_LEN, 0);
        for chunk in out.chunks(FRAME_LEN) {
            let frame: Frame = chunk.try_into().unwrap();
            assert_eq!(decode(&frame).unwrap(), PING);
        }
    }

    #[test]
    fn test_burst_frames_decode() {
        let wire = SimWire::new();
        let radio = Radio::new(Box::new(wire.connector()));
        radio.reconnect().unwrap();
        let (m, _) = SimMotors::new();
        let (imu, _) = SimImu::new(90.0);
        let (p, _) = SimPressure::new(1.5);
        let sensors = Sensors::new(DepthGauge::new(Some(Box::new(p))), Some(Box::new(imu)));
        let engine = MotionEngine::new(MotionConfig::default(), LinkHandle::new(Instant::now()).watch(), sensors, Box::new(m));

        let sent = send_burst(&radio, &engine, true);
        let out = wire.take_outbound();
        assert_eq!(out.len(), sent * FRAME_LEN);
        let kinds: Vec<Telemetry> = out
            .chunks(FRAME_LEN)
            .map(|c| {
                let frame: Frame = c.try_into().unwrap();
                Telemetry::from_payload(decode(&frame).unwrap()).unwrap()
            })
            .collect();
        assert!(kinds.iter().all(|t| report::collect(&engine, true).contains(t)));
    }
}
