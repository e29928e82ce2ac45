use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use auv_ctl::{doctor, tasks, MissionConfig, Vehicle, VehicleParts};
use auv_hw::sim::{SimImu, SimMotors, SimPressure, SimWire};
use auv_hw::{Connector, DepthGauge, Imu, RadioConfig, SerialConnector, Sensors};
use auv_link::{LinkConfig, LinkHandle};
use auv_motion::{MotionConfig, MotionEngine, MotionTask, MotorSelect};
use auv_proto::{classify, codec, Action, ActionCode, Command as Uplink, Frame, Telemetry, FRAME_LEN};

#[derive(Debug, Parser)]
#[command(name = "auv", version, about = "Nautilus AUV - vehicle-side radio command link")]
struct Cli {
    /// TOML config; built-in defaults when omitted.
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the vehicle: dispatch, ping, telemetry and motion loops.
    Run,
    /// Validate the configuration.
    Doctor,
    /// Print the hex frame for an uplink command.
    Encode { #[command(subcommand)] cmd: EncodeCmd },
    /// Verify a 14-hex-digit frame and print what it carries.
    Decode {
        frame: String,
        /// Parse as vehicle telemetry instead of a base-station command.
        #[arg(long)]
        telemetry: bool,
    },
    /// Spin a motor (forward, turn, front, back or all) for calibration.
    TestMotor { motor: String },
}

#[derive(Debug, Subcommand)]
enum EncodeCmd {
    Ping,
    Navigate {
        #[arg(long)]
        distance: u8,
        #[arg(long, allow_hyphen_values = true)]
        turn: i16,
    },
    Teleop {
        #[arg(long, allow_hyphen_values = true)]
        x: i8,
        #[arg(long, allow_hyphen_values = true)]
        y: i8,
        #[arg(long)]
        vertical: bool,
    },
    Dive {
        #[arg(long)]
        depth: u8,
    },
    Action {
        code: ActionArg,
        #[arg(long, default_value_t = 0)]
        depth: u8,
        #[arg(long, default_value_t = 0)]
        duration: u16,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    MissionA,
    MissionB,
    Halt,
    CalibrateDepth,
    Abort,
    DownloadData,
}

impl From<ActionArg> for ActionCode {
    fn from(a: ActionArg) -> Self {
        match a {
            ActionArg::MissionA => ActionCode::StartMissionA,
            ActionArg::MissionB => ActionCode::StartMissionB,
            ActionArg::Halt => ActionCode::Halt,
            ActionArg::CalibrateDepth => ActionCode::CalibrateDepth,
            ActionArg::Abort => ActionCode::Abort,
            ActionArg::DownloadData => ActionCode::DownloadData,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    radio: Option<RadioConfig>,
    link: LinkConfig,
    motion: MotionConfig,
    mission: MissionConfig,
    hardware: HardwareCfg,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct HardwareCfg {
    /// Simulated radio and sensors; nothing touches real devices.
    simulate: bool,
    imu: bool,
    pressure: bool,
    sim_heading_deg: f64,
    sim_depth_m: f64,
}

impl Default for HardwareCfg {
    fn default() -> Self {
        Self { simulate: true, imu: true, pressure: true, sim_heading_deg: 0.0, sim_depth_m: 0.0 }
    }
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let Some(path) = path else { return Ok(Config::default()) };
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Run => run(cfg).await?,
        Command::Doctor => doctor_cmd(&cfg)?,
        Command::Encode { cmd } => encode_cmd(cmd)?,
        Command::Decode { frame, telemetry } => decode_cmd(&frame, telemetry)?,
        Command::TestMotor { motor } => test_motor(&cfg, &motor).await?,
    }
    Ok(())
}

fn doctor_cmd(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    doctor::check_link(&cfg.link)?;
    doctor::check_motion(&cfg.motion)?;
    doctor::check_mission(&cfg.mission)?;

    if cfg.hardware.simulate {
        info!("doctor: simulated hardware (OK)");
    } else {
        let radio = cfg.radio.as_ref().context("no [radio] config section")?;
        anyhow::ensure!(!radio.device.is_empty(), "radio.device missing");
        anyhow::ensure!(radio.baud() > 0, "radio.baud invalid");
    }
    if !cfg.hardware.pressure {
        warn!("doctor: no pressure sensor; dives run on timeouts and missions are refused");
    }
    if !cfg.hardware.imu {
        warn!("doctor: no IMU; navigate commands are skipped");
    }

    info!("doctor: OK");
    Ok(())
}

fn sensors(hw: &HardwareCfg) -> Sensors {
    let gauge = if hw.pressure {
        let (p, _) = SimPressure::new(hw.sim_depth_m);
        DepthGauge::new(Some(Box::new(p)))
    } else {
        DepthGauge::new(None)
    };
    let imu: Option<Box<dyn Imu>> = if hw.imu {
        let (imu, _) = SimImu::new(hw.sim_heading_deg);
        Some(Box::new(imu))
    } else {
        None
    };
    Sensors::new(gauge, imu)
}

fn build_parts(cfg: &Config) -> Result<VehicleParts> {
    let connector: Box<dyn Connector> = if cfg.hardware.simulate {
        Box::new(SimWire::new().connector())
    } else {
        let radio = cfg.radio.clone().context("hardware.simulate=false needs a [radio] section")?;
        Box::new(SerialConnector::new(radio))
    };
    if !cfg.hardware.simulate {
        warn!("hw: no motor or sensor drivers linked; output is logged only");
    }
    let (motors, _) = SimMotors::new();
    Ok(VehicleParts { connector, sensors: sensors(&cfg.hardware), motors: Box::new(motors) })
}

async fn run(cfg: Config) -> Result<()> {
    info!("run: starting at {}", time::OffsetDateTime::now_utc());
    doctor::check_link(&cfg.link)?;

    let parts = build_parts(&cfg)?;
    let vehicle = Vehicle::assemble(parts, &cfg.link, cfg.motion.clone(), cfg.mission.clone(), Instant::now());
    let Vehicle { radio, engine, link, dispatcher } = vehicle;

    let handles = vec![
        tokio::spawn(tasks::run_dispatch_loop(dispatcher, cfg.link.receive_interval())),
        tokio::spawn(tasks::run_ping_loop(radio.clone(), cfg.link.ping_interval())),
        tokio::spawn(tasks::run_telemetry_loop(radio.clone(), engine.clone(), link.clone(), cfg.link.telemetry_interval())),
        tokio::spawn(tasks::run_motion_loop(engine.clone(), cfg.motion.control_period())),
    ];

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("run: interrupted, stopping motors");
    for h in &handles {
        h.abort();
    }
    engine.halt();
    info!("run: link was {:?} since {}", link.snapshot().state, link.snapshot().changed_at);
    Ok(())
}

fn encode_cmd(cmd: EncodeCmd) -> Result<()> {
    let command = match cmd {
        EncodeCmd::Ping => Uplink::Ping,
        EncodeCmd::Navigate { distance, turn } => Uplink::Navigate { distance_m: distance, turn_deg: turn },
        EncodeCmd::Teleop { x, y, vertical } => Uplink::Teleop { x, y, vertical },
        EncodeCmd::Dive { depth } => Uplink::Dive { target_depth_m: depth },
        EncodeCmd::Action { code, depth, duration } => {
            Uplink::Action(Action { code: code.into(), depth_m: depth, duration_s: duration })
        }
    };
    let payload = command.to_payload()?;
    let frame = codec::encode(payload).with_context(|| format!("frame for {:?}", command))?;
    println!("{}", hex::encode(frame));
    Ok(())
}

fn decode_cmd(s: &str, telemetry: bool) -> Result<()> {
    let bytes = hex::decode(s.trim()).context("frame is not hex")?;
    anyhow::ensure!(bytes.len() == FRAME_LEN, "frame must be {} bytes, got {}", FRAME_LEN, bytes.len());
    let mut frame: Frame = [0; FRAME_LEN];
    frame.copy_from_slice(&bytes);

    let payload = codec::decode(&frame)?;
    println!("payload=0x{:06x}", payload);
    if telemetry {
        println!("{:?}", Telemetry::from_payload(payload)?);
    } else {
        println!("{:?}", classify(payload)?);
    }
    Ok(())
}

async fn test_motor(cfg: &Config, motor: &str) -> Result<()> {
    let select: MotorSelect = motor.parse()?;
    let (motors, log) = SimMotors::new();
    if !cfg.hardware.simulate {
        warn!("hw: no motor driver linked; running against the simulated array");
    }
    let link = LinkHandle::new(Instant::now()).watch();
    let engine = Arc::new(MotionEngine::new(cfg.motion.clone(), link, sensors(&cfg.hardware), Box::new(motors)));
    engine.enqueue(MotionTask::MotorTest(select))?;

    let mut iv = tokio::time::interval(cfg.motion.control_period());
    while !engine.is_idle() {
        iv.tick().await;
        engine.run_tick(Instant::now());
    }
    info!("test-motor: done, {} motor updates", log.len());
    Ok(())
}
