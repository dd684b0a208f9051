mod command;

use crate::command::{Command, Reading};
use color_eyre::{eyre::eyre, Result};
use keyhandler::device::simulated::{
    InMemoryPreferences, InMemoryProperties, ManualProximitySensor, RecordingActionExecutor,
    RecordingAudio, RecordingVibrator, RecordingZen, SimulatedPower,
};
use keyhandler::device::{Capabilities, ProximitySensor};
use keyhandler::input::key_event::KeyEvent;
use keyhandler::{KeyHandler, KeyHandlerConfig, FPNAV_ENABLED_PROP};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const PREFERENCES_PATH_ENV: &str = "KEYHANDLER_PREFERENCES";
const PROXIMITY_MAX_RANGE: f32 = 5.0;

/// Simulated handset the console drives
struct SimulatedDevice {
    sensor: Arc<ManualProximitySensor>,
    power: Arc<SimulatedPower>,
    actions: Arc<RecordingActionExecutor>,
    properties: Arc<InMemoryProperties>,
    capabilities: Capabilities,
}

impl SimulatedDevice {
    fn new(preferences: InMemoryPreferences) -> Self {
        let sensor = Arc::new(ManualProximitySensor::new(PROXIMITY_MAX_RANGE));
        let power = Arc::new(SimulatedPower::new());
        let actions = Arc::new(RecordingActionExecutor::new());
        let properties = Arc::new(InMemoryProperties::new());

        let capabilities = Capabilities::new(Arc::new(preferences))
            .with_zen(Arc::new(RecordingZen::new()))
            .with_audio(Arc::new(RecordingAudio::new()))
            .with_vibrator(Arc::new(RecordingVibrator::new(true)))
            .with_power(power.clone())
            .with_proximity(sensor.clone())
            .with_actions(actions.clone())
            .with_properties(properties.clone());

        Self {
            sensor,
            power,
            actions,
            properties,
            capabilities,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = KeyHandlerConfig::load().await?;
    info!("Using {:?}", config);

    let preferences = InMemoryPreferences::load(&preferences_path()?).await?;
    let device = SimulatedDevice::new(preferences);

    let handler = KeyHandler::new(device.capabilities.clone(), &config)
        .map_err(|e| eyre!("Failed to start key handler: {}", e))?;

    info!("Ready. Commands: key <scan> [down|up|multiple], gesture <scan>, proximity <value|covered>, navbar <on|off>, status, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };
        debug!("Command: {:?}", command);

        match command {
            Command::Key { scan_code, action } => {
                let event = KeyEvent::new(scan_code, action);
                match handler.handle_key_event(event) {
                    Some(event) => info!("Passed through: {:?}", event),
                    None => info!("Consumed scan code {} ({})", scan_code, action),
                }
            }
            Command::Gesture(scan_code) => match handler.handle_gesture_trigger(scan_code) {
                Some(attempt) => {
                    let token = attempt.token;
                    info!("Waiting for proximity reading ({})", token);
                    tokio::spawn(async move {
                        let outcome = attempt.outcome().await;
                        info!("{} finished: {:?}", token, outcome);
                    });
                }
                None => info!("Gesture trigger {} ignored", scan_code),
            },
            Command::Proximity(reading) => {
                let value = match reading {
                    Reading::Covered => device.sensor.maximum_range(),
                    Reading::Value(value) => value,
                };
                let delivered = device.sensor.emit(value);
                info!("Reading {} delivered to {} listener(s)", value, delivered);
            }
            Command::Navbar(enabled) => {
                handler.handle_navbar_toggle(enabled);
                info!(
                    "{} = {:?}",
                    FPNAV_ENABLED_PROP,
                    device.properties.get(FPNAV_ENABLED_PROP)
                );
            }
            Command::Status => {
                info!(
                    "Pending: {:?}, wake locks held: {}, actions executed: {}",
                    handler.pending_gesture(),
                    device.power.held(),
                    device.actions.requests().len()
                );
            }
            Command::Quit => break,
        }
    }

    let processed = handler.shutdown().await?;
    info!(
        "Stopped after {} confirmed gesture(s), actions: {:?}",
        processed,
        device.actions.requests()
    );
    Ok(())
}

fn preferences_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(PREFERENCES_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
    path.push("keyhandler");
    path.push("preferences.toml");
    Ok(path)
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
