//! Configuration for the rover control node
//!
//! Loaded once from a TOML file and treated as immutable afterwards. Every
//! section is optional; missing sections fall back to the competition
//! defaults.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig{
    pub drive: DriveConfig,
    pub serial: SerialConfig,
    pub gamepad: GamepadConfig,
    pub choreography: ChoreographyConfig,
    pub actuators: ActuatorConfig,
    pub camera: CameraConfig,
    pub logging: LoggingConfig,
}

/// Drivetrain power limits (duty cycle, -1.0..=1.0)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DriveConfig{
    pub max_drive_power: f32,
    pub max_turn_power: f32,
    /// Forward power used while autonomously digging
    pub dig_drive_power: f32,
}

/// Actuator microcontroller link
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig{
    pub device: String,
    pub baud_rate: u32,
    /// Upper bound on a single acknowledgement wait
    pub ack_timeout_ms: u64,
    /// Sleep between empty reads while waiting for an acknowledgement
    pub poll_interval_ms: u64,
}

/// Gamepad axis and button indices as published by the joystick driver
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GamepadConfig{
    pub forward_axis: usize,
    pub turn_axis: usize,
    pub dig_button: usize,
    pub offload_button: usize,
    pub digger_button: usize,
    pub offloader_button: usize,
    pub extend_button: usize,
    pub camera_button: usize,
}

/// Fixed timings of the autonomous procedures
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChoreographyConfig{
    /// Wait for the digger to spin up before extending
    pub dig_warmup_ms: u64,
    /// How long to creep forward with the digger extended
    pub dig_drive_ms: u64,
    pub offload_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ActuatorConfig{
    pub period_ms: u64,
    /// Log the published command once every this many ticks
    pub log_every: u64,
}

/// The two mutually exclusive video streams
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig{
    pub front_command: String,
    pub rear_command: String,
    /// Time a stream gets to exit after SIGTERM before its group is killed
    pub stop_grace_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig{
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for DriveConfig{
    fn default() -> Self{
        Self{
            max_drive_power: 1.0,
            max_turn_power: 1.0,
            dig_drive_power: 0.5,
        }
    }
}

impl Default for SerialConfig{
    fn default() -> Self{
        Self{
            device: "/dev/Arduino_Uno".to_string(),
            baud_rate: 9600,
            ack_timeout_ms: 30_000,
            poll_interval_ms: 10,
        }
    }
}

impl Default for GamepadConfig{
    fn default() -> Self{
        // Logitech F310 in XInput mode
        Self{
            forward_axis: 4,
            turn_axis: 0,
            dig_button: 3,
            offload_button: 6,
            digger_button: 2,
            offloader_button: 1,
            extend_button: 0,
            camera_button: 7,
        }
    }
}

impl Default for ChoreographyConfig{
    fn default() -> Self{
        Self{
            dig_warmup_ms: 5_000,
            dig_drive_ms: 20_000,
            offload_ms: 10_000,
        }
    }
}

impl Default for ActuatorConfig{
    fn default() -> Self{
        Self{
            period_ms: 50,
            log_every: 20,
        }
    }
}

impl Default for CameraConfig{
    fn default() -> Self{
        Self{
            front_command: stream_pipeline("/dev/video0"),
            rear_command: stream_pipeline("/dev/video1"),
            stop_grace_ms: 1_000,
        }
    }
}

impl Default for LoggingConfig{
    fn default() -> Self{
        Self{
            level: "info".to_string(),
        }
    }
}

fn stream_pipeline(device: &str) -> String{
    format!(
        "gst-launch-1.0 v4l2src device={} ! \"video/x-raw,width=640,height=480,framerate=30/1\" \
         ! nvvidconv ! \"video/x-raw(memory:NVMM),format=I420\" ! omxh265enc bitrate=200000 \
         ! \"video/x-h265,stream-format=byte-stream\" ! h265parse ! rtph265pay \
         ! udpsink host=192.168.1.40 port=5000",
        device
    )
}

impl ControlConfig{
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self>{
        let contents = fs::read_to_string(path)?;
        let config: ControlConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self>{
        if path.as_ref().exists(){
            Self::load(path)
        }else{
            log::info!(
                "Config {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }
}

impl SerialConfig{
    pub fn ack_timeout(&self) -> Duration{
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration{
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ChoreographyConfig{
    pub fn dig_warmup(&self) -> Duration{
        Duration::from_millis(self.dig_warmup_ms)
    }

    pub fn dig_drive(&self) -> Duration{
        Duration::from_millis(self.dig_drive_ms)
    }

    pub fn offload(&self) -> Duration{
        Duration::from_millis(self.offload_ms)
    }
}

impl CameraConfig{
    pub fn stop_grace(&self) -> Duration{
        Duration::from_millis(self.stop_grace_ms)
    }
}

impl ActuatorConfig{
    pub fn period(&self) -> Duration{
        Duration::from_millis(self.period_ms)
    }
}
