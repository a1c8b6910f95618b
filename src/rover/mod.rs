pub mod actuators;
pub mod camera;
pub mod controller;
pub mod drive;
pub mod mode;
pub mod task;

pub use actuators::{actuator_command, start_actuator_loop, ActuatorPublisher};
pub use camera::{CameraSelector, ExclusivePair, StreamProcess, StreamResource};
pub use controller::RoverController;
pub use drive::{DriveCommand, DrivePublisher};
pub use mode::{ControlState, Mode, ModeCell, ToggleFlags};
pub use task::{TaskKind, TaskManager, TaskOutcome};

use std::sync::Arc;

use crate::bus::{Topic, ACTUATORS_TOPIC, DEFAULT_DEPTH, DRIVE_TOPIC};

/// The two topics the rover publishes to the motor controller
pub struct Outbound{
    pub actuators: Arc<Topic<String>>,
    pub drive: Arc<Topic<DriveCommand>>,
}

impl Outbound{
    pub fn new() -> Self{
        Self{
            actuators: Arc::new(Topic::new(ACTUATORS_TOPIC, DEFAULT_DEPTH)),
            drive: Arc::new(Topic::new(DRIVE_TOPIC, DEFAULT_DEPTH)),
        }
    }
}

impl Default for Outbound{
    fn default() -> Self{
        Self::new()
    }
}
