pub mod error;
pub mod config;
pub mod bus;
pub mod input;
pub mod uart;
pub mod rover;

pub use error::{Error, Result};
pub use config::ControlConfig;

pub use bus::{Message, Topic, Subscriber, History};
pub use input::{JoyFrame, EdgeDetector, MarkerPose};
pub use uart::{Ack, Command, HandshakeClient, Transport, SerialTransport, MockTransport};
pub use rover::{
    ControlState, Mode, ToggleFlags,
    DriveCommand, DrivePublisher,
    TaskKind, TaskManager, TaskOutcome,
    CameraSelector, StreamProcess, StreamResource,
    Outbound, RoverController,
};
