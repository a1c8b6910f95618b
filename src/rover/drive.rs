/**
 * Drive Command Publisher
 *
 * Turns joystick axes (teleop) or fixed constants (autonomous procedures)
 * into a (forward, turn) duty-cycle pair and publishes it on the drive
 * topic. Both paths go through the same clamp.
 */

use std::sync::Arc;
use parking_lot::Mutex;

use crate::bus::Topic;
use crate::config::{DriveConfig, GamepadConfig};
use crate::input::JoyFrame;

/// Forward and turning power, each within -1.0..=1.0
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand{
    pub forward: f32,
    pub turn: f32,
}

impl DriveCommand{
    pub const STOP: DriveCommand = DriveCommand{ forward: 0.0, turn: 0.0 };

    pub fn new(forward: f32, turn: f32) -> Self{
        Self{ forward, turn }
    }

    pub fn is_stopped(&self) -> bool{
        self.forward == 0.0 && self.turn == 0.0
    }
}

pub struct DrivePublisher{
    topic: Arc<Topic<DriveCommand>>,
    limits: DriveConfig,
    /// Last command sent to the drivetrain
    current: Mutex<DriveCommand>,
}

impl DrivePublisher{
    pub fn new(topic: Arc<Topic<DriveCommand>>, limits: DriveConfig) -> Self{
        Self{
            topic,
            limits,
            current: Mutex::new(DriveCommand::STOP),
        }
    }

    /// Clamp and publish a drive command
    pub fn drive(&self, forward: f32, turn: f32) -> DriveCommand{
        let cmd = DriveCommand{
            forward: clamp_power(forward, self.limits.max_drive_power),
            turn: clamp_power(turn, self.limits.max_turn_power),
        };

        // Holding the lock across publish keeps `current` in topic order
        let mut current = self.current.lock();
        *current = cmd;
        self.topic.publish(cmd);
        log::debug!("Drive forward={:.3} turn={:.3}", cmd.forward, cmd.turn);
        cmd
    }

    /// Linear joystick mapping used in Teleop
    pub fn drive_from_joystick(&self, frame: &JoyFrame, mapping: &GamepadConfig) -> DriveCommand{
        let forward = frame.axis(mapping.forward_axis) * self.limits.max_drive_power;
        let turn = frame.axis(mapping.turn_axis) * self.limits.max_turn_power;
        self.drive(forward, turn)
    }

    /// Creep forward at the reduced digging power
    pub fn drive_digging(&self) -> DriveCommand{
        self.drive(self.limits.dig_drive_power, 0.0)
    }

    pub fn stop(&self) -> DriveCommand{
        self.drive(0.0, 0.0)
    }

    pub fn current(&self) -> DriveCommand{
        *self.current.lock()
    }
}

fn clamp_power(value: f32, max: f32) -> f32{
    if value.is_nan(){
        return 0.0;
    }
    let max = max.abs();
    value.clamp(-max, max)
}
