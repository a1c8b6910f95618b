/**
 * Actuator Command Publisher
 *
 * Level-driven: every tick renders the current (mode, toggles) pair into a
 * text command for the motor controller, whether or not anything changed.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::mode::{ControlState, Mode, ToggleFlags};
use crate::bus::Topic;
use crate::config::ActuatorConfig;

pub const STOP_ALL_ACTUATORS: &str = "STOP_ALL_ACTUATORS";
pub const DIGGER_ON: &str = "DIGGER_ON";
pub const DIGGER_OFF: &str = "DIGGER_OFF";
pub const OFFLOADER_ON: &str = "OFFLOADER_ON";
pub const OFFLOADER_OFF: &str = "OFFLOADER_OFF";

/// Command text for a mode and toggle state
///
/// AutoOffload has no actuator command and yields `None`.
pub fn actuator_command(mode: Mode, toggles: &ToggleFlags) -> Option<String>{
    match mode{
        Mode::EmergencyStop => Some(STOP_ALL_ACTUATORS.to_string()),
        Mode::AutoDig => Some(DIGGER_ON.to_string()),
        Mode::Teleop =>{
            let digger = if toggles.digger_on { DIGGER_ON }else { DIGGER_OFF };
            let offloader = if toggles.offloader_on { OFFLOADER_ON }else { OFFLOADER_OFF };
            Some(format!("{} {}", digger, offloader))
        }
        Mode::AutoOffload => None,
    }
}

pub struct ActuatorPublisher{
    state: Arc<ControlState>,
    topic: Arc<Topic<String>>,
    log_every: u64,
    ticks: u64,
}

impl ActuatorPublisher{
    pub fn new(state: Arc<ControlState>, topic: Arc<Topic<String>>, log_every: u64) -> Self{
        Self{
            state,
            topic,
            log_every: log_every.max(1),
            ticks: 0,
        }
    }

    /// Publish the command for the current state, if the mode defines one
    pub fn tick(&mut self) -> Option<String>{
        let (mode, toggles) = self.state.snapshot();
        let cmd = actuator_command(mode, &toggles)?;
        self.topic.publish(cmd.clone());

        self.ticks += 1;
        if self.ticks % self.log_every == 0{
            log::info!("Publishing: \"{}\"", cmd);
        }
        Some(cmd)
    }

    /// Run `tick` every `period` on a dedicated thread until `running` clears
    pub fn spawn(mut self, period: Duration, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>>{
        thread::Builder::new()
            .name("actuator-publisher".to_string())
            .spawn(move ||{
                let mut next = Instant::now();
                while running.load(Ordering::SeqCst){
                    self.tick();
                    next += period;
                    let now = Instant::now();
                    if next > now{
                        thread::sleep(next - now);
                    }else{
                        // Fell behind; restart the schedule instead of bursting
                        next = now;
                    }
                }
                log::debug!("Actuator publisher stopped");
            })
    }
}

/// Convenience for the binary: build and start from config
pub fn start_actuator_loop(
    state: Arc<ControlState>,
    topic: Arc<Topic<String>>,
    config: &ActuatorConfig,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>>{
    ActuatorPublisher::new(state, topic, config.log_every).spawn(config.period(), running)
}

#[cfg(test)]
mod tests{
    use super::*;
    use crate::bus::Subscriber;

    #[test]
    fn test_command_per_mode(){
        let toggles = ToggleFlags{
            digger_on: true,
            ..ToggleFlags::default()
        };
        assert_eq!(
            actuator_command(Mode::EmergencyStop, &toggles).as_deref(),
            Some(STOP_ALL_ACTUATORS)
        );
        assert_eq!(actuator_command(Mode::AutoDig, &toggles).as_deref(), Some(DIGGER_ON));
        assert_eq!(
            actuator_command(Mode::Teleop, &toggles).as_deref(),
            Some("DIGGER_ON OFFLOADER_OFF")
        );
        assert_eq!(actuator_command(Mode::AutoOffload, &toggles), None);
    }

    #[test]
    fn test_teleop_all_combinations(){
        let cases = [
            (false, false, "DIGGER_OFF OFFLOADER_OFF"),
            (true, false, "DIGGER_ON OFFLOADER_OFF"),
            (false, true, "DIGGER_OFF OFFLOADER_ON"),
            (true, true, "DIGGER_ON OFFLOADER_ON"),
        ];
        for (digger_on, offloader_on, expected) in cases{
            let toggles = ToggleFlags{
                digger_on,
                offloader_on,
                ..ToggleFlags::default()
            };
            assert_eq!(actuator_command(Mode::Teleop, &toggles).unwrap(), expected);
        }
    }

    #[test]
    fn test_repeated_ticks_identical(){
        let state = Arc::new(ControlState::new());
        let topic = Arc::new(Topic::new("cmd_actuators", 64));
        let mut publisher = ActuatorPublisher::new(Arc::clone(&state), Arc::clone(&topic), 20);

        let outputs: Vec<_> = (0..45).map(|_| publisher.tick()).collect();
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(topic.latest_epoch(), 45);
    }

    #[test]
    fn test_auto_offload_publishes_nothing(){
        let state = Arc::new(ControlState::new());
        let topic = Arc::new(Topic::new("cmd_actuators", 8));
        let mut publisher = ActuatorPublisher::new(Arc::clone(&state), Arc::clone(&topic), 20);

        state.set_mode(Mode::AutoOffload);
        assert_eq!(publisher.tick(), None);
        assert!(topic.is_empty());
    }

    #[test]
    fn test_periodic_loop_publishes_and_stops(){
        let state = Arc::new(ControlState::new());
        let topic = Arc::new(Topic::new("cmd_actuators", 256));
        let mut sub = Subscriber::new(Arc::clone(&topic));
        let running = Arc::new(AtomicBool::new(true));

        let config = ActuatorConfig{
            period_ms: 5,
            log_every: 20,
        };
        let handle = start_actuator_loop(state, Arc::clone(&topic), &config, Arc::clone(&running)).unwrap();
        thread::sleep(Duration::from_millis(60));
        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();

        assert!(topic.latest_epoch() >= 2);
        assert_eq!(sub.try_recv().as_deref(), Some("DIGGER_OFF OFFLOADER_OFF"));
    }
}
