/**
 * Rover Control Binary
 *
 * Runs the excavation rover control core:
 * 1. Opens the actuator link (best-effort)
 * 2. Publishes actuator commands on a fixed schedule
 * 3. Reads joystick frames from stdin and drives the mode state machine
 * 4. Echoes the outbound command topics to the log
 *
 * Usage: rovr_control [--config <path> | -c <path> | <path>]
 * Default config: rovr_control.toml (defaults used if absent)
 *
 * Stdin lines:
 *   <axis>,<axis>,...|<button>,<button>,...    joystick frame
 *   marker <id> <tx> <ty> <tz> <qx> <qy> <qz> <qw>
 */

use std::env;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, RecvTimeoutError};

use rovr_control::bus::Subscriber;
use rovr_control::rover::start_actuator_loop;
use rovr_control::{
    ControlConfig, Error, HandshakeClient, JoyFrame, MarkerPose, Outbound, Result,
    RoverController,
};

const DEFAULT_CONFIG: &str = "rovr_control.toml";
const IDLE_POLL: Duration = Duration::from_millis(100);

enum InputLine{
    Joy(JoyFrame),
    Marker(MarkerPose),
}

fn parse_config_path() -> String{
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len(){
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len(){
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-'){
        return args[1].clone();
    }

    DEFAULT_CONFIG.to_string()
}

fn parse_line(line: &str) -> Result<InputLine>{
    match line.trim().strip_prefix("marker "){
        Some(pose) => Ok(InputLine::Marker(pose.parse()?)),
        None => Ok(InputLine::Joy(line.parse()?)),
    }
}

//stdin blocks, so it gets its own thread and hands lines over a channel
fn spawn_stdin_reader(tx: crossbeam_channel::Sender<String>) -> io::Result<JoinHandle<()>>{
    thread::Builder::new().name("stdin-reader".to_string()).spawn(move ||{
        for line in io::stdin().lock().lines(){
            match line{
                Ok(line) =>{
                    if tx.send(line).is_err(){
                        break;
                    }
                }
                Err(e) =>{
                    log::error!("stdin read failed: {}", e);
                    break;
                }
            }
        }
        log::debug!("stdin closed");
    })
}

//stands in for the motor controller on the other end of both topics
fn spawn_topic_echo(outbound: &Outbound, running: Arc<AtomicBool>) -> io::Result<JoinHandle<()>>{
    let mut actuators = Subscriber::new(Arc::clone(&outbound.actuators));
    let mut drive = Subscriber::new(Arc::clone(&outbound.drive));

    thread::Builder::new().name("topic-echo".to_string()).spawn(move ||{
        let mut last_actuators = String::new();
        while running.load(Ordering::Relaxed){
            //actuator commands repeat every tick; only report changes
            while let Some(cmd) = actuators.try_recv(){
                if cmd != last_actuators{
                    log::debug!("[{}] {}", actuators.topic_name(), cmd);
                    last_actuators = cmd;
                }
            }
            while let Some(cmd) = drive.try_recv(){
                log::debug!(
                    "[{}] forward={:.2} turn={:.2}",
                    drive.topic_name(),
                    cmd.forward,
                    cmd.turn
                );
            }
            thread::sleep(IDLE_POLL);
        }
    })
}

fn main() -> Result<()>{
    let config_path = parse_config_path();
    let config = ControlConfig::load_or_default(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Rover control starting (config: {})", config_path);
    log::info!(
        "Actuator link: {} @ {} baud",
        config.serial.device,
        config.serial.baud_rate
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move ||{
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Resource(format!("Error setting Ctrl-C handler: {}", e)))?;

    let outbound = Outbound::new();
    let handshake = Arc::new(HandshakeClient::open(&config.serial));
    if !handshake.is_available(){
        log::warn!("Teleop only: autonomous digging will fail until restart");
    }

    let actuator_config = config.actuators.clone();
    let mut controller = RoverController::from_config(config, handshake, &outbound);

    let actuator_handle = start_actuator_loop(
        controller.state(),
        Arc::clone(&outbound.actuators),
        &actuator_config,
        Arc::clone(&running),
    )?;
    let echo_handle = spawn_topic_echo(&outbound, Arc::clone(&running))?;

    let (line_tx, line_rx) = unbounded();
    //not joined: it stays blocked on stdin until the process exits
    spawn_stdin_reader(line_tx)?;

    log::info!("Rover control running. Press Ctrl-C to stop.");

    while running.load(Ordering::Relaxed){
        match line_rx.recv_timeout(IDLE_POLL){
            Ok(line) => match parse_line(&line){
                Ok(InputLine::Joy(frame)) => controller.handle_input(&frame),
                Ok(InputLine::Marker(pose)) => controller.handle_markers(&[pose]),
                Err(e) => log::warn!("Ignoring input line: {}", e),
            },
            Err(RecvTimeoutError::Timeout) =>{
                if let Some((kind, outcome)) = controller.poll_tasks(){
                    log::info!("Autonomous {} ended: {:?}", kind.name(), outcome);
                }
            }
            Err(RecvTimeoutError::Disconnected) =>{
                log::info!("Input closed, shutting down");
                running.store(false, Ordering::Relaxed);
            }
        }
    }

    controller.shutdown();
    if actuator_handle.join().is_err(){
        log::error!("Actuator publisher panicked");
    }
    if echo_handle.join().is_err(){
        log::error!("Topic echo panicked");
    }

    log::info!("Rover control stopped");
    Ok(())
}
