/**
 * Rover Controller
 *
 * Owns everything the input handler touches: the edge detector, the task
 * manager, the camera streams and the handles to the shared control state.
 * One joystick frame in, zero or more drive/actuator/handshake effects out.
 *
 * Only the autonomous worker ever blocks; this path returns promptly.
 */

use std::sync::Arc;

use super::camera::{CameraSelector, StreamProcess, StreamResource};
use super::drive::{DriveCommand, DrivePublisher};
use super::mode::{ControlState, Mode, ToggleFlags};
use super::task::{TaskContext, TaskKind, TaskManager, TaskOutcome};
use super::Outbound;
use crate::config::ControlConfig;
use crate::input::{EdgeDetector, JoyFrame, MarkerPose, RisingEdges};
use crate::uart::{Command, HandshakeClient};

pub struct RoverController<R: StreamResource = StreamProcess>{
    config: ControlConfig,
    state: Arc<ControlState>,
    edges: EdgeDetector,
    tasks: TaskManager,
    drive: Arc<DrivePublisher>,
    handshake: Arc<HandshakeClient>,
    cameras: CameraSelector<R>,
    markers: Vec<MarkerPose>,
}

impl RoverController<StreamProcess>{
    pub fn from_config(config: ControlConfig, handshake: Arc<HandshakeClient>, outbound: &Outbound) -> Self{
        let cameras = CameraSelector::from_config(&config.camera);
        Self::new(config, handshake, outbound, cameras)
    }
}

impl<R: StreamResource> RoverController<R>{
    pub fn new(
        config: ControlConfig,
        handshake: Arc<HandshakeClient>,
        outbound: &Outbound,
        cameras: CameraSelector<R>,
    ) -> Self{
        let state = Arc::new(ControlState::new());
        let drive = Arc::new(DrivePublisher::new(
            Arc::clone(&outbound.drive),
            config.drive.clone(),
        ));
        let tasks = TaskManager::new(TaskContext{
            state: Arc::clone(&state),
            handshake: Arc::clone(&handshake),
            drive: Arc::clone(&drive),
            choreography: config.choreography.clone(),
            ack_timeout: config.serial.ack_timeout(),
        });

        Self{
            config,
            state,
            edges: EdgeDetector::new(),
            tasks,
            drive,
            handshake,
            cameras,
            markers: Vec::new(),
        }
    }

    /// Shared mode/toggle state, for the periodic actuator publisher
    pub fn state(&self) -> Arc<ControlState>{
        Arc::clone(&self.state)
    }

    pub fn mode(&self) -> Mode{
        self.state.mode()
    }

    pub fn toggles(&self) -> ToggleFlags{
        self.state.toggles()
    }

    pub fn drive_command(&self) -> DriveCommand{
        self.drive.current()
    }

    pub fn active_task(&self) -> Option<TaskKind>{
        self.tasks.active_kind()
    }

    pub fn active_camera(&self) -> Option<usize>{
        self.cameras.active()
    }

    /// Collect a worker that finished on its own
    pub fn poll_tasks(&mut self) -> Option<(TaskKind, TaskOutcome)>{
        let reaped = self.tasks.reap();
        if let Some((kind, outcome)) = &reaped{
            log::debug!("Reaped autonomous {} worker: {:?}", kind.name(), outcome);
        }
        reaped
    }

    /// Process one joystick frame
    pub fn handle_input(&mut self, frame: &JoyFrame){
        self.poll_tasks();

        let edges = self.edges.rising(&frame.buttons);

        if self.state.mode() == Mode::Teleop{
            self.drive.drive_from_joystick(frame, &self.config.gamepad);
            self.handle_teleop_toggles(&edges);
        }

        // These work in every mode
        if edges.contains(self.config.gamepad.dig_button){
            self.handle_autonomy_button(TaskKind::Dig);
        }
        if edges.contains(self.config.gamepad.offload_button){
            self.handle_autonomy_button(TaskKind::Offload);
        }

        self.edges.commit(&frame.buttons);
    }

    /// Keep the newest marker detections for offload alignment
    pub fn handle_markers(&mut self, markers: &[MarkerPose]){
        log::trace!("Received {} marker poses", markers.len());
        self.markers.clear();
        self.markers.extend_from_slice(markers);
    }

    pub fn latest_markers(&self) -> &[MarkerPose]{
        &self.markers
    }

    /// Cancel autonomy, stop the drivetrain and tear down the camera stream
    pub fn shutdown(&mut self){
        self.tasks.shutdown();
        if self.state.mode().is_autonomous(){
            self.state.enter_teleop_cleared();
        }
        self.drive.stop();
        if let Err(e) = self.cameras.stop_all(){
            log::warn!("Camera teardown failed: {}", e);
        }
    }

    fn handle_teleop_toggles(&mut self, edges: &RisingEdges){
        let mapping = &self.config.gamepad;

        if edges.contains(mapping.digger_button){
            self.state.update_toggles(|t| t.digger_on = !t.digger_on);
        }
        if edges.contains(mapping.offloader_button){
            self.state.update_toggles(|t| t.offloader_on = !t.offloader_on);
        }

        if edges.contains(mapping.extend_button){
            if let Some(toggles) = self.state.update_toggles(|t| t.digger_extended = !t.digger_extended){
                let cmd = if toggles.digger_extended{
                    Command::Extend
                }else{
                    Command::Retract
                };
                if let Err(e) = self.handshake.send(cmd){
                    log::warn!("Digger {:?} not sent: {}", cmd, e);
                }
            }
        }

        if edges.contains(mapping.camera_button){
            if let Some(toggles) = self.state.update_toggles(|t| t.camera_select = !t.camera_select){
                if let Err(e) = self.cameras.apply(toggles.camera_select){
                    log::warn!("Camera switch failed: {}", e);
                }
            }
        }
    }

    fn handle_autonomy_button(&mut self, kind: TaskKind){
        let mode = self.state.mode();

        if mode == Mode::Teleop{
            self.state.set_mode(kind.mode());
            if let Err(e) = self.tasks.spawn(kind){
                log::warn!("Could not start autonomous {}: {}", kind.name(), e);
                self.state.transition(kind.mode(), Mode::Teleop);
            }
        }else if mode == kind.mode(){
            self.tasks.cancel(kind);
            self.state.enter_teleop_cleared();
        }else{
            log::debug!("Ignoring {} button in {:?}", kind.name(), mode);
        }
    }
}

#[cfg(test)]
mod tests{
    use super::*;
    use crate::bus::Subscriber;
    use crate::config::ChoreographyConfig;
    use crate::rover::camera::tests::FakeStream;
    use crate::uart::MockTransport;
    use std::thread;
    use std::time::{Duration, Instant};

    const BUTTONS: usize = 12;

    struct Rig{
        controller: RoverController<FakeStream>,
        mock: MockTransport,
        outbound: Outbound,
    }

    fn config(warmup_ms: u64, offload_ms: u64) -> ControlConfig{
        let mut config = ControlConfig::default();
        config.choreography = ChoreographyConfig{
            dig_warmup_ms: warmup_ms,
            dig_drive_ms: 10,
            offload_ms,
        };
        config.serial.ack_timeout_ms = 50;
        config.serial.poll_interval_ms = 1;
        config
    }

    fn rig_with(config: ControlConfig, handshake: Option<HandshakeClient>) -> Rig{
        let mock = MockTransport::new();
        let handshake = handshake.unwrap_or_else(||{
            HandshakeClient::with_transport(Box::new(mock.clone()), config.serial.poll_interval())
        });
        let outbound = Outbound::new();
        let (front, rear, _live) = FakeStream::pair();
        let controller = RoverController::new(
            config,
            Arc::new(handshake),
            &outbound,
            CameraSelector::new(front, rear),
        );
        Rig{
            controller,
            mock,
            outbound,
        }
    }

    fn rig(warmup_ms: u64, offload_ms: u64) -> Rig{
        rig_with(config(warmup_ms, offload_ms), None)
    }

    fn frame(pressed: &[usize]) -> JoyFrame{
        let mut buttons = vec![false; BUTTONS];
        for &i in pressed{
            buttons[i] = true;
        }
        JoyFrame::new(vec![0.0; 8], buttons)
    }

    impl Rig{
        fn gamepad(&self) -> crate::config::GamepadConfig{
            self.controller.config.gamepad.clone()
        }

        //press then release, two input cycles
        fn tap(&mut self, button: usize){
            self.controller.handle_input(&frame(&[button]));
            self.controller.handle_input(&frame(&[]));
        }
    }

    fn reap_within<R: StreamResource>(
        controller: &mut RoverController<R>,
        timeout: Duration,
    ) -> Option<(TaskKind, TaskOutcome)>{
        let start = Instant::now();
        while start.elapsed() < timeout{
            if let Some(reaped) = controller.poll_tasks(){
                return Some(reaped);
            }
            thread::sleep(Duration::from_millis(2));
        }
        None
    }

    #[test]
    fn test_starts_in_teleop(){
        let rig = rig(0, 0);
        assert_eq!(rig.controller.mode(), Mode::Teleop);
        assert_eq!(rig.controller.active_task(), None);
        assert_eq!(rig.controller.toggles(), ToggleFlags::default());
    }

    #[test]
    fn test_teleop_drives_from_axes(){
        let mut rig = rig(0, 0);
        let mapping = rig.gamepad();
        let mut drive_sub = Subscriber::new(Arc::clone(&rig.outbound.drive));

        let mut input = frame(&[]);
        input.axes[mapping.forward_axis] = 0.75;
        input.axes[mapping.turn_axis] = -0.25;
        rig.controller.handle_input(&input);

        assert_eq!(drive_sub.try_recv(), Some(DriveCommand::new(0.75, -0.25)));
        //published on every input event
        rig.controller.handle_input(&input);
        assert!(drive_sub.try_recv().is_some());
    }

    #[test]
    fn test_held_button_toggles_once(){
        let mut rig = rig(0, 0);
        let digger = rig.gamepad().digger_button;

        for _ in 0..4{
            rig.controller.handle_input(&frame(&[digger]));
        }
        assert!(rig.controller.toggles().digger_on);

        rig.controller.handle_input(&frame(&[]));
        rig.controller.handle_input(&frame(&[digger]));
        assert!(!rig.controller.toggles().digger_on);
    }

    #[test]
    fn test_offloader_toggle(){
        let mut rig = rig(0, 0);
        let offloader = rig.gamepad().offloader_button;
        rig.tap(offloader);
        assert!(rig.controller.toggles().offloader_on);
        assert!(!rig.controller.toggles().digger_on);
    }

    #[test]
    fn test_extend_toggle_sends_requests(){
        let mut rig = rig(0, 0);
        let extend = rig.gamepad().extend_button;

        rig.tap(extend);
        assert!(rig.controller.toggles().digger_extended);
        rig.tap(extend);
        assert!(!rig.controller.toggles().digger_extended);
        assert_eq!(rig.mock.written(), vec![b'e', b'r']);
    }

    #[test]
    fn test_dig_button_starts_and_cancels(){
        let mut rig = rig(10_000, 0);
        let mapping = rig.gamepad();
        rig.tap(mapping.digger_button);
        rig.tap(mapping.offloader_button);

        rig.tap(mapping.dig_button);
        assert_eq!(rig.controller.mode(), Mode::AutoDig);
        assert_eq!(rig.controller.active_task(), Some(TaskKind::Dig));

        let start = Instant::now();
        rig.tap(mapping.dig_button);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(rig.controller.mode(), Mode::Teleop);
        assert_eq!(rig.controller.active_task(), None);
        assert_eq!(rig.controller.drive_command(), DriveCommand::STOP);

        let toggles = rig.controller.toggles();
        assert!(!toggles.digger_on);
        assert!(!toggles.offloader_on);
        assert_eq!(rig.mock.written(), vec![b'r']);
    }

    #[test]
    fn test_offload_button_starts_and_cancels(){
        let mut rig = rig(0, 10_000);
        let offload = rig.gamepad().offload_button;

        rig.tap(offload);
        assert_eq!(rig.controller.mode(), Mode::AutoOffload);
        assert_eq!(rig.controller.active_task(), Some(TaskKind::Offload));

        rig.tap(offload);
        assert_eq!(rig.controller.mode(), Mode::Teleop);
        assert_eq!(rig.controller.active_task(), None);
        assert!(rig.mock.written().is_empty());
    }

    #[test]
    fn test_mismatched_trigger_is_noop(){
        let mut rig = rig(10_000, 0);
        let mapping = rig.gamepad();

        rig.tap(mapping.dig_button);
        rig.tap(mapping.offload_button);
        assert_eq!(rig.controller.mode(), Mode::AutoDig);
        assert_eq!(rig.controller.active_task(), Some(TaskKind::Dig));

        rig.tap(mapping.dig_button);
        assert_eq!(rig.controller.mode(), Mode::Teleop);
    }

    #[test]
    fn test_autonomy_freezes_teleop_inputs(){
        let mut rig = rig(10_000, 0);
        let mapping = rig.gamepad();

        rig.tap(mapping.dig_button);
        let mut input = frame(&[mapping.digger_button, mapping.camera_button]);
        input.axes[mapping.forward_axis] = 1.0;
        rig.controller.handle_input(&input);

        assert_eq!(rig.controller.toggles(), ToggleFlags::default());
        assert_eq!(rig.controller.active_camera(), None);
        assert!(rig.controller.drive_command().is_stopped());
        rig.controller.shutdown();
    }

    #[test]
    fn test_natural_completion_returns_to_teleop(){
        let mut rig = rig(0, 10);
        let offload = rig.gamepad().offload_button;

        rig.controller.handle_input(&frame(&[offload]));
        let reaped = reap_within(&mut rig.controller, Duration::from_secs(2));
        assert_eq!(reaped, Some((TaskKind::Offload, TaskOutcome::Completed)));
        assert_eq!(rig.controller.mode(), Mode::Teleop);
        assert_eq!(rig.controller.active_task(), None);

        //a new press starts a fresh worker
        rig.controller.handle_input(&frame(&[]));
        rig.tap(offload);
        assert_eq!(rig.controller.mode(), Mode::AutoOffload);
        rig.controller.shutdown();
    }

    #[test]
    fn test_failed_link_keeps_teleop_usable(){
        let mut rig = rig_with(config(0, 0), Some(HandshakeClient::failed("unplugged")));
        let mapping = rig.gamepad();

        rig.tap(mapping.extend_button);
        assert!(rig.controller.toggles().digger_extended);

        rig.controller.handle_input(&frame(&[mapping.dig_button]));
        let (kind, outcome) = reap_within(&mut rig.controller, Duration::from_secs(1)).unwrap();
        assert_eq!(kind, TaskKind::Dig);
        assert!(matches!(outcome, TaskOutcome::Failed(_)));
        assert_eq!(rig.controller.mode(), Mode::Teleop);

        rig.controller.handle_input(&frame(&[]));
        rig.tap(mapping.digger_button);
        assert!(rig.controller.toggles().digger_on);
    }

    #[test]
    fn test_camera_toggle_is_exclusive(){
        let mut rig = rig(0, 0);
        let camera = rig.gamepad().camera_button;

        for n in 1..=5{
            rig.tap(camera);
            assert_eq!(rig.controller.cameras.active_count(), 1);
            let expected = if n % 2 == 1 { 0 }else { 1 };
            assert_eq!(rig.controller.active_camera(), Some(expected));
        }

        rig.controller.shutdown();
        assert_eq!(rig.controller.active_camera(), None);
    }

    #[test]
    fn test_never_two_tasks(){
        let mut rig = rig(10_000, 10_000);
        let mapping = rig.gamepad();
        let sequence = [
            mapping.dig_button,
            mapping.offload_button,
            mapping.dig_button,
            mapping.offload_button,
            mapping.offload_button,
            mapping.dig_button,
            mapping.offload_button,
        ];

        for button in sequence{
            rig.tap(button);
            let mode = rig.controller.mode();
            match rig.controller.active_task(){
                Some(kind) => assert_eq!(kind.mode(), mode),
                None => assert_eq!(mode, Mode::Teleop),
            }
        }
        rig.controller.shutdown();
        assert_eq!(rig.controller.mode(), Mode::Teleop);
    }

    #[test]
    fn test_markers_retained(){
        let mut rig = rig(0, 0);
        let pose = MarkerPose{
            id: 7,
            translation: [0.0, 0.0, 2.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        };
        rig.controller.handle_markers(&[pose]);
        assert_eq!(rig.controller.latest_markers(), &[pose]);
        rig.controller.handle_markers(&[]);
        assert!(rig.controller.latest_markers().is_empty());
    }
}
