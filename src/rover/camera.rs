//! Mutually exclusive video streams
//!
//! Each stream is an external pipeline started in its own process group so
//! that tearing it down also takes out every child it spawned. At most one
//! stream runs at a time.

use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::CameraConfig;
use crate::error::{Error, Result};

/// An external resource that can be started and torn down
pub trait StreamResource{
    fn name(&self) -> &str;

    fn start(&mut self) -> Result<()>;

    /// Tear down; stopping an inactive resource is not an error
    fn stop(&mut self) -> Result<()>;

    fn is_active(&self) -> bool;
}

//how long a stream gets to exit after SIGTERM before the group is killed
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_millis(1000);
const EXIT_POLL: Duration = Duration::from_millis(10);

/// Owned handle to a shell pipeline running in its own process group
pub struct StreamProcess{
    name: String,
    command: String,
    grace: Duration,
    child: Option<Child>,
    last_status: Option<ExitStatus>,
}

impl StreamProcess{
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self{
        Self{
            name: name.into(),
            command: command.into(),
            grace: DEFAULT_STOP_GRACE,
            child: None,
            last_status: None,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self{
        self.grace = grace;
        self
    }

    /// Exit status captured by the most recent teardown
    pub fn last_status(&self) -> Option<ExitStatus>{
        self.last_status
    }

    pub fn pid(&self) -> Option<u32>{
        self.child.as_ref().map(Child::id)
    }
}

impl StreamResource for StreamProcess{
    fn name(&self) -> &str{
        &self.name
    }

    fn start(&mut self) -> Result<()>{
        if self.child.is_some(){
            return Ok(());
        }

        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|e| Error::Resource(format!("failed to start {}: {}", self.name, e)))?;

        log::info!("Started {} stream (pid {})", self.name, child.id());
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) -> Result<()>{
        let Some(mut child) = self.child.take() else{
            log::debug!("{} stream already stopped", self.name);
            return Ok(());
        };

        // The child leads its own group, so its pid is the group id
        let pgid = child.id() as libc::pid_t;

        if child.try_wait()?.is_none(){
            if let Err(e) = signal_group(pgid, libc::SIGTERM){
                log::warn!("SIGTERM to {} group {} failed: {}", self.name, pgid, e);
            }

            let deadline = Instant::now() + self.grace;
            while child.try_wait()?.is_none() && Instant::now() < deadline{
                thread::sleep(EXIT_POLL);
            }
        }

        // Escalate: takes out a leader that ignored SIGTERM and any stragglers
        if let Err(e) = signal_group(pgid, libc::SIGKILL){
            log::warn!("SIGKILL to {} group {} failed: {}", self.name, pgid, e);
            if child.try_wait()?.is_none(){
                child.kill()?;
            }
        }

        let status = child.wait()?;
        log::info!("Stopped {} stream ({})", self.name, status);
        self.last_status = Some(status);
        Ok(())
    }

    fn is_active(&self) -> bool{
        self.child.is_some()
    }
}

impl Drop for StreamProcess{
    fn drop(&mut self){
        if let Err(e) = self.stop(){
            log::warn!("Failed to stop {} stream: {}", self.name, e);
        }
    }
}

/// Send `signal` to a process group; a group that no longer exists is fine
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) -> io::Result<()>{
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc != 0{
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH){
            return Err(err);
        }
    }
    Ok(())
}

/// Two resources of which at most one is ever active
pub struct ExclusivePair<R: StreamResource>{
    resources: [R; 2],
}

impl<R: StreamResource> ExclusivePair<R>{
    pub fn new(first: R, second: R) -> Self{
        Self{
            resources: [first, second],
        }
    }

    /// Activate `index` (0 or 1), tearing the other one down first
    pub fn select(&mut self, index: usize) -> Result<()>{
        if index > 1{
            return Err(Error::InvalidInput(format!("no resource at index {}", index)));
        }

        let other = 1 - index;
        if self.resources[other].is_active(){
            self.resources[other].stop()?;
        }
        self.resources[index].start()
    }

    pub fn stop_all(&mut self) -> Result<()>{
        for resource in &mut self.resources{
            resource.stop()?;
        }
        Ok(())
    }

    pub fn active(&self) -> Option<usize>{
        self.resources.iter().position(|r| r.is_active())
    }

    pub fn active_count(&self) -> usize{
        self.resources.iter().filter(|r| r.is_active()).count()
    }

    pub fn get(&self, index: usize) -> Option<&R>{
        self.resources.get(index)
    }
}

/// Front/rear camera streams selected by the camera toggle
pub struct CameraSelector<R: StreamResource = StreamProcess>{
    streams: ExclusivePair<R>,
}

pub const FRONT_CAMERA: usize = 0;
pub const REAR_CAMERA: usize = 1;

impl CameraSelector<StreamProcess>{
    pub fn from_config(config: &CameraConfig) -> Self{
        Self::new(
            StreamProcess::new("front camera", config.front_command.clone())
                .with_grace(config.stop_grace()),
            StreamProcess::new("rear camera", config.rear_command.clone())
                .with_grace(config.stop_grace()),
        )
    }
}

impl<R: StreamResource> CameraSelector<R>{
    pub fn new(front: R, rear: R) -> Self{
        Self{
            streams: ExclusivePair::new(front, rear),
        }
    }

    /// Apply the camera toggle value: true streams the front camera
    pub fn apply(&mut self, front_selected: bool) -> Result<()>{
        let index = if front_selected { FRONT_CAMERA }else { REAR_CAMERA };
        self.streams.select(index)
    }

    pub fn active(&self) -> Option<usize>{
        self.streams.active()
    }

    pub fn active_count(&self) -> usize{
        self.streams.active_count()
    }

    pub fn stop_all(&mut self) -> Result<()>{
        self.streams.stop_all()
    }
}
