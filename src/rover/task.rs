/**
 * Autonomous Task Manager
 *
 * Runs at most one autonomous procedure on its own thread. The worker
 * observes cancellation at checkpoints (every timed wait and every
 * handshake poll) over a channel, and reports how it ended over another.
 * Cancelling is synchronous: when `cancel` returns the worker has exited,
 * the drivetrain is at zero and the digger has been told to retract.
 */

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::drive::DrivePublisher;
use super::mode::{ControlState, Mode};
use crate::config::ChoreographyConfig;
use crate::error::{Error, Result};
use crate::uart::{Command, HandshakeClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind{
    Dig,
    Offload,
}

impl TaskKind{
    /// Mode the robot is in while this task runs
    pub fn mode(self) -> Mode{
        match self{
            TaskKind::Dig => Mode::AutoDig,
            TaskKind::Offload => Mode::AutoOffload,
        }
    }

    pub fn name(self) -> &'static str{
        match self{
            TaskKind::Dig => "dig",
            TaskKind::Offload => "offload",
        }
    }
}

/// How a worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome{
    Completed,
    /// Stopped by a cancel request
    Aborted,
    Failed(String),
}

/// Cancellation point handed to a running procedure
///
/// The manager signals cancellation by dropping the sending half, so every
/// later check observes it.
pub struct Checkpoint{
    cancel_rx: Receiver<()>,
}

impl Checkpoint{
    pub fn is_cancelled(&self) -> bool{
        !matches!(self.cancel_rx.try_recv(), Err(TryRecvError::Empty))
    }

    pub fn check(&self) -> Result<()>{
        if self.is_cancelled(){
            Err(Error::Cancelled)
        }else{
            Ok(())
        }
    }

    /// Wait for `duration`, returning early with `Cancelled`
    pub fn sleep(&self, duration: Duration) -> Result<()>{
        match self.cancel_rx.recv_timeout(duration){
            Err(RecvTimeoutError::Timeout) => Ok(()),
            _ => Err(Error::Cancelled),
        }
    }
}

/// Everything a worker needs, cloned into its thread
#[derive(Clone)]
pub struct TaskContext{
    pub state: Arc<ControlState>,
    pub handshake: Arc<HandshakeClient>,
    pub drive: Arc<DrivePublisher>,
    pub choreography: ChoreographyConfig,
    pub ack_timeout: Duration,
}

struct ActiveTask{
    kind: TaskKind,
    cancel_tx: Sender<()>,
    outcome_rx: Receiver<TaskOutcome>,
    handle: JoinHandle<()>,
}

pub struct TaskManager{
    ctx: TaskContext,
    active: Option<ActiveTask>,
}

impl TaskManager{
    pub fn new(ctx: TaskContext) -> Self{
        Self{ ctx, active: None }
    }

    pub fn active_kind(&self) -> Option<TaskKind>{
        self.active.as_ref().map(|task| task.kind)
    }

    /// Start a worker for `kind`
    ///
    /// The caller sets the mode first; on natural completion or failure the
    /// worker moves that mode back to Teleop, but only if it is unchanged.
    pub fn spawn(&mut self, kind: TaskKind) -> Result<()>{
        self.reap();
        if let Some(active) = &self.active{
            return Err(Error::TaskAlreadyRunning(active.kind));
        }

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let (outcome_tx, outcome_rx) = bounded::<TaskOutcome>(1);
        let ctx = self.ctx.clone();

        let handle = thread::Builder::new()
            .name(format!("auto-{}", kind.name()))
            .spawn(move ||{
                let checkpoint = Checkpoint{ cancel_rx };
                let outcome = run_procedure(kind, &ctx, &checkpoint);

                if outcome != TaskOutcome::Aborted && ctx.state.transition(kind.mode(), Mode::Teleop){
                    log::info!("Autonomous {} finished ({:?}), back to Teleop", kind.name(), outcome);
                }
                let _ = outcome_tx.send(outcome);
            })?;

        log::info!("Spawned autonomous {} worker", kind.name());
        self.active = Some(ActiveTask{
            kind,
            cancel_tx,
            outcome_rx,
            handle,
        });
        Ok(())
    }

    /// Stop the `kind` worker and wait for it to exit
    ///
    /// Returns `None` if no worker of that kind is running.
    pub fn cancel(&mut self, kind: TaskKind) -> Option<TaskOutcome>{
        if self.active_kind() != Some(kind){
            return None;
        }
        let ActiveTask{
            kind,
            cancel_tx,
            outcome_rx,
            handle,
        } = self.active.take()?;

        drop(cancel_tx);
        self.ctx.drive.stop();
        if handle.join().is_err(){
            log::error!("Autonomous {} worker panicked", kind.name());
        }
        // The worker may have driven between the first stop and its exit
        self.ctx.drive.stop();

        if kind == TaskKind::Dig{
            if let Err(e) = self.ctx.handshake.send(Command::Retract){
                log::warn!("Could not retract digger after cancel: {}", e);
            }
        }

        let outcome = outcome_rx.try_recv().unwrap_or(TaskOutcome::Aborted);
        log::info!("Autonomous {} procedure terminated ({:?})", kind.name(), outcome);
        Some(outcome)
    }

    /// Collect a worker that ended on its own
    pub fn reap(&mut self) -> Option<(TaskKind, TaskOutcome)>{
        let active = self.active.as_ref()?;
        let outcome = match active.outcome_rx.try_recv(){
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) =>{
                // Worker died without reporting; undo what it could not
                self.ctx.drive.stop();
                self.ctx.state.transition(active.kind.mode(), Mode::Teleop);
                TaskOutcome::Failed("worker exited without reporting".to_string())
            }
        };

        let task = self.active.take()?;
        if task.handle.join().is_err(){
            log::error!("Autonomous {} worker panicked", task.kind.name());
        }
        Some((task.kind, outcome))
    }

    /// Cancel whatever is running
    pub fn shutdown(&mut self){
        if let Some(kind) = self.active_kind(){
            self.cancel(kind);
        }
    }
}

impl Drop for TaskManager{
    fn drop(&mut self){
        self.shutdown();
    }
}

fn run_procedure(kind: TaskKind, ctx: &TaskContext, checkpoint: &Checkpoint) -> TaskOutcome{
    let result = match kind{
        TaskKind::Dig => dig_procedure(ctx, checkpoint),
        TaskKind::Offload => offload_procedure(ctx, checkpoint),
    };

    match result{
        Ok(()) => TaskOutcome::Completed,
        Err(Error::Cancelled) =>{
            ctx.drive.stop();
            TaskOutcome::Aborted
        }
        Err(e) =>{
            ctx.drive.stop();
            log::warn!("Autonomous {} procedure failed: {}", kind.name(), e);
            TaskOutcome::Failed(e.to_string())
        }
    }
}

fn dig_procedure(ctx: &TaskContext, checkpoint: &Checkpoint) -> Result<()>{
    log::info!("Starting autonomous digging procedure");
    let abort = || checkpoint.is_cancelled();

    ctx.handshake.flush_input()?;
    checkpoint.sleep(ctx.choreography.dig_warmup())?;

    ctx.handshake.request(Command::Extend, ctx.ack_timeout, abort)?;
    checkpoint.check()?;

    ctx.drive.drive_digging();
    let driven = checkpoint.sleep(ctx.choreography.dig_drive());
    ctx.drive.stop();
    driven?;

    ctx.handshake.request(Command::Retract, ctx.ack_timeout, abort)?;

    log::info!("Autonomous digging procedure complete");
    Ok(())
}

fn offload_procedure(ctx: &TaskContext, checkpoint: &Checkpoint) -> Result<()>{
    log::info!("Starting autonomous offload procedure");

    // TODO: drive up to the collection bin using the latest marker pose before waiting
    checkpoint.sleep(ctx.choreography.offload())?;

    log::info!("Autonomous offload procedure complete");
    Ok(())
}
