use crate::error::{FormCoachError, Result};
use crate::exercise::ExerciseKind;
use crate::geometry::Point2D;
use crate::report::SessionSummary;
use crate::session::{FrameSnapshot, Session};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Work items for the session task, handled strictly in arrival order
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    Frame {
        landmarks: Vec<Point2D>,
        timestamp_ms: u64,
    },
    SelectExercise(ExerciseKind),
    Shutdown,
}

/// Host loop that owns a [`Session`] on a dedicated task
///
/// The task is the only writer. Everyone else talks to it through commands
/// and reads the latest [`FrameSnapshot`] from a watch channel, so an
/// exercise switch can never land in the middle of a frame.
pub struct Pipeline {
    commands: mpsc::Sender<PipelineCommand>,
    snapshots: watch::Receiver<FrameSnapshot>,
    cancellation_token: CancellationToken,
    task: JoinHandle<SessionSummary>,
}

impl Pipeline {
    /// Move `session` onto a new task with a command queue of `capacity`
    pub fn spawn(session: Session, capacity: usize) -> Self {
        let (commands, command_rx) = mpsc::channel(capacity.max(1));
        let (snapshot_tx, snapshots) = watch::channel(session.snapshot(0));
        let cancellation_token = CancellationToken::new();

        let task = tokio::spawn(run_session(
            session,
            command_rx,
            snapshot_tx,
            cancellation_token.clone(),
        ));

        info!("Coaching pipeline started");

        Self {
            commands,
            snapshots,
            cancellation_token,
            task,
        }
    }

    /// Queue a pose frame
    pub async fn submit_frame(&self, landmarks: Vec<Point2D>, timestamp_ms: u64) -> Result<()> {
        self.send(PipelineCommand::Frame {
            landmarks,
            timestamp_ms,
        })
        .await
    }

    /// Queue an exercise switch behind any frames already submitted
    pub async fn select_exercise(&self, kind: ExerciseKind) -> Result<()> {
        self.send(PipelineCommand::SelectExercise(kind)).await
    }

    async fn send(&self, command: PipelineCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FormCoachError::component("pipeline", "session task is not running"))
    }

    /// Sender for other producers, such as keyboard input
    pub fn command_sender(&self) -> mpsc::Sender<PipelineCommand> {
        self.commands.clone()
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<FrameSnapshot> {
        self.snapshots.clone()
    }

    /// Most recent snapshot
    pub fn latest(&self) -> FrameSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Drain queued commands, stop the task and return the final summary
    pub async fn shutdown(self) -> Result<SessionSummary> {
        if self.commands.send(PipelineCommand::Shutdown).await.is_err() {
            debug!("Session task already stopped");
        }

        self.task
            .await
            .map_err(|e| FormCoachError::component("pipeline".to_string(), e.to_string()))
    }
}

async fn run_session(
    mut session: Session,
    mut commands: mpsc::Receiver<PipelineCommand>,
    snapshots: watch::Sender<FrameSnapshot>,
    cancellation_token: CancellationToken,
) -> SessionSummary {
    info!("Session task started");
    let mut last_timestamp_ms = 0;

    loop {
        let command = tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Session task cancelled");
                break;
            }
            command = commands.recv() => command,
        };

        match command {
            Some(PipelineCommand::Frame {
                landmarks,
                timestamp_ms,
            }) => {
                if timestamp_ms < last_timestamp_ms {
                    warn!(
                        "Frame timestamp went backwards ({} -> {})",
                        last_timestamp_ms, timestamp_ms
                    );
                }
                last_timestamp_ms = timestamp_ms;

                match session.process_frame(&landmarks, timestamp_ms) {
                    Ok(snapshot) => {
                        snapshots.send_replace(snapshot);
                    }
                    Err(e) if e.is_frame_skip() => {}
                    Err(e) => error!("Frame processing failed: {}", e),
                }
            }
            Some(PipelineCommand::SelectExercise(kind)) => {
                session.select_exercise(kind);
                snapshots.send_replace(session.snapshot(last_timestamp_ms));
            }
            Some(PipelineCommand::Shutdown) | None => {
                debug!("Session task received shutdown");
                break;
            }
        }
    }

    let summary = session.finish();
    info!("Session task stopped");
    summary
}
