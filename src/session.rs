//! Session controller
//!
//! Owns everything that changes while a user exercises: the selected
//! exercise, the rep counter, the angle window and the presentation state.
//! A session is single-writer; hosts that want concurrency run it behind
//! [`crate::pipeline::Pipeline`] and hand out [`FrameSnapshot`]s.

use crate::angles::AngleSet;
use crate::classifier::{self, FeedbackVerdict};
use crate::config::FormCoachConfig;
use crate::error::Result;
use crate::events::{CoachEvent, EventBus};
use crate::exercise::{AngleReadout, Counting, ExerciseKind, Phase};
use crate::geometry::Point2D;
use crate::history::AngleHistory;
use crate::landmarks::LandmarkAdapter;
use crate::presentation::{PresentationState, SpeechCue};
use crate::report::SessionSummary;
use crate::reps::RepCounter;
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Immutable view of the session after one frame, for renderers and speech
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub session_id: Uuid,
    pub exercise: ExerciseKind,
    pub exercise_name: &'static str,
    pub count: u32,
    /// Raw angles of the frame, `None` before the first frame
    pub angles: Option<AngleSet>,
    pub phase: Option<Phase>,
    pub readout: Option<AngleReadout>,
    pub immediate: FeedbackVerdict,
    /// Technical verdict while it is within its display window
    pub technical: Option<FeedbackVerdict>,
    /// Speech requested by this frame, in order
    pub speech: Vec<SpeechCue>,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct Cadence {
    throttle_interval_ms: u64,
    technical_every_reps: u32,
    plank_technical_every_frames: u32,
}

pub struct Session {
    id: Uuid,
    exercise: ExerciseKind,
    adapter: LandmarkAdapter,
    reps: RepCounter,
    history: AngleHistory,
    presentation: PresentationState,
    cadence: Cadence,
    last_feedback_count: u32,
    last_immediate_eval_ms: Option<u64>,
    last_angles: Option<AngleSet>,
    frames_processed: u64,
    frames_skipped: u64,
    pending_speech: Vec<SpeechCue>,
    event_bus: Option<EventBus>,
}

impl Session {
    pub fn new(config: &FormCoachConfig) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            exercise: config.session.initial_exercise,
            adapter: LandmarkAdapter::new(&config.landmarks),
            reps: RepCounter::new(),
            history: AngleHistory::new(config.session.history_capacity),
            presentation: PresentationState::new(config.feedback.technical_display_ms),
            cadence: Cadence {
                throttle_interval_ms: config.feedback.throttle_interval_ms,
                technical_every_reps: config.feedback.technical_every_reps.max(1),
                plank_technical_every_frames: config.session.plank_technical_every_frames.max(1),
            },
            last_feedback_count: 0,
            last_immediate_eval_ms: None,
            last_angles: None,
            frames_processed: 0,
            frames_skipped: 0,
            pending_speech: Vec::new(),
            event_bus: None,
        };

        info!(
            "Session {} created for {}",
            session.id,
            session.exercise.display_name()
        );
        session
    }

    /// Publish session events on `bus`
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    fn emit(&self, event: CoachEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }

    /// Switch exercise, returning the summary of the session that just ended
    ///
    /// The summary is also published so a report exporter can persist it.
    /// Everything else starts over, even when `kind` is the current exercise.
    pub fn select_exercise(&mut self, kind: ExerciseKind) -> SessionSummary {
        let summary = self.summary();
        self.emit(CoachEvent::SessionSummary(summary.clone()));

        let from = self.exercise;
        self.exercise = kind;
        self.reset();

        info!("Exercise selected: {} (session {})", kind.display_name(), self.id);
        self.emit(CoachEvent::ExerciseChanged { from, to: kind });
        summary
    }

    fn reset(&mut self) {
        self.id = Uuid::new_v4();
        self.reps.reset();
        self.history.clear();
        self.presentation.reset();
        self.last_feedback_count = 0;
        self.last_immediate_eval_ms = None;
        self.last_angles = None;
        self.frames_processed = 0;
        self.frames_skipped = 0;
        self.pending_speech.clear();
    }

    /// Run one pose frame through the engine
    ///
    /// Frames without the full keypoint schema fail with
    /// [`crate::FormCoachError::InsufficientLandmarks`] and leave the session
    /// untouched apart from the skip counter.
    pub fn process_frame(&mut self, landmarks: &[Point2D], now_ms: u64) -> Result<FrameSnapshot> {
        let angles = match self.adapter.compute_angles(landmarks) {
            Ok(angles) => angles,
            Err(e) => {
                self.frames_skipped += 1;
                warn!("Skipping frame at {}ms: {}", now_ms, e);
                self.emit(CoachEvent::FrameSkipped {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        Ok(self.process_angles(angles, now_ms))
    }

    /// Run a frame whose joint angles are already known
    pub fn process_angles(&mut self, angles: AngleSet, now_ms: u64) -> FrameSnapshot {
        let profile = self.exercise.profile();

        self.history.push(angles);
        self.last_angles = Some(angles);
        self.frames_processed += 1;

        match profile.counting {
            Counting::Repetitions(thresholds) => {
                match profile.representative_angle(&angles) {
                    Some(angle) => {
                        if let Some(count) = self.reps.observe(angle, thresholds) {
                            self.emit(CoachEvent::RepetitionCompleted {
                                exercise: self.exercise,
                                count,
                            });
                            self.check_technical_feedback(now_ms);
                        }
                    }
                    None => trace!("Rep metric undetermined at {}ms, phase kept", now_ms),
                }
            }
            Counting::Hold(band) => {
                if let Some(count) = self.reps.observe_hold(&angles, &band) {
                    self.emit(CoachEvent::HoldProgress { count });
                    self.check_technical_feedback(now_ms);
                }
            }
        }

        if self.immediate_due(now_ms) {
            self.last_immediate_eval_ms = Some(now_ms);
            let verdict = classifier::immediate(self.exercise, &angles);
            if let Some(cue) = self.presentation.update_immediate(verdict) {
                self.emit(CoachEvent::SpeechRequested {
                    text: cue.text.clone(),
                    source: cue.source,
                });
                self.pending_speech.push(cue);
            }
        }

        trace!(
            "Frame at {}ms: {} count={}",
            now_ms,
            self.exercise.id(),
            self.reps.count()
        );

        let speech = std::mem::take(&mut self.pending_speech);
        self.build_snapshot(now_ms, speech)
    }

    fn immediate_due(&self, now_ms: u64) -> bool {
        match (self.cadence.throttle_interval_ms, self.last_immediate_eval_ms) {
            (0, _) | (_, None) => true,
            (interval, Some(last)) => now_ms.saturating_sub(last) >= interval,
        }
    }

    /// Run technical analysis on the angle window if the current count is due
    ///
    /// Analysis happens at most once per count, and only when the count is a
    /// positive multiple of the cadence: `technical_every_reps` for rep
    /// exercises, `plank_technical_every_frames` for holds. Returns the
    /// verdict when analysis ran.
    pub fn check_technical_feedback(&mut self, now_ms: u64) -> Option<FeedbackVerdict> {
        let count = self.reps.count();
        let every = match self.exercise.profile().counting {
            Counting::Repetitions(_) => self.cadence.technical_every_reps,
            Counting::Hold(_) => self.cadence.plank_technical_every_frames,
        };
        if count == 0
            || count % every != 0
            || count == self.last_feedback_count
        {
            return None;
        }

        let average = self.history.average()?;
        self.last_feedback_count = count;

        let verdict = classifier::technical(self.exercise, &average);
        debug!(
            "Technical analysis at count {} over {} frames: {}",
            count,
            self.history.len(),
            verdict.message
        );

        self.emit(CoachEvent::TechnicalFeedback {
            verdict: verdict.clone(),
            count,
        });

        if let Some(cue) = self.presentation.update_technical(verdict.clone(), now_ms) {
            self.emit(CoachEvent::SpeechRequested {
                text: cue.text.clone(),
                source: cue.source,
            });
            self.pending_speech.push(cue);
        }

        Some(verdict)
    }

    /// Snapshot of the current state without processing a frame
    pub fn snapshot(&self, now_ms: u64) -> FrameSnapshot {
        self.build_snapshot(now_ms, Vec::new())
    }

    fn build_snapshot(&self, now_ms: u64, speech: Vec<SpeechCue>) -> FrameSnapshot {
        let profile = self.exercise.profile();
        FrameSnapshot {
            session_id: self.id,
            exercise: self.exercise,
            exercise_name: self.exercise.display_name(),
            count: self.reps.count(),
            angles: self.last_angles,
            phase: self.last_angles.as_ref().and_then(|a| profile.phase(a)),
            readout: self.last_angles.as_ref().and_then(|a| profile.readout(a)),
            immediate: self.presentation.immediate().clone(),
            technical: self.presentation.visible_technical(now_ms).cloned(),
            speech,
            timestamp_ms: now_ms,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            exercise: self.exercise,
            exercise_name: self.exercise.display_name().to_string(),
            count: self.reps.count(),
            last_immediate_message: self.presentation.immediate().message.clone(),
            last_technical_message: self.presentation.technical().message.clone(),
            average_angles: self.history.average(),
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            generated_at: Local::now(),
        }
    }

    /// Summary for the end of the app, published like an exercise switch
    pub fn finish(&self) -> SessionSummary {
        let summary = self.summary();
        info!(
            "Session {} finished: {} x{}",
            self.id, summary.exercise_name, summary.count
        );
        self.emit(CoachEvent::SessionSummary(summary.clone()));
        summary
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.exercise
    }

    pub fn count(&self) -> u32 {
        self.reps.count()
    }

    pub fn history(&self) -> &AngleHistory {
        &self.history
    }

    pub fn presentation(&self) -> &PresentationState {
        &self.presentation
    }

    pub fn last_feedback_count(&self) -> u32 {
        self.last_feedback_count
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }
}
