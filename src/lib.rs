pub mod angles;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod exercise;
pub mod geometry;
pub mod history;
pub mod keyboard_input;
pub mod landmarks;
pub mod pipeline;
pub mod presentation;
pub mod report;
pub mod reps;
pub mod session;

pub use angles::{AngleSet, Joint, JointPair};
pub use classifier::{FeedbackVerdict, Severity};
pub use config::FormCoachConfig;
pub use error::{EventBusError, FormCoachError, Result};
pub use events::{CoachEvent, EventBus, EventFilter, EventHandler, EventReceiver};
pub use exercise::{AngleReadout, ExerciseKind, ExerciseProfile, Phase};
pub use geometry::{angle_at, try_angle_at, Point2D};
pub use history::AngleHistory;
pub use keyboard_input::KeyboardInputHandler;
pub use landmarks::{KeypointIndex, LandmarkAdapter, REQUIRED_LANDMARKS};
pub use pipeline::{Pipeline, PipelineCommand};
pub use presentation::{PresentationState, SpeechCue, SpeechDebouncer, SpeechSource};
pub use report::{ReportCollector, SessionSummary};
pub use reps::{Direction, RepCounter};
pub use session::{FrameSnapshot, Session};
