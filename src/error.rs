use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormCoachError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    /// Fewer keypoints than the landmark schema needs; the frame must be skipped
    #[error("Insufficient landmarks: got {found}, need at least {required}")]
    InsufficientLandmarks { found: usize, required: usize },

    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

impl FormCoachError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether the caller should drop the current frame and keep going
    pub fn is_frame_skip(&self) -> bool {
        matches!(self, Self::InsufficientLandmarks { .. })
    }
}

pub type Result<T> = std::result::Result<T, FormCoachError>;
