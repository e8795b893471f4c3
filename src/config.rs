use crate::exercise::ExerciseKind;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FormCoachConfig {
    pub feedback: FeedbackConfig,
    pub session: SessionConfig,
    pub landmarks: LandmarkConfig,
    pub events: EventConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FeedbackConfig {
    /// Minimum milliseconds between immediate evaluations (0 = every frame)
    #[serde(default = "default_throttle_interval_ms")]
    pub throttle_interval_ms: u64,

    /// How long a technical verdict stays visible
    #[serde(default = "default_technical_display_ms")]
    pub technical_display_ms: u64,

    /// Run technical analysis every N completed repetitions
    #[serde(default = "default_technical_every_reps")]
    pub technical_every_reps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Number of recent frames averaged for technical analysis
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Exercise selected when the engine starts
    #[serde(default = "default_initial_exercise")]
    pub initial_exercise: ExerciseKind,

    /// Run plank technical analysis every N qualifying hold frames
    #[serde(default = "default_plank_technical_every_frames")]
    pub plank_technical_every_frames: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LandmarkConfig {
    /// Horizontal scale applied to keypoints (e.g. image width)
    #[serde(default = "default_scale")]
    pub scale_x: f32,

    /// Vertical scale applied to keypoints (e.g. image height)
    #[serde(default = "default_scale")]
    pub scale_y: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventConfig {
    /// Event bus capacity
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Log every published event at debug level
    #[serde(default)]
    pub debug_logging: bool,
}

impl FormCoachConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("feedback.throttle_interval_ms", default_throttle_interval_ms())?
            .set_default("feedback.technical_display_ms", default_technical_display_ms())?
            .set_default("feedback.technical_every_reps", default_technical_every_reps())?
            .set_default("session.history_capacity", default_history_capacity() as i64)?
            .set_default("session.initial_exercise", default_initial_exercise().id())?
            .set_default(
                "session.plank_technical_every_frames",
                default_plank_technical_every_frames(),
            )?
            .set_default("landmarks.scale_x", default_scale() as f64)?
            .set_default("landmarks.scale_y", default_scale() as f64)?
            .set_default("events.bus_capacity", default_bus_capacity() as i64)?
            .set_default("events.debug_logging", false)?
            .add_source(File::with_name(&path_str).required(false))
            // FORMCOACH_FEEDBACK__THROTTLE_INTERVAL_MS=100
            .add_source(
                Environment::with_prefix("FORMCOACH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: FormCoachConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feedback.technical_every_reps == 0 {
            return Err(ConfigError::Message(
                "technical_every_reps must be greater than 0".to_string(),
            ));
        }

        if self.session.history_capacity == 0 {
            return Err(ConfigError::Message(
                "History capacity must be greater than 0".to_string(),
            ));
        }

        if self.session.plank_technical_every_frames == 0 {
            return Err(ConfigError::Message(
                "plank_technical_every_frames must be greater than 0".to_string(),
            ));
        }

        if !(self.landmarks.scale_x > 0.0 && self.landmarks.scale_y > 0.0) {
            return Err(ConfigError::Message(
                "Landmark scale must be positive".to_string(),
            ));
        }

        if self.events.bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render as TOML, e.g. for `--print-config`
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for FormCoachConfig {
    fn default() -> Self {
        Self {
            feedback: FeedbackConfig {
                throttle_interval_ms: default_throttle_interval_ms(),
                technical_display_ms: default_technical_display_ms(),
                technical_every_reps: default_technical_every_reps(),
            },
            session: SessionConfig {
                history_capacity: default_history_capacity(),
                initial_exercise: default_initial_exercise(),
                plank_technical_every_frames: default_plank_technical_every_frames(),
            },
            landmarks: LandmarkConfig {
                scale_x: default_scale(),
                scale_y: default_scale(),
            },
            events: EventConfig {
                bus_capacity: default_bus_capacity(),
                debug_logging: false,
            },
        }
    }
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            scale_x: default_scale(),
            scale_y: default_scale(),
        }
    }
}

// Default value functions
fn default_throttle_interval_ms() -> u64 {
    0
}
fn default_technical_display_ms() -> u64 {
    crate::presentation::DEFAULT_TECHNICAL_DISPLAY_MS
}
fn default_technical_every_reps() -> u32 {
    3
}

fn default_history_capacity() -> usize {
    crate::history::DEFAULT_HISTORY_CAPACITY
}
fn default_initial_exercise() -> ExerciseKind {
    ExerciseKind::PushUp
}
fn default_plank_technical_every_frames() -> u32 {
    90
}

fn default_scale() -> f32 {
    1.0
}

fn default_bus_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FormCoachConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feedback.technical_display_ms, 3000);
        assert_eq!(config.feedback.technical_every_reps, 3);
        assert_eq!(config.session.history_capacity, 9);
        assert_eq!(config.session.initial_exercise, ExerciseKind::PushUp);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FormCoachConfig::default();
        config.session.history_capacity = 0;
        assert!(config.validate().is_err());

        config.session.history_capacity = 9;
        config.landmarks.scale_x = 0.0;
        assert!(config.validate().is_err());

        config.landmarks.scale_x = 640.0;
        config.feedback.technical_every_reps = 0;
        assert!(config.validate().is_err());

        config.feedback.technical_every_reps = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FormCoachConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, FormCoachConfig::default());
    }

    #[test]
    fn test_load_from_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[feedback]
throttle_interval_ms = 150

[session]
initial_exercise = "squat"
history_capacity = 12

[landmarks]
scale_x = 640.0
scale_y = 480.0
"#
        )
        .unwrap();

        let config = FormCoachConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.feedback.throttle_interval_ms, 150);
        assert_eq!(config.feedback.technical_display_ms, 3000);
        assert_eq!(config.session.initial_exercise, ExerciseKind::Squat);
        assert_eq!(config.session.history_capacity, 12);
        assert_eq!(config.landmarks.scale_x, 640.0);
        assert_eq!(config.landmarks.scale_y, 480.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let rendered = FormCoachConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[feedback]"));
        assert!(rendered.contains("initial_exercise = \"push_up\""));

        let parsed: FormCoachConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, FormCoachConfig::default());
    }
}
