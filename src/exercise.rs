//! Exercise catalogue and the static per-exercise profile table

use crate::angles::{AngleSet, JointPair};
use crate::classifier::Severity;
use crate::error::FormCoachError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    PushUp,
    Squat,
    BicepCurl,
    Plank,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::PushUp,
        ExerciseKind::Squat,
        ExerciseKind::BicepCurl,
        ExerciseKind::Plank,
    ];

    /// Human-readable name used by renderers and reports
    pub fn display_name(&self) -> &'static str {
        match self {
            ExerciseKind::PushUp => "Push-ups",
            ExerciseKind::Squat => "Squats",
            ExerciseKind::BicepCurl => "Bicep Curls",
            ExerciseKind::Plank => "Plank",
        }
    }

    /// Stable identifier, matching the serde representation
    pub fn id(&self) -> &'static str {
        match self {
            ExerciseKind::PushUp => "push_up",
            ExerciseKind::Squat => "squat",
            ExerciseKind::BicepCurl => "bicep_curl",
            ExerciseKind::Plank => "plank",
        }
    }

    pub fn profile(&self) -> &'static ExerciseProfile {
        match self {
            ExerciseKind::PushUp => &PUSH_UP,
            ExerciseKind::Squat => &SQUAT,
            ExerciseKind::BicepCurl => &BICEP_CURL,
            ExerciseKind::Plank => &PLANK,
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ExerciseKind {
    type Err = FormCoachError;

    /// Accepts `push_up`, `push-up`, `pushup`, `PUSH_UP` and the like
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "pushup" | "pushups" => Ok(ExerciseKind::PushUp),
            "squat" | "squats" => Ok(ExerciseKind::Squat),
            "bicepcurl" | "bicepcurls" | "curl" => Ok(ExerciseKind::BicepCurl),
            "plank" => Ok(ExerciseKind::Plank),
            _ => Err(FormCoachError::UnknownExercise(s.to_string())),
        }
    }
}

/// Predicate over an angle set
///
/// Pair conditions never match when either joint of the pair is undetermined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Mean of the pair is strictly greater than the threshold
    AverageAbove(JointPair, f32),
    /// Mean of the pair is strictly less than the threshold
    AverageBelow(JointPair, f32),
    /// Left/right difference is strictly greater than the threshold
    AsymmetryAbove(JointPair, f32),
}

impl Condition {
    pub fn matches(&self, angles: &AngleSet) -> bool {
        match *self {
            Condition::AverageAbove(pair, limit) => {
                angles.average(pair).is_some_and(|angle| angle > limit)
            }
            Condition::AverageBelow(pair, limit) => {
                angles.average(pair).is_some_and(|angle| angle < limit)
            }
            Condition::AsymmetryAbove(pair, limit) => {
                angles.asymmetry(pair).is_some_and(|diff| diff > limit)
            }
        }
    }
}

/// One entry of an ordered decision list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub condition: Condition,
    pub message: &'static str,
    pub severity: Severity,
}

const fn rule(condition: Condition, message: &'static str, severity: Severity) -> Rule {
    Rule {
        condition,
        message,
        severity,
    }
}

/// Hysteresis thresholds for repetition counting, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RepThresholds {
    pub down: f32,
    pub up: f32,
}

/// Static posture band that counts as "holding" for time-based exercises
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoldBand {
    pub elbow: (f32, f32),
    pub shoulder: (f32, f32),
}

impl HoldBand {
    /// Inclusive on both ends of each band; an undetermined pair never holds
    pub fn contains(&self, angles: &AngleSet) -> bool {
        let (Some(elbow), Some(shoulder)) = (
            angles.average(JointPair::ELBOWS),
            angles.average(JointPair::SHOULDERS),
        ) else {
            return false;
        };
        (self.elbow.0..=self.elbow.1).contains(&elbow)
            && (self.shoulder.0..=self.shoulder.1).contains(&shoulder)
    }
}

/// How progress is counted for an exercise
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Counting {
    Repetitions(RepThresholds),
    Hold(HoldBand),
}

/// Coarse movement phase shown next to the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Up,
    Middle,
    Down,
}

/// Left/right readout of the joint pair that drives counting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleReadout {
    pub pair: JointPair,
    pub left: f32,
    pub right: f32,
    pub average: f32,
}

/// Static configuration for one exercise
#[derive(Debug)]
pub struct ExerciseProfile {
    pub kind: ExerciseKind,
    /// Pair whose mean is the representative angle for counting and phase
    pub rep_metric: JointPair,
    pub counting: Counting,
    /// Per-frame rules, most severe first; no match means no feedback
    pub immediate_rules: &'static [Rule],
    /// Windowed-average corrections, most important first
    pub technical_rules: &'static [Rule],
    /// Confirmation given when no technical correction applies
    pub technical_ok: &'static str,
    /// Phase limits on the rep metric: above `.1` is up, below `.0` is down
    pub phase_limits: (f32, f32),
    pub show_readout: bool,
}

impl ExerciseProfile {
    /// Mean of the rep metric pair, `None` if either side is undetermined
    pub fn representative_angle(&self, angles: &AngleSet) -> Option<f32> {
        angles.average(self.rep_metric)
    }

    pub fn phase(&self, angles: &AngleSet) -> Option<Phase> {
        let angle = self.representative_angle(angles)?;
        let (down, up) = self.phase_limits;
        Some(if angle > up {
            Phase::Up
        } else if angle < down {
            Phase::Down
        } else {
            Phase::Middle
        })
    }

    pub fn readout(&self, angles: &AngleSet) -> Option<AngleReadout> {
        if !self.show_readout {
            return None;
        }
        Some(AngleReadout {
            pair: self.rep_metric,
            left: angles.get(self.rep_metric.left)?,
            right: angles.get(self.rep_metric.right)?,
            average: self.representative_angle(angles)?,
        })
    }
}

use Condition::{AsymmetryAbove, AverageAbove, AverageBelow};
use JointPair as P;
use Severity::{Critical, Warning};

static PUSH_UP: ExerciseProfile = ExerciseProfile {
    kind: ExerciseKind::PushUp,
    rep_metric: P::ELBOWS,
    counting: Counting::Repetitions(RepThresholds { down: 110.0, up: 150.0 }),
    immediate_rules: &[
        rule(AverageAbove(P::ELBOWS, 160.0), "Lower your elbows more", Critical),
        rule(AverageBelow(P::ELBOWS, 50.0), "Don't go so low", Critical),
        rule(AsymmetryAbove(P::ELBOWS, 25.0), "Fix the asymmetry", Warning),
        rule(AsymmetryAbove(P::SHOULDERS, 20.0), "Align your shoulders", Warning),
    ],
    technical_rules: &[
        rule(AverageAbove(P::ELBOWS, 130.0), "Lower your elbows more (target: 90°)", Warning),
        rule(AverageBelow(P::ELBOWS, 70.0), "Don't go so low (target: 90°)", Warning),
        rule(AsymmetryAbove(P::ELBOWS, 15.0), "Keep both arms symmetric", Warning),
        rule(AsymmetryAbove(P::SHOULDERS, 12.0), "Align your shoulders", Warning),
    ],
    technical_ok: "Keep this form",
    phase_limits: (100.0, 150.0),
    show_readout: true,
};

static SQUAT: ExerciseProfile = ExerciseProfile {
    kind: ExerciseKind::Squat,
    rep_metric: P::KNEES,
    counting: Counting::Repetitions(RepThresholds { down: 120.0, up: 150.0 }),
    immediate_rules: &[
        rule(AverageAbove(P::KNEES, 170.0), "Go deeper", Critical),
        rule(AverageBelow(P::KNEES, 70.0), "Don't go so low", Critical),
        rule(AsymmetryAbove(P::KNEES, 20.0), "Balance your legs", Warning),
        rule(AsymmetryAbove(P::HIPS, 15.0), "Fix your hip posture", Warning),
    ],
    technical_rules: &[
        rule(AverageAbove(P::KNEES, 140.0), "Go deeper (target: 90°)", Warning),
        rule(AverageBelow(P::KNEES, 80.0), "Don't go so low (target: 90°)", Warning),
        rule(AsymmetryAbove(P::KNEES, 12.0), "Balance both legs", Warning),
        rule(AsymmetryAbove(P::HIPS, 10.0), "Keep your hips level", Warning),
    ],
    technical_ok: "Ideal depth",
    phase_limits: (120.0, 150.0),
    show_readout: true,
};

static BICEP_CURL: ExerciseProfile = ExerciseProfile {
    kind: ExerciseKind::BicepCurl,
    rep_metric: P::ELBOWS,
    counting: Counting::Repetitions(RepThresholds { down: 60.0, up: 140.0 }),
    immediate_rules: &[
        rule(AverageAbove(P::ELBOWS, 160.0), "Bend your arm more", Critical),
        rule(AverageBelow(P::ELBOWS, 30.0), "Control the descent", Critical),
        rule(AsymmetryAbove(P::ELBOWS, 20.0), "Sync both arms", Warning),
        rule(AsymmetryAbove(P::SHOULDERS, 15.0), "Stabilize your shoulders", Warning),
    ],
    technical_rules: &[
        rule(AverageAbove(P::ELBOWS, 120.0), "Bend your arms more", Warning),
        rule(AverageBelow(P::ELBOWS, 40.0), "Control your range of motion", Warning),
        rule(AsymmetryAbove(P::ELBOWS, 15.0), "Sync both arms", Warning),
        rule(AsymmetryAbove(P::SHOULDERS, 12.0), "Stabilize your shoulders", Warning),
    ],
    technical_ok: "Controlled movement",
    phase_limits: (100.0, 150.0),
    show_readout: true,
};

static PLANK: ExerciseProfile = ExerciseProfile {
    kind: ExerciseKind::Plank,
    rep_metric: P::ELBOWS,
    counting: Counting::Hold(HoldBand {
        elbow: (80.0, 110.0),
        shoulder: (160.0, 180.0),
    }),
    immediate_rules: &[
        rule(AverageBelow(P::ELBOWS, 70.0), "Raise your hips", Critical),
        rule(AverageAbove(P::ELBOWS, 120.0), "Lower your hips", Critical),
        rule(AverageBelow(P::SHOULDERS, 150.0), "Straighten your back", Critical),
        rule(AsymmetryAbove(P::ELBOWS, 15.0), "Balance your elbows", Warning),
    ],
    technical_rules: &[
        rule(AverageBelow(P::ELBOWS, 80.0), "Raise your hips", Warning),
        rule(AverageAbove(P::ELBOWS, 110.0), "Lower your hips", Warning),
        rule(AverageBelow(P::SHOULDERS, 160.0), "Straighten your back", Warning),
        rule(AsymmetryAbove(P::ELBOWS, 10.0), "Balance your elbows", Warning),
        rule(AsymmetryAbove(P::SHOULDERS, 8.0), "Align your shoulders", Warning),
    ],
    technical_ok: "Stable plank",
    phase_limits: (100.0, 150.0),
    show_readout: false,
};
