//! Rule-based feedback classification
//!
//! Both entry points are pure: they read an angle set and the static profile
//! table and return a verdict. Counters and history are never touched here.

use crate::angles::AngleSet;
use crate::exercise::{ExerciseKind, Rule};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const CORRECTION_PREFIX: &str = "CORRECTION: ";
pub const CORRECT_TECHNIQUE_PREFIX: &str = "CORRECT TECHNIQUE: ";

/// How a verdict should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Neutral, nothing to report
    Info,
    /// Asymmetry or a technical correction
    Warning,
    /// Out-of-range position that needs immediate correction
    Critical,
    /// Positive confirmation of good technique
    Correct,
}

impl Severity {
    /// Display color as an RGB triple
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Severity::Info => (255, 255, 255),
            Severity::Warning => (255, 165, 0),
            Severity::Critical => (255, 0, 0),
            Severity::Correct => (0, 255, 0),
        }
    }
}

/// A feedback message and its severity; an empty message means "no feedback"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackVerdict {
    pub message: String,
    pub severity: Severity,
}

impl FeedbackVerdict {
    pub fn new<S: Into<String>>(message: S, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    /// The neutral verdict
    pub fn none() -> Self {
        Self::new(String::new(), Severity::Info)
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

impl Default for FeedbackVerdict {
    fn default() -> Self {
        Self::none()
    }
}

fn first_match<'a>(rules: &'a [Rule], angles: &AngleSet) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.condition.matches(angles))
}

/// Per-frame feedback from raw angles
///
/// Immediate warnings use a yellow-ish severity for asymmetry and critical
/// for out-of-range positions. Returns [`FeedbackVerdict::none`] when the
/// frame looks fine.
pub fn immediate(exercise: ExerciseKind, angles: &AngleSet) -> FeedbackVerdict {
    match first_match(exercise.profile().immediate_rules, angles) {
        Some(rule) => {
            trace!("Immediate rule matched for {}: {:?}", exercise, rule.condition);
            FeedbackVerdict::new(rule.message, rule.severity)
        }
        None => FeedbackVerdict::none(),
    }
}

/// Feedback from a windowed average of recent frames
///
/// Always yields a message: either a correction or a confirmation of correct
/// technique.
pub fn technical(exercise: ExerciseKind, average: &AngleSet) -> FeedbackVerdict {
    let profile = exercise.profile();
    let (message, severity) = match first_match(profile.technical_rules, average) {
        Some(rule) => (rule.message, rule.severity),
        None => (profile.technical_ok, Severity::Correct),
    };

    let prefix = if severity == Severity::Correct {
        CORRECT_TECHNIQUE_PREFIX
    } else {
        CORRECTION_PREFIX
    };

    FeedbackVerdict::new(format!("{}{}", prefix, message), severity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::Joint;

    fn with_pair(base: AngleSet, left: Joint, right: Joint, l: f32, r: f32) -> AngleSet {
        base.with(left, l).with(right, r)
    }

    fn elbows(l: f32, r: f32) -> AngleSet {
        with_pair(AngleSet::uniform(170.0), Joint::LeftElbow, Joint::RightElbow, l, r)
    }

    fn knees(l: f32, r: f32) -> AngleSet {
        with_pair(AngleSet::uniform(170.0), Joint::LeftKnee, Joint::RightKnee, l, r)
    }

    #[test]
    fn test_push_up_immediate() {
        let ex = ExerciseKind::PushUp;

        let v = immediate(ex, &elbows(165.0, 165.0));
        assert_eq!(v.message, "Lower your elbows more");
        assert_eq!(v.severity, Severity::Critical);

        let v = immediate(ex, &elbows(45.0, 45.0));
        assert_eq!(v.message, "Don't go so low");

        let v = immediate(ex, &elbows(80.0, 110.0));
        assert_eq!(v.message, "Fix the asymmetry");
        assert_eq!(v.severity, Severity::Warning);

        let v = immediate(
            ex,
            &elbows(90.0, 90.0)
                .with(Joint::LeftShoulder, 40.0)
                .with(Joint::RightShoulder, 70.0),
        );
        assert_eq!(v.message, "Align your shoulders");

        assert_eq!(immediate(ex, &elbows(90.0, 95.0)), FeedbackVerdict::none());
    }

    #[test]
    fn test_first_match_wins() {
        // Both too high and asymmetric: the critical rule is listed first
        let v = immediate(ExerciseKind::PushUp, &elbows(150.0, 180.0));
        assert_eq!(v.severity, Severity::Critical);
    }

    #[test]
    fn test_squat_immediate() {
        let ex = ExerciseKind::Squat;
        assert_eq!(immediate(ex, &knees(175.0, 175.0)).message, "Go deeper");
        assert_eq!(immediate(ex, &knees(60.0, 60.0)).message, "Don't go so low");
        assert_eq!(immediate(ex, &knees(90.0, 120.0)).message, "Balance your legs");

        let hips = knees(100.0, 100.0)
            .with(Joint::LeftHip, 90.0)
            .with(Joint::RightHip, 110.0);
        assert_eq!(immediate(ex, &hips).message, "Fix your hip posture");
        assert!(immediate(ex, &knees(100.0, 100.0)).is_empty());
    }

    #[test]
    fn test_bicep_curl_immediate() {
        let ex = ExerciseKind::BicepCurl;
        assert_eq!(immediate(ex, &elbows(170.0, 170.0)).message, "Bend your arm more");
        assert_eq!(immediate(ex, &elbows(20.0, 20.0)).message, "Control the descent");
        assert_eq!(immediate(ex, &elbows(60.0, 90.0)).message, "Sync both arms");
        assert!(immediate(ex, &elbows(60.0, 70.0)).is_empty());
    }

    #[test]
    fn test_plank_immediate() {
        let ex = ExerciseKind::Plank;
        assert_eq!(immediate(ex, &elbows(60.0, 60.0)).message, "Raise your hips");
        assert_eq!(immediate(ex, &elbows(130.0, 130.0)).message, "Lower your hips");

        let bent_back = elbows(95.0, 95.0)
            .with(Joint::LeftShoulder, 140.0)
            .with(Joint::RightShoulder, 140.0);
        assert_eq!(immediate(ex, &bent_back).message, "Straighten your back");

        assert_eq!(immediate(ex, &elbows(85.0, 105.0)).message, "Balance your elbows");
        assert!(immediate(ex, &elbows(95.0, 95.0)).is_empty());
    }

    #[test]
    fn test_technical_push_up() {
        let ex = ExerciseKind::PushUp;

        let v = technical(ex, &elbows(140.0, 140.0));
        assert_eq!(v.message, "CORRECTION: Lower your elbows more (target: 90°)");
        assert_eq!(v.severity, Severity::Warning);

        let v = technical(ex, &elbows(60.0, 60.0));
        assert_eq!(v.message, "CORRECTION: Don't go so low (target: 90°)");

        let v = technical(ex, &elbows(80.0, 100.0));
        assert_eq!(v.message, "CORRECTION: Keep both arms symmetric");

        let v = technical(ex, &elbows(90.0, 95.0));
        assert_eq!(v.message, "CORRECT TECHNIQUE: Keep this form");
        assert_eq!(v.severity, Severity::Correct);
    }

    #[test]
    fn test_technical_uses_wider_thresholds_than_immediate() {
        // 140 is fine frame-to-frame but too high on average
        let angles = elbows(140.0, 140.0);
        assert!(immediate(ExerciseKind::PushUp, &angles).is_empty());
        assert_eq!(technical(ExerciseKind::PushUp, &angles).severity, Severity::Warning);
    }

    #[test]
    fn test_technical_squat_and_plank() {
        assert_eq!(
            technical(ExerciseKind::Squat, &knees(90.0, 92.0)).message,
            "CORRECT TECHNIQUE: Ideal depth"
        );
        assert_eq!(
            technical(ExerciseKind::Squat, &knees(150.0, 150.0)).message,
            "CORRECTION: Go deeper (target: 90°)"
        );

        let plank = elbows(95.0, 95.0);
        assert_eq!(
            technical(ExerciseKind::Plank, &plank).message,
            "CORRECT TECHNIQUE: Stable plank"
        );
        let tilted = plank
            .with(Joint::LeftShoulder, 165.0)
            .with(Joint::RightShoulder, 175.0);
        assert_eq!(
            technical(ExerciseKind::Plank, &tilted).message,
            "CORRECTION: Align your shoulders"
        );
    }

    #[test]
    fn test_technical_bicep_curl() {
        assert_eq!(
            technical(ExerciseKind::BicepCurl, &elbows(130.0, 130.0)).message,
            "CORRECTION: Bend your arms more"
        );
        assert_eq!(
            technical(ExerciseKind::BicepCurl, &elbows(80.0, 80.0)).message,
            "CORRECT TECHNIQUE: Controlled movement"
        );
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(Severity::Critical.color(), (255, 0, 0));
        assert_eq!(Severity::Correct.color(), (0, 255, 0));
    }
}
