//! Presentation state for renderers and the speech sink
//!
//! Holds the live immediate verdict, the latest technical verdict with its
//! display expiry, and the speech de-duplication cache.

use crate::classifier::FeedbackVerdict;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default time a technical verdict stays on screen
pub const DEFAULT_TECHNICAL_DISPLAY_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechSource {
    Immediate,
    Technical,
}

/// A request for the speech sink to say `text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechCue {
    pub text: String,
    pub source: SpeechSource,
}

/// Lets a message through once until a different message supersedes it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechDebouncer {
    last_spoken: String,
}

impl SpeechDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and remembers `text` if it should be spoken now
    pub fn offer(&mut self, text: &str) -> bool {
        if text.is_empty() || text == self.last_spoken {
            return false;
        }
        self.last_spoken = text.to_string();
        true
    }

    pub fn last_spoken(&self) -> &str {
        &self.last_spoken
    }

    pub fn reset(&mut self) {
        self.last_spoken.clear();
    }
}

#[derive(Debug, Clone)]
pub struct PresentationState {
    immediate: FeedbackVerdict,
    technical: FeedbackVerdict,
    technical_expiry_ms: u64,
    technical_display_ms: u64,
    debouncer: SpeechDebouncer,
}

impl PresentationState {
    pub fn new(technical_display_ms: u64) -> Self {
        Self {
            immediate: FeedbackVerdict::none(),
            technical: FeedbackVerdict::none(),
            technical_expiry_ms: 0,
            technical_display_ms,
            debouncer: SpeechDebouncer::new(),
        }
    }

    /// Store this frame's immediate verdict
    ///
    /// A message is spoken when it is new relative to the previous immediate
    /// verdict and to whatever was spoken last.
    pub fn update_immediate(&mut self, verdict: FeedbackVerdict) -> Option<SpeechCue> {
        let changed = verdict.message != self.immediate.message;
        let cue = if changed && self.debouncer.offer(&verdict.message) {
            debug!("Speaking immediate feedback: {}", verdict.message);
            Some(SpeechCue {
                text: verdict.message.clone(),
                source: SpeechSource::Immediate,
            })
        } else {
            None
        };

        self.immediate = verdict;
        cue
    }

    /// Store a technical verdict and keep it visible until `now_ms + display`
    pub fn update_technical(&mut self, verdict: FeedbackVerdict, now_ms: u64) -> Option<SpeechCue> {
        self.technical_expiry_ms = now_ms.saturating_add(self.technical_display_ms);

        let cue = if self.debouncer.offer(&verdict.message) {
            debug!("Speaking technical feedback: {}", verdict.message);
            Some(SpeechCue {
                text: verdict.message.clone(),
                source: SpeechSource::Technical,
            })
        } else {
            None
        };

        self.technical = verdict;
        cue
    }

    pub fn is_technical_active(&self, now_ms: u64) -> bool {
        now_ms < self.technical_expiry_ms
    }

    /// The technical verdict if it is still within its display window
    pub fn visible_technical(&self, now_ms: u64) -> Option<&FeedbackVerdict> {
        if self.is_technical_active(now_ms) && !self.technical.is_empty() {
            Some(&self.technical)
        } else {
            None
        }
    }

    pub fn immediate(&self) -> &FeedbackVerdict {
        &self.immediate
    }

    /// Latest technical verdict regardless of expiry
    pub fn technical(&self) -> &FeedbackVerdict {
        &self.technical
    }

    pub fn technical_expiry_ms(&self) -> u64 {
        self.technical_expiry_ms
    }

    pub fn last_spoken(&self) -> &str {
        self.debouncer.last_spoken()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.technical_display_ms);
    }
}

impl Default for PresentationState {
    fn default() -> Self {
        Self::new(DEFAULT_TECHNICAL_DISPLAY_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Severity;

    fn warn(msg: &str) -> FeedbackVerdict {
        FeedbackVerdict::new(msg, Severity::Warning)
    }

    #[test]
    fn test_debouncer() {
        let mut debouncer = SpeechDebouncer::new();
        assert!(!debouncer.offer(""));
        assert!(debouncer.offer("Go deeper"));
        assert!(!debouncer.offer("Go deeper"));
        assert!(debouncer.offer("Balance your legs"));
        assert!(debouncer.offer("Go deeper"));
        assert_eq!(debouncer.last_spoken(), "Go deeper");
    }

    #[test]
    fn test_identical_immediate_verdicts_speak_once() {
        let mut state = PresentationState::default();
        assert!(state.update_immediate(warn("Fix the asymmetry")).is_some());
        assert!(state.update_immediate(warn("Fix the asymmetry")).is_none());
        assert_eq!(state.immediate().message, "Fix the asymmetry");
    }

    #[test]
    fn test_reversion_speaks_again() {
        let mut state = PresentationState::default();
        assert!(state.update_immediate(warn("A")).is_some());
        assert!(state.update_immediate(warn("B")).is_some());
        let cue = state.update_immediate(warn("A")).unwrap();
        assert_eq!(cue.text, "A");
        assert_eq!(cue.source, SpeechSource::Immediate);
    }

    #[test]
    fn test_empty_verdict_is_silent_but_stored() {
        let mut state = PresentationState::default();
        state.update_immediate(warn("A"));
        assert!(state.update_immediate(FeedbackVerdict::none()).is_none());
        assert!(state.immediate().is_empty());
        assert_eq!(state.last_spoken(), "A");

        // Silence between two identical messages does not re-trigger speech
        assert!(state.update_immediate(warn("A")).is_none());
    }

    #[test]
    fn test_technical_expiry() {
        let mut state = PresentationState::default();
        assert!(!state.is_technical_active(0));

        let cue = state.update_technical(warn("CORRECTION: Go deeper (target: 90°)"), 10_000);
        assert_eq!(cue.map(|c| c.source), Some(SpeechSource::Technical));

        assert!(state.is_technical_active(10_000));
        assert!(state.is_technical_active(12_999));
        assert!(!state.is_technical_active(13_000));
        assert!(state.visible_technical(11_000).is_some());
        assert!(state.visible_technical(13_500).is_none());
        // Still retrievable after expiry
        assert!(!state.technical().is_empty());
    }

    #[test]
    fn test_technical_repeat_is_not_spoken_but_refreshes_expiry() {
        let mut state = PresentationState::new(1000);
        let verdict = FeedbackVerdict::new("CORRECT TECHNIQUE: Ideal depth", Severity::Correct);

        assert!(state.update_technical(verdict.clone(), 0).is_some());
        assert!(state.update_technical(verdict, 5000).is_none());
        assert!(state.is_technical_active(5500));
    }

    #[test]
    fn test_shared_last_spoken_across_sources() {
        let mut state = PresentationState::default();
        state.update_technical(warn("CORRECTION: Align your shoulders"), 0);
        assert_eq!(state.last_spoken(), "CORRECTION: Align your shoulders");

        assert!(state.update_immediate(warn("Align your shoulders")).is_some());
        assert_eq!(state.last_spoken(), "Align your shoulders");
    }

    #[test]
    fn test_reset() {
        let mut state = PresentationState::new(500);
        state.update_immediate(warn("A"));
        state.update_technical(warn("B"), 100);
        state.reset();

        assert!(state.immediate().is_empty());
        assert!(state.technical().is_empty());
        assert_eq!(state.last_spoken(), "");
        assert!(!state.is_technical_active(100));
        assert_eq!(state.technical_expiry_ms(), 0);
    }
}
