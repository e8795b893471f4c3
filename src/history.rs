use crate::angles::AngleSet;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Default number of frames kept for technical analysis
pub const DEFAULT_HISTORY_CAPACITY: usize = 9;

/// Sliding window of the most recent per-frame angle sets
///
/// Oldest entries are evicted first once the window is full. Used to smooth
/// single-frame noise before technical analysis.
#[derive(Debug, Clone)]
pub struct AngleHistory {
    entries: VecDeque<AngleSet>,
    capacity: usize,
}

impl AngleHistory {
    /// Create a window holding up to `capacity` sets
    ///
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!("Created angle history with capacity {}", capacity);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, angles: AngleSet) {
        self.entries.push_back(angles);

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            trace!("Angle history full, evicted oldest entry");
        }
    }

    /// Per-joint arithmetic mean across the window, or `None` when empty
    ///
    /// Each joint is averaged over the frames where it was determined; a
    /// joint undetermined in every frame stays undetermined.
    pub fn average(&self) -> Option<AngleSet> {
        if self.entries.is_empty() {
            return None;
        }

        Some(AngleSet::from_fn(|joint| {
            let (sum, n) = self
                .entries
                .iter()
                .filter_map(|set| set.get(joint))
                .fold((0.0f32, 0u32), |(sum, n), angle| (sum + angle, n + 1));
            (n > 0).then(|| sum / n as f32)
        }))
    }

    /// Entries in arrival order, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &AngleSet> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&AngleSet> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        debug!("Clearing angle history ({} entries)", self.entries.len());
        self.entries.clear();
    }
}

impl Default for AngleHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::Joint;

    #[test]
    fn test_zero_capacity_is_bumped() {
        assert_eq!(AngleHistory::new(0).capacity(), 1);
    }

    #[test]
    fn test_empty_history_has_no_average() {
        let history = AngleHistory::default();
        assert!(history.is_empty());
        assert!(history.average().is_none());
        assert_eq!(history.capacity(), 9);
    }

    #[test]
    fn test_average_of_partial_window() {
        let mut history = AngleHistory::default();
        history.push(AngleSet::uniform(90.0));
        history.push(AngleSet::uniform(120.0).with(Joint::LeftKnee, 60.0));

        let avg = history.average().unwrap();
        assert_eq!(avg.get(Joint::RightElbow), Some(105.0));
        assert_eq!(avg.get(Joint::LeftKnee), Some(75.0));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = AngleHistory::default();
        for i in 0..100 {
            history.push(AngleSet::uniform(i as f32));
            assert!(history.len() <= 9);
        }
        assert_eq!(history.latest().and_then(|s| s.get(Joint::LeftHip)), Some(99.0));
    }

    #[test]
    fn test_average_reflects_last_nine_after_twelve_pushes() {
        let mut history = AngleHistory::default();
        for i in 1..=12 {
            history.push(AngleSet::uniform(i as f32 * 10.0));
        }

        assert_eq!(history.len(), 9);
        // 40..=120 step 10 -> mean 80
        let avg = history.average().unwrap();
        for (_, angle) in avg.iter() {
            assert!((angle.unwrap() - 80.0).abs() < 1e-3);
        }

        let order: Vec<f32> = history
            .iter()
            .filter_map(|s| s.get(Joint::LeftElbow))
            .collect();
        assert_eq!(order.first(), Some(&40.0));
        assert_eq!(order.last(), Some(&120.0));
        assert_eq!(history.latest().and_then(|s| s.get(Joint::LeftElbow)), Some(120.0));
    }

    #[test]
    fn test_average_skips_undetermined_samples() {
        let mut history = AngleHistory::default();
        history.push(AngleSet::uniform(100.0));
        history.push(AngleSet::uniform(120.0).without(Joint::LeftElbow));
        history.push(AngleSet::uniform(140.0));

        let avg = history.average().unwrap();
        // (100 + 140) / 2, the collapsed frame does not pull it toward 0
        assert_eq!(avg.get(Joint::LeftElbow), Some(120.0));
        assert_eq!(avg.get(Joint::RightElbow), Some(120.0));

        let mut blind = AngleHistory::new(2);
        blind.push(AngleSet::uniform(90.0).without(Joint::RightKnee));
        assert_eq!(blind.average().unwrap().get(Joint::RightKnee), None);
    }

    #[test]
    fn test_clear() {
        let mut history = AngleHistory::new(3);
        for _ in 0..5 {
            history.push(AngleSet::uniform(100.0));
        }
        history.clear();
        assert!(history.is_empty());
        assert!(history.average().is_none());
        assert_eq!(history.capacity(), 3);
    }
}
