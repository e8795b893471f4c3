//! Repetition counting with hysteresis
//!
//! A repetition is the angle dropping below the down threshold and then
//! rising above the up threshold, in that order. Oscillating around a single
//! threshold never counts.

use crate::angles::AngleSet;
use crate::exercise::{HoldBand, RepThresholds};
use serde::Serialize;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Rep state for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepCounter {
    direction: Direction,
    count: u32,
}

impl RepCounter {
    pub fn new() -> Self {
        Self {
            direction: Direction::Up,
            count: 0,
        }
    }

    /// Feed the representative angle for one frame
    ///
    /// Returns the new count when this frame completes a repetition.
    pub fn observe(&mut self, angle: f32, thresholds: RepThresholds) -> Option<u32> {
        match self.direction {
            Direction::Up if angle < thresholds.down => {
                trace!("Rep phase UP -> DOWN at {:.1}°", angle);
                self.direction = Direction::Down;
                None
            }
            Direction::Down if angle > thresholds.up => {
                self.direction = Direction::Up;
                self.count += 1;
                debug!("Repetition {} completed at {:.1}°", self.count, angle);
                Some(self.count)
            }
            _ => None,
        }
    }

    /// Count one frame of a static hold when the posture is inside the band
    ///
    /// Returns the new count when the frame qualified.
    pub fn observe_hold(&mut self, angles: &AngleSet, band: &HoldBand) -> Option<u32> {
        if band.contains(angles) {
            self.count += 1;
            trace!("Hold frame {} counted", self.count);
            Some(self.count)
        } else {
            None
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RepCounter {
    fn default() -> Self {
        Self::new()
    }
}
