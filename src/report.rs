//! Session summaries and the text report handed to exporters

use crate::angles::AngleSet;
use crate::error::EventBusError;
use crate::events::{CoachEvent, EventFilter, EventHandler};
use crate::exercise::ExerciseKind;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write;
use tracing::info;
use uuid::Uuid;

/// Read-only view of a session, produced on exercise change and at exit
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub exercise: ExerciseKind,
    pub exercise_name: String,
    pub count: u32,
    pub last_immediate_message: String,
    pub last_technical_message: String,
    /// Windowed average at the time of the summary, `None` if no frame was seen
    pub average_angles: Option<AngleSet>,
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub generated_at: DateTime<Local>,
}

impl SessionSummary {
    /// Plain-text report, one field per line
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Exercise: {}", self.exercise_name);
        let _ = writeln!(out, "Repetitions: {}", self.count);
        let _ = writeln!(out, "Date: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Last feedback: {}", or_dash(&self.last_immediate_message));
        let _ = writeln!(
            out,
            "Last technical feedback: {}",
            or_dash(&self.last_technical_message)
        );

        match &self.average_angles {
            Some(angles) => {
                let _ = writeln!(out, "Average angles:");
                for (joint, angle) in angles.iter() {
                    match angle {
                        Some(angle) => {
                            let _ = writeln!(out, "  {}: {:.1}°", joint, angle);
                        }
                        None => {
                            let _ = writeln!(out, "  {}: n/a", joint);
                        }
                    }
                }
            }
            None => {
                let _ = writeln!(out, "Average angles: n/a");
            }
        }

        out
    }
}

fn or_dash(message: &str) -> &str {
    if message.is_empty() {
        "-"
    } else {
        message
    }
}

/// Collects rendered reports from [`CoachEvent::SessionSummary`] events
///
/// Persisting them is left to the owner; this handler never touches disk.
#[derive(Debug, Default)]
pub struct ReportCollector {
    reports: Vec<(SessionSummary, String)>,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[(SessionSummary, String)] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<(SessionSummary, String)> {
        self.reports
    }
}

#[async_trait::async_trait]
impl EventHandler for ReportCollector {
    async fn handle_event(&mut self, event: CoachEvent) -> Result<(), EventBusError> {
        if let CoachEvent::SessionSummary(summary) = event {
            info!(
                "Report produced for {} ({} reps)",
                summary.exercise_name, summary.count
            );
            let text = summary.render_text();
            self.reports.push((summary, text));
        }
        Ok(())
    }

    fn handler_name(&self) -> &str {
        "report_collector"
    }

    fn event_filter(&self) -> EventFilter {
        EventFilter::EventTypes(vec!["session_summary"])
    }
}
