//! Deobfuscation result types.
//!
//! This module contains the [`DeobfuscationResult`] struct which encapsulates
//! the outcome of running the deobfuscation engine on a script.

use std::{fmt::Write, time::Duration};

use crate::deobfuscation::events::{DerivedStats, EventLog};

/// Timing and outcome of one scheduled pass.
#[derive(Debug, Clone)]
pub struct PassStats {
    /// Pass name.
    pub name: &'static str,
    /// Number of rewrites the pass reported.
    pub rewrites: usize,
    /// Wall-clock time spent in the pass.
    pub elapsed: Duration,
    /// Error message if the pass failed and was skipped.
    pub error: Option<String>,
}

/// Result of running deobfuscation.
///
/// Contains the event log capturing all activity during deobfuscation and the per-pass
/// statistics. Aggregate statistics are derived from the event log on demand.
#[derive(Debug, Clone, Default)]
pub struct DeobfuscationResult {
    /// All events from the deobfuscation run.
    pub events: EventLog,
    /// One entry per scheduled pass, in execution order.
    pub passes: Vec<PassStats>,
    /// Total processing time.
    pub total_time: Duration,
}

impl DeobfuscationResult {
    /// Creates a new deobfuscation result.
    #[must_use]
    pub fn new(events: EventLog, passes: Vec<PassStats>) -> Self {
        Self {
            events,
            passes,
            total_time: Duration::ZERO,
        }
    }

    /// Sets timing info.
    #[must_use]
    pub fn with_timing(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }

    /// Total number of rewrites reported by all passes.
    #[must_use]
    pub fn rewrites(&self) -> usize {
        self.passes.iter().map(|pass| pass.rewrites).sum()
    }

    /// Computes statistics derived from the event log.
    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        DerivedStats::from_log(&self.events).with_time(self.total_time)
    }

    /// Generates a human-readable summary of the deobfuscation results.
    #[must_use]
    pub fn summary(&self) -> String {
        self.stats().summary()
    }

    /// Generates a multi-line summary with one line per pass.
    #[must_use]
    pub fn detailed_summary(&self) -> String {
        let mut out = format!("Deobfuscation complete: {}\n", self.summary());
        for pass in &self.passes {
            let _ = write!(
                out,
                "  {:<24} {:>6} rewrites {:>10.2?}",
                pass.name, pass.rewrites, pass.elapsed
            );
            if let Some(error) = &pass.error {
                let _ = write!(out, "  (failed: {error})");
            }
            out.push('\n');
        }
        out
    }
}
