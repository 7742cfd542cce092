//! Event logging for the deobfuscation pipeline.
//!
//! Every rewrite a pass performs, and every pattern it had to skip, is recorded as an
//! [`Event`]. Statistics are derived from the log rather than tracked separately.
//!
//! # Example
//!
//! ```rust
//! use jsdeob::deobfuscation::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::StringDecoded)
//!     .pass("base64")
//!     .message("f(0) -> \"hello\"");
//! log.warn("index 3 is not a string");
//!
//! assert_eq!(log.count_kind(EventKind::StringDecoded), 1);
//! assert_eq!(log.warnings().count(), 1);
//! ```

use std::{collections::HashMap, fmt, time::Duration};

use crate::syntax::Span;

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A string literal was re-escaped into canonical form.
    StringNormalized,
    /// A string was recovered from a char-code call, a base64 table or an encrypted table.
    StringDecoded,
    /// A constant was recovered from an encrypted table.
    ConstantDecoded,
    /// An expression was folded to a literal.
    ConstantFolded,
    /// A conditional with a statically known test was replaced by its taken branch.
    BranchSimplified,
    /// A logical or conditional expression was simplified.
    ExpressionSimplified,
    /// A lookup-table predicate was replaced by its equivalence class.
    OpaquePredicateRemoved,
    /// A flattened dispatch loop was linearised.
    ControlFlowRestructured,
    /// A member access was rewritten to static form or resolved through a global alias.
    MemberNormalized,
    /// A numeric literal was stripped from a comma sequence.
    NoiseRemoved,
    /// A decoder, table or dead declaration was removed.
    ArtifactRemoved,

    /// A function was identified as a decoder.
    DecoderIdentified,
    /// A lookup table was extracted and classified.
    TableExtracted,
    /// A switch was identified as a flattened dispatcher.
    DispatcherIdentified,

    /// A pass completed.
    PassCompleted,

    /// Informational message.
    Info,
    /// Warning (something unexpected but recoverable).
    Warning,
    /// Error (something failed).
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            // Transformations
            Self::StringNormalized => "string normalized",
            Self::StringDecoded => "string decoded",
            Self::ConstantDecoded => "constant decoded",
            Self::ConstantFolded => "constant folded",
            Self::BranchSimplified => "branch simplified",
            Self::ExpressionSimplified => "expression simplified",
            Self::OpaquePredicateRemoved => "opaque predicate removed",
            Self::ControlFlowRestructured => "control flow restructured",
            Self::MemberNormalized => "member normalized",
            Self::NoiseRemoved => "noise removed",
            Self::ArtifactRemoved => "artifact removed",
            // Analysis
            Self::DecoderIdentified => "decoder identified",
            Self::TableExtracted => "table extracted",
            Self::DispatcherIdentified => "dispatcher identified",
            // Engine
            Self::PassCompleted => "pass completed",
            // Diagnostic
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns true if this event represents a code transformation.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::StringNormalized
                | Self::StringDecoded
                | Self::ConstantDecoded
                | Self::ConstantFolded
                | Self::BranchSimplified
                | Self::ExpressionSimplified
                | Self::OpaquePredicateRemoved
                | Self::ControlFlowRestructured
                | Self::MemberNormalized
                | Self::NoiseRemoved
                | Self::ArtifactRemoved
        )
    }

    /// Returns true if this is a diagnostic event (info/warning/error).
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Source range of the rewritten or skipped node, if known.
    pub location: Option<Span>,
    /// Human-readable description.
    pub message: String,
    /// Associated pass name (if from a pass).
    pub pass: Option<String>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pass {
            Some(pass) => write!(f, "[{}] {}: {}", self.kind, pass, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is automatically added
/// to the log when the builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    location: Option<Span>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            location: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the source range the event refers to.
    pub fn location(mut self, span: Span) -> Self {
        self.location = Some(span);
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        let event = Event {
            kind: self.kind,
            location: self.location.take(),
            message,
            pass: self.pass.take(),
        };

        self.log.events.push(event);
    }
}

/// Collection of events from deobfuscation.
///
/// Events are appended through shared references, so the engine and the pass context can
/// hold the log at the same time.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let new_log = Self::new();
        for (_, event) in &self.events {
            new_log.events.push(event.clone());
        }
        new_log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    ///
    /// The event is automatically added when the builder is dropped.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning message.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Records an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Error, message));
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.events
            .iter()
            .filter_map(move |(_, e)| if e.kind == kind { Some(e) } else { None })
    }

    /// Returns an iterator over events recorded by a specific pass.
    pub fn filter_pass<'a>(&'a self, pass: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events
            .iter()
            .filter_map(move |(_, e)| (e.pass.as_deref() == Some(pass)).then_some(e))
    }

    /// Returns an iterator over warning events.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Returns an iterator over error events.
    pub fn errors(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Error)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for (_, event) in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of transformation events.
    #[must_use]
    pub fn transformation_count(&self) -> usize {
        self.events
            .iter()
            .filter(|(_, e)| e.kind.is_transformation())
            .count()
    }

    /// Generates a human-readable summary of all events.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts = self.count_by_kind();

        // Only show transformation counts in summary
        let mut parts: Vec<String> = counts
            .iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

/// Statistics derived from an [`EventLog`].
#[derive(Debug, Clone, Default)]
pub struct DerivedStats {
    /// Number of strings normalized.
    pub strings_normalized: usize,
    /// Number of strings decoded.
    pub strings_decoded: usize,
    /// Number of constants decoded from tables.
    pub constants_decoded: usize,
    /// Number of constants folded.
    pub constants_folded: usize,
    /// Number of branches simplified.
    pub branches_simplified: usize,
    /// Number of expressions simplified.
    pub expressions_simplified: usize,
    /// Number of opaque predicates removed.
    pub opaque_predicates_removed: usize,
    /// Number of flattened loops restructured.
    pub control_flow_restructured: usize,
    /// Number of member accesses normalized.
    pub members_normalized: usize,
    /// Number of noise literals removed.
    pub noise_removed: usize,
    /// Number of artifacts removed.
    pub artifacts_removed: usize,
    /// Number of decoder functions identified.
    pub decoders: usize,
    /// Number of dispatchers identified.
    pub dispatchers: usize,
    /// Number of warnings.
    pub warnings: usize,
    /// Number of errors.
    pub errors: usize,
    /// Number of passes run.
    pub passes: usize,
    /// Processing time.
    pub total_time: Duration,
}

impl DerivedStats {
    /// Computes statistics from an event log.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let counts = log.count_by_kind();
        let get = |kind: EventKind| counts.get(&kind).copied().unwrap_or(0);

        Self {
            strings_normalized: get(EventKind::StringNormalized),
            strings_decoded: get(EventKind::StringDecoded),
            constants_decoded: get(EventKind::ConstantDecoded),
            constants_folded: get(EventKind::ConstantFolded),
            branches_simplified: get(EventKind::BranchSimplified),
            expressions_simplified: get(EventKind::ExpressionSimplified),
            opaque_predicates_removed: get(EventKind::OpaquePredicateRemoved),
            control_flow_restructured: get(EventKind::ControlFlowRestructured),
            members_normalized: get(EventKind::MemberNormalized),
            noise_removed: get(EventKind::NoiseRemoved),
            artifacts_removed: get(EventKind::ArtifactRemoved),
            decoders: get(EventKind::DecoderIdentified),
            dispatchers: get(EventKind::DispatcherIdentified),
            warnings: get(EventKind::Warning),
            errors: get(EventKind::Error),
            passes: get(EventKind::PassCompleted),
            total_time: Duration::ZERO,
        }
    }

    /// Sets the total processing time.
    #[must_use]
    pub fn with_time(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }

    /// Generates a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        // Decoding
        if self.strings_decoded > 0 {
            parts.push(format!("{} strings decoded", self.strings_decoded));
        }
        if self.constants_decoded > 0 {
            parts.push(format!("{} constants decoded", self.constants_decoded));
        }
        if self.strings_normalized > 0 {
            parts.push(format!("{} strings normalized", self.strings_normalized));
        }

        // Folding
        if self.constants_folded > 0 {
            parts.push(format!("{} constants folded", self.constants_folded));
        }
        if self.branches_simplified > 0 {
            parts.push(format!("{} branches simplified", self.branches_simplified));
        }
        if self.expressions_simplified > 0 {
            parts.push(format!(
                "{} expressions simplified",
                self.expressions_simplified
            ));
        }
        if self.opaque_predicates_removed > 0 {
            parts.push(format!(
                "{} opaque predicates",
                self.opaque_predicates_removed
            ));
        }

        // Control flow
        if self.control_flow_restructured > 0 {
            parts.push(format!("{} loops unflattened", self.control_flow_restructured));
        }

        // Cleanup
        if self.members_normalized > 0 {
            parts.push(format!("{} members normalized", self.members_normalized));
        }
        if self.noise_removed > 0 {
            parts.push(format!("{} noise literals", self.noise_removed));
        }
        if self.artifacts_removed > 0 {
            parts.push(format!("{} artifacts removed", self.artifacts_removed));
        }

        if self.errors > 0 {
            parts.push(format!("{} errors", self.errors));
        }
        if self.warnings > 0 {
            parts.push(format!("{} warnings", self.warnings));
        }

        let stats = if parts.is_empty() {
            "no transformations".to_string()
        } else {
            parts.join(", ")
        };

        if self.total_time.as_millis() > 0 {
            format!("{} in {:?} ({} passes)", stats, self.total_time, self.passes)
        } else {
            stats
        }
    }
}

impl fmt::Display for DerivedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(!log.has(EventKind::StringDecoded));
        assert_eq!(log.summary(), "no events");
    }

    #[test]
    fn test_builder_pushes_on_drop() {
        let log = EventLog::new();
        log.record(EventKind::ConstantFolded)
            .location(Span::new(3, 8))
            .pass("binary")
            .message("1 + 2 -> 3");
        log.record(EventKind::ConstantFolded);

        let events: Vec<_> = log.iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].location, Some(Span::new(3, 8)));
        assert_eq!(events[0].pass.as_deref(), Some("binary"));
        assert_eq!(events[1].message, "constant folded");
        assert_eq!(log.filter_pass("binary").count(), 1);
    }

    #[test]
    fn test_summary_and_stats() {
        let log = EventLog::new();
        log.record(EventKind::StringDecoded);
        log.record(EventKind::StringDecoded);
        log.record(EventKind::BranchSimplified);
        log.warn("skipped");
        log.info("note");

        assert_eq!(log.transformation_count(), 3);
        assert_eq!(log.summary(), "1 branch simplified, 2 string decoded");

        let stats = DerivedStats::from_log(&log);
        assert_eq!(stats.strings_decoded, 2);
        assert_eq!(stats.warnings, 1);
        assert_eq!(
            stats.summary(),
            "2 strings decoded, 1 branches simplified, 1 warnings"
        );
    }

    #[test]
    fn test_diagnostic_classification() {
        assert!(EventKind::Warning.is_diagnostic());
        assert!(!EventKind::Warning.is_transformation());
        assert!(EventKind::ArtifactRemoved.is_transformation());
        assert!(!EventKind::PassCompleted.is_transformation());
        assert_eq!(EventKind::OpaquePredicateRemoved.to_string(), "opaque predicate removed");
    }
}
