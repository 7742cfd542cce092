//! Per-run state handed to every pass.
//!
//! The [`PassContext`] bundles the configuration, the sandbox capability, the event log and
//! the memoised lookup-table classification. It lives for exactly one pipeline run; nothing
//! in it is persisted between runs.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::{
    deobfuscation::{
        config::EngineConfig,
        events::{EventBuilder, EventKind, EventLog},
        passes::EquivalenceTable,
    },
    sandbox::Evaluator,
    syntax::Span,
    Result,
};

/// Memoised equivalence tables keyed by table identity.
///
/// The key is the printed source of the index-generating function followed by the backing
/// array declaration, so two resolver invocations over the same table share one
/// classification.
#[derive(Debug, Default)]
pub struct EquivalenceCache {
    tables: FxHashMap<String, Rc<EquivalenceTable>>,
    hits: usize,
}

impl EquivalenceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table stored under `key`, building it with `build` on first use.
    ///
    /// # Errors
    ///
    /// Propagates the error of `build`; nothing is cached in that case.
    pub fn get_or_try_insert_with(
        &mut self,
        key: &str,
        build: impl FnOnce() -> Result<EquivalenceTable>,
    ) -> Result<Rc<EquivalenceTable>> {
        if let Some(table) = self.tables.get(key) {
            self.hits += 1;
            return Ok(Rc::clone(table));
        }
        let table = Rc::new(build()?);
        self.tables.insert(key.to_string(), Rc::clone(&table));
        Ok(table)
    }

    /// Number of cached tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if nothing has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of lookups answered from the cache.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits
    }
}

/// Context for one pipeline run.
pub struct PassContext<'a> {
    /// Engine configuration.
    pub config: &'a EngineConfig,
    /// Sandbox used for decoder and table evaluation.
    pub sandbox: &'a dyn Evaluator,
    /// Event log of the run.
    pub events: &'a EventLog,
    /// Memoised opaque-predicate tables.
    pub equivalences: &'a mut EquivalenceCache,
    pass: &'static str,
}

impl<'a> PassContext<'a> {
    /// Creates a context for one run.
    pub fn new(
        config: &'a EngineConfig,
        sandbox: &'a dyn Evaluator,
        events: &'a EventLog,
        equivalences: &'a mut EquivalenceCache,
    ) -> Self {
        Self {
            config,
            sandbox,
            events,
            equivalences,
            pass: "engine",
        }
    }

    /// Name of the pass currently running.
    #[must_use]
    pub fn pass(&self) -> &'static str {
        self.pass
    }

    pub(crate) fn enter(&mut self, pass: &'static str) {
        self.pass = pass;
    }

    /// Starts an event attributed to the running pass.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        self.events.record(kind).pass(self.pass)
    }

    /// Records a transformation at `span` with a message.
    pub fn rewrite(&self, kind: EventKind, span: Span, message: impl Into<String>) {
        let message = message.into();
        log::trace!("[{}] {}", self.pass, message);
        self.record(kind).location(span).message(message);
    }

    /// Records a skipped pattern as a warning.
    pub fn warn(&self, span: Span, message: impl Into<String>) {
        let message = message.into();
        log::debug!("[{}] {}", self.pass, message);
        self.record(EventKind::Warning)
            .location(span)
            .message(message);
    }

    /// Records an informational note.
    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("[{}] {}", self.pass, message);
        self.record(EventKind::Info).message(message);
    }
}
