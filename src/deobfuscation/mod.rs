//! Deobfuscation framework for bundler-protected JavaScript.
//!
//! This module turns a parsed script back into readable source by running a fixed sequence
//! of tree-rewriting passes over it. Every pass mutates the arena tree in place, records
//! what it did in the run's [`EventLog`] and reports a rewrite count.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                       Deobfuscation Pipeline                         │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  Input: JavaScript source                                            │
//! │           │                                                          │
//! │           ▼                                                          │
//! │  ┌────────────────────────────────────────────────────────────────┐  │
//! │  │  Parse once: arena Ast with stable node ids                    │  │
//! │  └──────────────────────────────┬─────────────────────────────────┘  │
//! │                                 ▼                                    │
//! │  ┌────────────────────────────────────────────────────────────────┐  │
//! │  │  Decoders: strings, char codes, concatenation, base64 and      │  │
//! │  │  encrypted tables (sandboxed), small arithmetic helpers        │  │
//! │  ├────────────────────────────────────────────────────────────────┤  │
//! │  │  Members and arithmetic: global aliases, static members,       │  │
//! │  │  Math/parseInt/Number, opaque predicates, binary folding       │  │
//! │  ├────────────────────────────────────────────────────────────────┤  │
//! │  │  Control flow: static branches (twice), switch unflattening    │  │
//! │  ├────────────────────────────────────────────────────────────────┤  │
//! │  │  Cleanup: comma noise, logical short circuits, if statements   │  │
//! │  └──────────────────────────────┬─────────────────────────────────┘  │
//! │                                 ▼                                    │
//! │  Output: printed source + DeobfuscationResult (events, pass stats)   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Components
//!
//! - [`DeobfuscationEngine`] - Owns the configuration, the sandbox and the pass schedule
//! - [`EngineConfig`] - Pass groups, sandbox limits and naming conventions of the bundler
//! - [`Pass`] - The trait every pass implements
//! - [`PassContext`] - Per-run state: configuration, sandbox, events and the memoised
//!   lookup-table classification ([`EquivalenceCache`])
//! - [`EventLog`] / [`DerivedStats`] - What happened during the run
//!
//! See the [`passes`] module for the individual passes.
//!
//! # Usage
//!
//! ```rust
//! use jsdeob::deobfuscation::{DeobfuscationEngine, EngineConfig};
//!
//! let config = EngineConfig::default().with_global_object("self");
//! let engine = DeobfuscationEngine::new(config);
//!
//! let (code, result) = engine.process("var s = self; s.postMessage(1);")?;
//! assert_eq!(code, "postMessage(1);\n");
//! println!("{}", result.detailed_summary());
//! # Ok::<(), jsdeob::Error>(())
//! ```

mod config;
mod context;
mod engine;
mod events;
mod pass;
mod result;

// Built-in passes
pub mod passes;

pub use config::EngineConfig;
pub use context::{EquivalenceCache, PassContext};
pub use engine::DeobfuscationEngine;
pub use events::{DerivedStats, Event, EventBuilder, EventKind, EventLog};
pub use pass::Pass;
pub use result::{DeobfuscationResult, PassStats};
