//! # jsdeob Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the jsdeob library. Import this module to get quick access to the engine, the
//! front end and the sandbox.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all jsdeob operations
pub use crate::Error;

/// The result type used throughout jsdeob
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Pipeline entry point and its configuration
pub use crate::deobfuscation::{DeobfuscationEngine, DeobfuscationResult, EngineConfig};

/// Events recorded during a run
pub use crate::deobfuscation::{EventKind, EventLog, PassStats};

/// Writing custom passes
pub use crate::deobfuscation::{Pass, PassContext};

// ================================================================================================
// Front End
// ================================================================================================

/// Parsing and printing
pub use crate::syntax::{parse, print, Ast, NodeId, NodeKind, Printer, ScopeTree, Span};

// ================================================================================================
// Sandbox
// ================================================================================================

/// Isolated snippet evaluation
pub use crate::sandbox::{BoaSandbox, Evaluator, SandboxConfig, SandboxValue};
