//! Isolated evaluation of extracted JavaScript snippets.
//!
//! Some layers can only be peeled by running the bundler's own code: string decoders, small
//! arithmetic helpers and the lookup table behind opaque predicates. Passes never touch a
//! JavaScript engine directly; they receive an [`Evaluator`] through their context and get
//! back a plain [`SandboxValue`].
//!
//! The production backend is [`BoaSandbox`], which evaluates every snippet in a fresh
//! `boa_engine` context with runtime limits and only the standard ECMAScript built-ins.
//!
//! # Example
//!
//! ```rust
//! use jsdeob::sandbox::{BoaSandbox, Evaluator, SandboxValue};
//!
//! let sandbox = BoaSandbox::default();
//! let value = sandbox.evaluate("[1 + 1, 'a'.repeat(2)]")?;
//! assert_eq!(
//!     value,
//!     SandboxValue::Array(vec![SandboxValue::Number(2.0), SandboxValue::String("aa".into())])
//! );
//! # Ok::<(), jsdeob::Error>(())
//! ```

mod boa;

use std::fmt;

pub use boa::BoaSandbox;

use crate::Result;

/// Runtime limits applied to every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Maximum iterations of a single loop.
    pub loop_iteration_limit: u64,
    /// Maximum call depth.
    pub recursion_limit: usize,
    /// Maximum VM stack size.
    pub stack_size_limit: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 5_000_000,
            recursion_limit: 400,
            stack_size_limit: 1024 * 1024,
        }
    }
}

/// A value returned from the sandbox, detached from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    String(String),
    /// An array, converted element by element.
    Array(Vec<SandboxValue>),
    /// Any other object.
    Object,
}

impl SandboxValue {
    /// Returns the number if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SandboxValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SandboxValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the elements if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[SandboxValue]> {
        match self {
            SandboxValue::Array(values) => Some(values),
            _ => None,
        }
    }

    /// The `typeof`-like name of the value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            SandboxValue::Undefined => "undefined",
            SandboxValue::Null => "null",
            SandboxValue::Bool(_) => "boolean",
            SandboxValue::Number(_) => "number",
            SandboxValue::String(_) => "string",
            SandboxValue::Array(_) => "array",
            SandboxValue::Object => "object",
        }
    }
}

impl fmt::Display for SandboxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxValue::Undefined => f.write_str("undefined"),
            SandboxValue::Null => f.write_str("null"),
            SandboxValue::Bool(value) => write!(f, "{value}"),
            SandboxValue::Number(value) => f.write_str(&crate::numeric::number_to_string(*value)),
            SandboxValue::String(value) => write!(f, "{value:?}"),
            SandboxValue::Array(values) => write!(f, "[array of {}]", values.len()),
            SandboxValue::Object => f.write_str("[object]"),
        }
    }
}

/// Capability to evaluate a self-contained script and return its completion value.
///
/// Implementations must not leak state between calls: each call sees only the standard
/// built-ins and the code it is given.
pub trait Evaluator {
    /// Evaluates `source` and converts the completion value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Sandbox`] if the script throws, exceeds a runtime limit or
    /// fails to parse.
    fn evaluate(&self, source: &str) -> Result<SandboxValue>;
}
