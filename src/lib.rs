// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # jsdeob
//!
//! A deobfuscator for JavaScript produced by an anti-bot vendor's bundler. It reverses the
//! layers the bundler stacks on top of the original logic (escaped and split strings,
//! base64 and encrypted lookup tables, arithmetic helper functions, opaque predicates backed
//! by a 2-D lookup table, and switch-based control-flow flattening) and prints readable,
//! semantically equivalent source.
//!
//! ## Features
//!
//! - **Self-contained front end** - Parser, arena syntax tree, scope analysis and printer
//! - **Sandboxed evaluation** - Extracted decoder functions run in an embedded JS engine
//!   with runtime limits and no host globals
//! - **Fixed pass pipeline** - Eighteen steps in a deterministic order, each a no-op when
//!   its pattern is absent
//! - **Structured diagnostics** - Every rewrite and every skipped pattern lands in an
//!   [`deobfuscation::EventLog`]
//!
//! ## Quick Start
//!
//! ```rust
//! use jsdeob::deobfuscation::DeobfuscationEngine;
//!
//! let engine = DeobfuscationEngine::default();
//! let (code, result) = engine.process("var a = 1 ? 'x' + 'y' : 2;")?;
//! assert_eq!(code, "var a = \"xy\";\n");
//! println!("{}", result.summary());
//! # Ok::<(), jsdeob::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`syntax`] - Lexer, parser, arena tree, traversal, scope analysis and printer
//! - [`numeric`] - The numeric literal model and JS primitive semantics
//! - [`sandbox`] - The [`sandbox::Evaluator`] capability and its `boa_engine` backend
//! - [`deobfuscation`] - Engine, configuration, events and the passes
//! - [`Error`] and [`Result`] - Error handling

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use jsdeob::prelude::*;
///
/// let ast = parse("a = !0 ? 1 : 2;")?;
/// assert_eq!(print(&ast), "a = !0 ? 1 : 2;\n");
/// # Ok::<(), jsdeob::Error>(())
/// ```
pub mod prelude;

/// JavaScript front end.
///
/// The passes only consume this module through its public surface: parse, print, traverse,
/// replace, remove and resolve bindings.
pub mod syntax;

/// Numeric literal model and JavaScript primitive semantics.
pub mod numeric;

/// Isolated evaluation of extracted JavaScript snippets.
pub mod sandbox;

/// The deobfuscation pipeline.
pub mod deobfuscation;

/// `jsdeob` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `jsdeob` Error type
///
/// # Examples
///
/// ```rust
/// use jsdeob::{syntax::parse, Error};
///
/// match parse("class A {}") {
///     Err(Error::Parse { line, .. }) => assert_eq!(line, 1),
///     Err(e) => println!("Error: {}", e),
///     Ok(_) => unreachable!(),
/// }
/// ```
pub use error::Error;
