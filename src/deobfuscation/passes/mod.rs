//! Built-in deobfuscation passes.
//!
//! Each pass rewrites the syntax tree in place and returns the number of rewrites it made.
//! Passes are independent: every one checks for the shape it targets and does nothing when
//! the shape is absent.
//!
//! # Pipeline Order
//!
//! The [`DeobfuscationEngine`](crate::deobfuscation::DeobfuscationEngine) schedules the
//! passes in a fixed order. Some run twice.
//!
//! ## Decoders
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`UnescapeStringsPass`] | Reprints string literals without needless escapes |
//! | [`SmallFunctionFoldingPass`] | Evaluates calls of small arithmetic helpers (first run) |
//! | [`CharCodePass`] | Resolves aliases of `String.fromCharCode` |
//! | [`ConcatFoldingPass`] | Folds concatenation of string literals |
//! | [`Base64DecodePass`] | Decodes base64 string tables behind an accessor |
//! | [`EncryptedTablePass`] | Decodes encrypted string and number tables in the sandbox |
//! | [`SmallFunctionFoldingPass`] | Second run, over helpers exposed by decoding |
//!
//! ## Members and Arithmetic
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`GlobalAliasPass`] | Resolves aliases of the global object |
//! | [`MemberNormalizationPass`] | Rewrites `obj["key"]` to `obj.key` |
//! | [`StaticMathPass`] | Folds `Math.floor`, `Math.ceil`, `parseInt` and `Number` |
//! | [`OpaquePredicatePass`] | Replaces opaque lookups with their equivalence class |
//! | [`BinaryFoldingPass`] | Folds numeric binary expressions |
//!
//! ## Control Flow
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`StaticBranchPass`] | Removes branches with a static test (runs twice) |
//! | [`SwitchUnflatteningPass`] | Linearises switch-based dispatcher loops |
//!
//! ## Cleanup
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`WildNumbersPass`] | Strips numeric noise from comma sequences |
//! | [`LogicalFoldingPass`] | Drops neutral operands of `&&` and `||` |
//! | [`IfNormalizationPass`] | Simplifies the shape of `if` statements |

mod arithmetic;
mod base64;
mod binary;
mod cleanup;
mod conditions;
mod controlflow;
mod decryption;
mod logical;
mod math;
mod predicates;
mod strings;
mod unflattening;
pub(crate) mod utils;

pub use self::arithmetic::SmallFunctionFoldingPass;
pub use self::base64::{atob, Base64DecodePass};
pub use self::binary::BinaryFoldingPass;
pub use self::cleanup::{GlobalAliasPass, MemberNormalizationPass, WildNumbersPass};
pub use self::conditions::IfNormalizationPass;
pub use self::controlflow::StaticBranchPass;
pub use self::decryption::EncryptedTablePass;
pub use self::logical::LogicalFoldingPass;
pub use self::math::StaticMathPass;
pub use self::predicates::{EquivalenceTable, OpaquePredicatePass};
pub use self::strings::{CharCodePass, ConcatFoldingPass, UnescapeStringsPass};
pub use self::unflattening::SwitchUnflatteningPass;
