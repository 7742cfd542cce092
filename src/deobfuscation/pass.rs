//! Pass trait for the deobfuscation pipeline.
//!
//! Passes don't declare their own priority or triggers. The engine schedules them in a
//! fixed order:
//!
//! 1. Unescape string literals
//! 2. Fold small arithmetic helpers
//! 3. Resolve `String.fromCharCode` aliases
//! 4. Fold string concatenation
//! 5. Decode base64 tables
//! 6. Decode encrypted tables
//! 7. Fold small arithmetic helpers again
//! 8. Inline global object aliases
//! 9. Turn computed member access into static access
//! 10. Fold `Math.floor`/`Math.ceil`, `parseInt` and `Number`
//! 11. Replace lookup-table predicates with their equivalence class
//! 12. Fold binary expressions
//! 13. Eliminate static branches
//! 14. Eliminate static branches again
//! 15. Unflatten switch dispatchers
//! 16. Strip numeric noise from comma sequences
//! 17. Fold logical short circuits
//! 18. Normalise `if` statements
//!
//! Every pass checks the shape it targets and is a no-op when that shape is absent, so no
//! pass relies on another having run.

use crate::{deobfuscation::context::PassContext, syntax::Ast, Result};

/// A tree-rewriting deobfuscation pass.
///
/// All passes must be thread-safe (Send + Sync) so that an engine can be shared.
pub trait Pass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Runs the pass over the whole program.
    ///
    /// Returns the number of rewrites performed. A rerun on the pass's own output must
    /// return zero. Events should be recorded through `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass hits a condition it cannot skip.
    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize>;
}
