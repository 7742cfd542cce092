//! String literal passes.
//!
//! Three independent rewrites that run at the start of the pipeline:
//!
//! - [`UnescapeStringsPass`] reprints every string literal in canonical form, which turns
//!   `"\x68ello"` into `"hello"`.
//! - [`CharCodePass`] resolves aliases of `String.fromCharCode` called with one number.
//! - [`ConcatFoldingPass`] folds `+` trees whose leaves are all string literals.
//!
//! # Example
//!
//! ```text
//! var c = String["fromCharCode"];   →   (removed)
//! x = c(104) + c(105);              →   x = "hi";   (after concatenation folding)
//! ```

use crate::{
    deobfuscation::{
        context::PassContext,
        events::EventKind,
        pass::Pass,
        passes::utils::{callee_ident, remove_declarator, static_member_key},
    },
    numeric::{extract_number, to_uint16},
    syntax::{quote_string, Ast, BinaryOp, NodeId, NodeKind, ScopeTree},
    Result,
};

/// Reprints string literals in their minimal escaped, double-quoted form.
pub struct UnescapeStringsPass;

impl Default for UnescapeStringsPass {
    fn default() -> Self {
        Self::new()
    }
}

impl UnescapeStringsPass {
    /// Creates a new unescape pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pass for UnescapeStringsPass {
    fn name(&self) -> &'static str {
        "unescape-strings"
    }

    fn description(&self) -> &'static str {
        "Reprints string literals with minimal escaping"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let mut changed = 0;
        for id in ast.live_nodes() {
            let NodeKind::StringLiteral {
                value,
                raw: Some(raw),
            } = ast.kind(id)
            else {
                continue;
            };
            let canonical = quote_string(value);
            if *raw == canonical {
                if let NodeKind::StringLiteral { raw, .. } = ast.kind_mut(id) {
                    *raw = None;
                }
                continue;
            }
            let message = format!("{raw} -> {canonical}");
            let value = value.clone();
            ast.replace(id, NodeKind::string(value));
            ctx.rewrite(EventKind::StringNormalized, ast.span(id), message);
            changed += 1;
        }
        Ok(changed)
    }
}

/// Resolves calls through aliases of `String.fromCharCode`.
///
/// # Transformed Patterns
///
/// A never-reassigned binding initialised with `String.fromCharCode`,
/// `String["fromCharCode"]` or `String[["fromCharCode"]]` is followed to its references.
/// Every call with exactly one numeric argument becomes the one-character string. If any
/// reference is used as anything but a callee the binding is left alone, and the alias
/// declarator is removed once every reference has been replaced.
pub struct CharCodePass;

impl Default for CharCodePass {
    fn default() -> Self {
        Self::new()
    }
}

impl CharCodePass {
    /// Creates a new char-code pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if `init` is a static `String.fromCharCode` access on the global `String`.
    fn is_from_char_code(ast: &Ast, scopes: &ScopeTree, init: NodeId) -> bool {
        let NodeKind::Member {
            object,
            property,
            computed,
        } = ast.kind(init)
        else {
            return false;
        };
        ast.kind(*object).as_ident() == Some("String")
            && scopes.resolve(*object).is_none()
            && static_member_key(ast, *property, *computed) == Some("fromCharCode")
    }

    /// Decodes a call with a single numeric argument.
    fn decode_call(ast: &Ast, call: NodeId) -> Option<std::result::Result<char, u16>> {
        let NodeKind::Call { arguments, .. } = ast.kind(call) else {
            return None;
        };
        let [argument] = arguments.as_slice() else {
            return None;
        };
        let unit = to_uint16(extract_number(ast, *argument)?);
        Some(char::from_u32(u32::from(unit)).ok_or(unit))
    }
}

impl Pass for CharCodePass {
    fn name(&self) -> &'static str {
        "char-codes"
    }

    fn description(&self) -> &'static str {
        "Resolves String.fromCharCode aliases called with constant arguments"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let scopes = ScopeTree::build(ast);
        let mut changed = 0;

        for (id, binding) in scopes.bindings() {
            let declarator = binding.declaration;
            let NodeKind::VariableDeclarator {
                init: Some(init), ..
            } = ast.kind(declarator)
            else {
                continue;
            };
            if !scopes.is_constant(id) || !Self::is_from_char_code(ast, &scopes, *init) {
                continue;
            }

            let mut calls = Vec::with_capacity(binding.references.len());
            let mut escaped = false;
            for reference in &binding.references {
                match ast.parent(*reference) {
                    Some(call) if callee_ident(ast, call) == Some(*reference) => calls.push(call),
                    _ => {
                        ctx.warn(
                            ast.span(*reference),
                            format!("'{}' is used as a value, not resolving it", binding.name),
                        );
                        escaped = true;
                        break;
                    }
                }
            }
            if escaped {
                continue;
            }
            ctx.record(EventKind::DecoderIdentified)
                .location(ast.span(declarator))
                .message(format!("'{}' aliases String.fromCharCode", binding.name));

            let mut replaced = 0;
            for call in calls {
                match Self::decode_call(ast, call) {
                    Some(Ok(decoded)) => {
                        let literal = NodeKind::string(decoded.to_string());
                        ctx.rewrite(
                            EventKind::StringDecoded,
                            ast.span(call),
                            format!("{}(..) -> {}", binding.name, quote_string(&decoded.to_string())),
                        );
                        ast.replace(call, literal);
                        replaced += 1;
                    }
                    Some(Err(unit)) => {
                        ctx.warn(
                            ast.span(call),
                            format!("char code {unit:#06x} is a lone surrogate"),
                        );
                    }
                    None => {}
                }
            }
            changed += replaced;

            if replaced == binding.references.len() && remove_declarator(ast, declarator) {
                ctx.rewrite(
                    EventKind::ArtifactRemoved,
                    ast.span(declarator),
                    format!("removed alias '{}'", binding.name),
                );
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// Folds `+` trees whose every leaf is a string literal.
pub struct ConcatFoldingPass;

impl Default for ConcatFoldingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcatFoldingPass {
    /// Creates a new concatenation folding pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pass for ConcatFoldingPass {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn description(&self) -> &'static str {
        "Folds concatenations of string literals"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let mut changed = 0;
        for id in ast.postorder(ast.root()) {
            let NodeKind::Binary {
                operator: BinaryOp::Add,
                left,
                right,
            } = ast.kind(id)
            else {
                continue;
            };
            let (Some(left), Some(right)) =
                (ast.kind(*left).as_string(), ast.kind(*right).as_string())
            else {
                continue;
            };
            let joined = format!("{left}{right}");
            ctx.rewrite(
                EventKind::ConstantFolded,
                ast.span(id),
                format!("concatenation -> {}", quote_string(&joined)),
            );
            ast.replace(id, NodeKind::string(joined));
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::run_pass;

    #[test]
    fn test_unescape_canonicalises() {
        let run = run_pass(&UnescapeStringsPass::new(), "x = '\\x68\\u0065llo'; y = \"ok\";");
        assert_eq!(run.output, "x = \"hello\";\ny = \"ok\";\n");
        assert_eq!(run.rewrites, 1);
        assert_eq!(run.events.count_kind(EventKind::StringNormalized), 1);
    }

    #[test]
    fn test_unescape_keeps_needed_escapes() {
        let run = run_pass(&UnescapeStringsPass::new(), "x = 'a\"b\\n';");
        assert_eq!(run.output, "x = \"a\\\"b\\n\";\n");
    }

    #[test]
    fn test_char_code_alias_resolved_and_removed() {
        let source = "var c = String[['fromCharCode']]; x = c(104); y = c(0x69);";
        let run = run_pass(&CharCodePass::new(), source);
        assert_eq!(run.output, "x = \"h\";\ny = \"i\";\n");
        assert_eq!(run.rewrites, 3);
    }

    #[test]
    fn test_char_code_escaped_reference_aborts() {
        let source = "var c = String.fromCharCode; x = c(65); y = [c];";
        let run = run_pass(&CharCodePass::new(), source);
        assert_eq!(run.rewrites, 0);
        assert!(run.output.contains("c(65)"));
        assert_eq!(run.events.warnings().count(), 1);
    }

    #[test]
    fn test_char_code_other_shapes_untouched() {
        let source = "var c = String.fromCharCode; x = c(65, 66); y = c(z); w = c(66);";
        let run = run_pass(&CharCodePass::new(), source);
        assert_eq!(run.rewrites, 1);
        assert!(run.output.starts_with("var c = String.fromCharCode;"));
        assert!(run.output.contains("w = \"B\";"));
    }

    #[test]
    fn test_char_code_shadowed_string_ignored() {
        let source = "function f(String) { var c = String.fromCharCode; return c(65); }";
        let run = run_pass(&CharCodePass::new(), source);
        assert_eq!(run.rewrites, 0);
    }

    #[test]
    fn test_concat_folding() {
        let source = "x = 'a' + 'b' + 'c'; y = a + 'b' + 'c'; z = a + ('b' + 'c');";
        let run = run_pass(&ConcatFoldingPass::new(), source);
        assert_eq!(run.output, "x = \"abc\";\ny = a + \"b\" + \"c\";\nz = a + \"bc\";\n");
        assert_eq!(run.rewrites, 3);
    }

    #[test]
    fn test_concat_is_idempotent() {
        let first = run_pass(&ConcatFoldingPass::new(), "x = 'a' + 'b';");
        let second = run_pass(&ConcatFoldingPass::new(), &first.output);
        assert_eq!(second.rewrites, 0);
    }
}
