//! Small arithmetic function folding.
//!
//! The bundler replaces integer constants with calls of tiny helpers:
//!
//! ```text
//! function n(a, b) { var c = a * 2; return c - b; }
//! x = n(5, 3);                                        →   x = 7;
//! ```
//!
//! A helper qualifies if it takes at least two parameters, has at most five statements,
//! ends with a `return` and contains nothing but arithmetic over its locals. Each helper is
//! evaluated once in the sandbox together with all of its constant-argument calls; every
//! call runs inside its own `try`/`catch` so that one failing call does not hide the
//! others. Only calls with exactly two numeric arguments are folded.

use std::fmt::Write;

use crate::{
    deobfuscation::{
        context::PassContext,
        events::EventKind,
        pass::Pass,
        passes::utils::{callee_ident, function_body, function_name},
    },
    numeric::{is_number, number_to_string, synthesize, Primitive},
    sandbox::SandboxValue,
    syntax::{print_node, Ast, NodeId, NodeKind, ScopeTree},
    Result,
};

/// Maximum number of statements in a helper body.
const MAX_HELPER_STATEMENTS: usize = 5;

/// Folds calls of small arithmetic helper functions.
pub struct SmallFunctionFoldingPass;

impl Default for SmallFunctionFoldingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl SmallFunctionFoldingPass {
    /// Creates a new small-function folding pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if `function` is an arithmetic helper.
    fn is_helper(ast: &Ast, function: NodeId) -> bool {
        let Some(func) = ast.kind(function).as_function() else {
            return false;
        };
        if func.params.len() < 2 || func.id.is_none() {
            return false;
        }
        let Some(body) = function_body(ast, function) else {
            return false;
        };
        if body.is_empty() || body.len() > MAX_HELPER_STATEMENTS {
            return false;
        }
        let ends_with_return = body.last().is_some_and(|last| {
            matches!(
                ast.kind(*last),
                NodeKind::Return {
                    argument: Some(_)
                }
            )
        });
        ends_with_return
            && ast
                .preorder(func.body)
                .into_iter()
                .skip(1)
                .all(|id| Self::is_safe(ast.kind(id)))
    }

    /// Node kinds allowed inside a helper body.
    fn is_safe(kind: &NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::Binary { .. }
                | NodeKind::Unary { .. }
                | NodeKind::Identifier { .. }
                | NodeKind::Conditional { .. }
                | NodeKind::NumericLiteral { .. }
                | NodeKind::Member { .. }
                | NodeKind::Return { .. }
                | NodeKind::VariableDeclaration { .. }
                | NodeKind::VariableDeclarator { .. }
                | NodeKind::Assignment { .. }
                | NodeKind::ExpressionStatement { .. }
        )
    }

    /// Returns the call if `reference` is called with exactly two numeric arguments.
    fn foldable_call(ast: &Ast, reference: NodeId) -> Option<NodeId> {
        let call = ast.parent(reference)?;
        if callee_ident(ast, call) != Some(reference) {
            return None;
        }
        let NodeKind::Call { arguments, .. } = ast.kind(call) else {
            return None;
        };
        (arguments.len() == 2 && arguments.iter().all(|arg| is_number(ast, *arg))).then_some(call)
    }

    /// Builds one snippet evaluating every call in isolation.
    fn snippet(ast: &Ast, function: NodeId, calls: &[NodeId]) -> String {
        let mut source = print_node(ast, function);
        source.push_str("\n[\n");
        for call in calls {
            let _ = writeln!(
                source,
                "  (function () {{ try {{ return {}; }} catch (e) {{ return undefined; }} }})(),",
                print_node(ast, *call)
            );
        }
        source.push_str("];\n");
        source
    }
}

impl Pass for SmallFunctionFoldingPass {
    fn name(&self) -> &'static str {
        "small-functions"
    }

    fn description(&self) -> &'static str {
        "Evaluates small arithmetic helpers called with constant arguments"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let scopes = ScopeTree::build(ast);
        let helpers: Vec<NodeId> = ast
            .find_all(ast.root(), |kind| matches!(kind, NodeKind::FunctionDeclaration(_)))
            .into_iter()
            .filter(|function| Self::is_helper(ast, *function))
            .collect();

        let mut changed = 0;
        for function in helpers {
            let Some(name_site) = ast.kind(function).as_function().and_then(|func| func.id) else {
                continue;
            };
            let Some(binding) = scopes.resolve(name_site) else {
                continue;
            };
            if !scopes.is_constant(binding) {
                continue;
            }
            let name = function_name(ast, function).unwrap_or_default().to_string();
            let calls: Vec<NodeId> = scopes
                .binding(binding)
                .references
                .iter()
                .filter(|reference| ast.is_live(**reference))
                .filter_map(|reference| Self::foldable_call(ast, *reference))
                .collect();
            if calls.is_empty() {
                continue;
            }

            let source = Self::snippet(ast, function, &calls);
            let results = match ctx.sandbox.evaluate(&source) {
                Ok(SandboxValue::Array(results)) if results.len() == calls.len() => results,
                Ok(other) => {
                    ctx.warn(
                        ast.span(function),
                        format!("evaluating '{name}' returned {}", other.type_name()),
                    );
                    continue;
                }
                Err(err) => {
                    ctx.warn(ast.span(function), format!("evaluating '{name}' failed: {err}"));
                    continue;
                }
            };

            for (call, result) in calls.iter().zip(results) {
                let span = ast.span(*call);
                match result.as_number() {
                    Some(value) if value.is_finite() => {
                        ctx.rewrite(
                            EventKind::ConstantFolded,
                            span,
                            format!("{} -> {}", print_node(ast, *call), number_to_string(value)),
                        );
                        let literal = synthesize(ast, Primitive::Number(value), span);
                        ast.replace_with(*call, literal);
                        changed += 1;
                    }
                    _ => ctx.warn(
                        span,
                        format!("{} evaluated to {result}", print_node(ast, *call)),
                    ),
                }
            }

            let rescan = ScopeTree::build(ast);
            let unreferenced = rescan
                .resolve(name_site)
                .is_some_and(|binding| rescan.binding(binding).references.is_empty());
            if unreferenced && ast.remove(function) {
                ctx.rewrite(
                    EventKind::ArtifactRemoved,
                    ast.span(function),
                    format!("removed helper '{name}'"),
                );
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::run_pass;

    #[test]
    fn test_folds_and_removes_helper() {
        let source = "function n(a, b) { var c = a * 2; return c - b; } x = n(5, 3); y = n(-~1, !0);";
        let run = run_pass(&SmallFunctionFoldingPass::new(), source);
        assert_eq!(run.output, "x = 7;\ny = 3;\n");
        assert_eq!(run.rewrites, 3);
    }

    #[test]
    fn test_negative_results_use_unary_minus() {
        let source = "function n(a, b) { return a - b; } x = n(1, 4);";
        let run = run_pass(&SmallFunctionFoldingPass::new(), source);
        assert_eq!(run.output, "x = -3;\n");
    }

    #[test]
    fn test_partial_folding_keeps_helper() {
        let source = "function n(a, b) { return a + b; } x = n(1, 2); y = n(z, 2);";
        let run = run_pass(&SmallFunctionFoldingPass::new(), source);
        assert_eq!(run.rewrites, 1);
        assert!(run.output.contains("function n(a, b)"));
        assert!(run.output.contains("x = 3;"));
        assert!(run.output.contains("y = n(z, 2);"));
    }

    #[test]
    fn test_calls_outside_safe_subset_untouched() {
        let source = "function n(a, b) { return g(a) + b; } x = n(1, 2);";
        let run = run_pass(&SmallFunctionFoldingPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }

    #[test]
    fn test_throwing_call_is_isolated() {
        let source = "function n(a, b) { return a ? a.b.c : b; } x = n(1, 2); y = n(0, 2);";
        let run = run_pass(&SmallFunctionFoldingPass::new(), source);
        assert_eq!(run.rewrites, 1);
        assert!(run.output.contains("x = n(1, 2);"));
        assert!(run.output.contains("y = 2;"));
        assert_eq!(run.events.warnings().count(), 1);
    }

    #[test]
    fn test_three_argument_calls_untouched() {
        let source = "function n(a, b, c) { return a - b + c; } x = n(1, 4, 5);";
        let run = run_pass(&SmallFunctionFoldingPass::new(), source);
        assert_eq!(run.rewrites, 0);
        assert!(run.output.contains("x = n(1, 4, 5);"));
        assert!(run.output.contains("function n(a, b, c)"));
    }

    #[test]
    fn test_single_parameter_functions_ignored() {
        let source = "function n(a) { return a * 2; } x = n(1);";
        let run = run_pass(&SmallFunctionFoldingPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }
}
